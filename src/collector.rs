//! Collection Orchestrator — drives the whole pipeline for one run.
//!
//! Resolves every vault to an adapter + strategy, invokes adapters with
//! bounded retry, applies extraction, and normalizes everything into
//! one reading per vault. Vault failures are isolated: a failed vault
//! yields an `Error`-sentinel reading, never an aborted run.
//!
//! The API batch completes before the scraping batch begins so API
//! failures don't block scraping and vice versa. Scraped vaults are
//! handled one at a time in registry order — each rendered fetch may
//! spin up an isolated browser context, and unbounded concurrency
//! risks resource exhaustion. The returned list preserves registry
//! order regardless of batch order.

use std::sync::Arc;
use std::time::Duration;

use crate::acquisition::http_client::HttpClient;
use crate::acquisition::morpho::{MorphoClient, MORPHO_API_URL};
use crate::acquisition::retry::RetryPolicy;
use crate::error::FetchError;
use crate::extraction::{self, PageContent, ProviderProfile};
use crate::reading::{Source, VaultReading};
use crate::registry::Vault;
use crate::renderer::Renderer;
use crate::resolver::{self, AdapterKind};

/// How scraped vaults are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeMode {
    /// Headless-browser rendering (requires a renderer).
    Rendered,
    /// Plain HTTP GET only — no JavaScript execution.
    RawOnly,
    /// Scraping disabled; scraped vaults are marked `Unavailable`.
    Disabled,
}

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub api_endpoint: String,
    /// Per-request bound for navigation and HTTP fetches.
    pub fetch_timeout: Duration,
    pub retry: RetryPolicy,
    pub mode: ScrapeMode,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            api_endpoint: MORPHO_API_URL.to_string(),
            fetch_timeout: Duration::from_secs(20),
            retry: RetryPolicy::default(),
            mode: ScrapeMode::Rendered,
        }
    }
}

/// Why a vault ended up with the `Error` sentinel. Kept distinct for
/// diagnostics even though the external reading unifies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Miss {
    /// Adapter failed after retries.
    Fetch,
    /// Content fetched but no percentage present at all.
    NotFound,
    /// Percentages present, none inside the plausible range.
    OutOfRangeOnly,
}

/// The collection pipeline's entry point.
pub struct Collector {
    config: CollectorConfig,
    morpho: MorphoClient,
    http: HttpClient,
    renderer: Option<Arc<dyn Renderer>>,
}

impl Collector {
    pub fn new(config: CollectorConfig) -> Self {
        let morpho = MorphoClient::with_endpoint(&config.api_endpoint, config.fetch_timeout);
        let http = HttpClient::new(config.fetch_timeout);
        Self {
            config,
            morpho,
            http,
            renderer: None,
        }
    }

    /// Attach a renderer for rendered-fetch vaults. Without one,
    /// `ScrapeMode::Rendered` degrades to raw fetching.
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Collect one reading per vault. Never fails at the run level;
    /// the output length always equals the input length.
    pub async fn collect(&self, vaults: &[Vault]) -> Vec<VaultReading> {
        let mut slots: Vec<Option<VaultReading>> = vec![None; vaults.len()];

        // API batch first.
        for (i, vault) in vaults.iter().enumerate() {
            if resolver::resolve(vault).adapter == AdapterKind::StructuredApi {
                slots[i] = Some(self.collect_api(vault).await);
            }
        }

        // Scraping batch, sequential in registry order.
        for (i, vault) in vaults.iter().enumerate() {
            if slots[i].is_none() {
                slots[i] = Some(self.collect_scraped(vault).await);
            }
        }

        let readings: Vec<VaultReading> = slots.into_iter().flatten().collect();
        debug_assert_eq!(readings.len(), vaults.len());

        let errors = readings.iter().filter(|r| r.net_apy.is_error()).count();
        tracing::info!(
            total = readings.len(),
            ok = readings.len() - errors,
            errors,
            "collection run complete"
        );
        readings
    }

    async fn collect_api(&self, vault: &Vault) -> VaultReading {
        tracing::info!(vault = %vault.name, chain = vault.chain_id, "querying structured API");
        let morpho = &self.morpho;
        let outcome = self
            .config
            .retry
            .run("structured API query", || {
                morpho.vault_net_apy(&vault.address, vault.chain_id)
            })
            .await;

        match outcome {
            Ok(Some(api)) if api.net_apy > 0.0 && api.net_apy < 1.0 => {
                tracing::info!(
                    vault = %vault.name,
                    api_name = %api.name,
                    net_apy = api.net_apy,
                    "API reported net APY {:.2}%",
                    api.net_apy * 100.0
                );
                // Keep the configured display name, not the API's.
                VaultReading::rate(vault, api.net_apy, Source::MorphoApi)
            }
            Ok(Some(api)) => {
                tracing::warn!(
                    vault = %vault.name,
                    net_apy = api.net_apy,
                    "API rate outside (0, 1), discarding"
                );
                self.miss(vault, Miss::OutOfRangeOnly)
            }
            Ok(None) => self.miss(vault, Miss::NotFound),
            Err(e) => {
                tracing::warn!(vault = %vault.name, "API fetch failed: {e}");
                self.miss(vault, Miss::Fetch)
            }
        }
    }

    async fn collect_scraped(&self, vault: &Vault) -> VaultReading {
        let mut route = resolver::resolve(vault);
        let profile = ProviderProfile::get(route.profile);

        match self.config.mode {
            ScrapeMode::Disabled => {
                tracing::info!(vault = %vault.name, "scraping disabled, marking unavailable");
                return VaultReading::unavailable(vault);
            }
            ScrapeMode::RawOnly => route = route.degraded(),
            ScrapeMode::Rendered if self.renderer.is_none() => {
                tracing::warn!(vault = %vault.name, "no renderer available, using raw fetch");
                route = route.degraded();
            }
            ScrapeMode::Rendered => {}
        }

        let rendered = route.adapter == AdapterKind::RenderedFetch;
        tracing::info!(
            vault = %vault.name,
            profile = profile.id.as_str(),
            rendered,
            "scraping {}",
            vault.url
        );

        let fetched = match route.adapter {
            AdapterKind::RenderedFetch => {
                self.config
                    .retry
                    .run("rendered fetch", || self.fetch_rendered(vault, profile))
                    .await
            }
            AdapterKind::RawFetch | AdapterKind::StructuredApi => {
                self.config
                    .retry
                    .run("raw fetch", || self.fetch_raw(vault))
                    .await
            }
        };

        let content = match fetched {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(vault = %vault.name, "fetch failed after retries: {e}");
                return self.miss(vault, Miss::Fetch);
            }
        };

        match extraction::extract_rate(profile, &content, &vault.asset) {
            Some(rate) => {
                tracing::info!(
                    vault = %vault.name,
                    rate,
                    "extracted net APY {:.2}%",
                    rate * 100.0
                );
                let source = if rendered {
                    Source::WebScraping
                } else {
                    Source::RawFetch
                };
                VaultReading::rate(vault, rate, source)
            }
            None => self.miss(vault, miss_kind(&content)),
        }
    }

    /// Navigate in a fresh browser context, wait the profile's settle
    /// delay, and hand back rendered text + HTML. The context is closed
    /// before returning so at most one is alive per scraped vault.
    async fn fetch_rendered(
        &self,
        vault: &Vault,
        profile: &ProviderProfile,
    ) -> Result<PageContent, FetchError> {
        let renderer = self.renderer.as_ref().ok_or(FetchError::NoRenderer)?;
        let mut ctx = renderer.new_context().await?;

        let result = async {
            ctx.navigate(&vault.url, profile.wait, self.config.fetch_timeout)
                .await?;
            tokio::time::sleep(profile.settle).await;
            let text = ctx.body_text().await?;
            let html = ctx.html().await?;
            Ok(PageContent::rendered(html, text))
        }
        .await;

        // Close the tab whether or not the fetch succeeded.
        if let Err(e) = ctx.close().await {
            tracing::debug!(vault = %vault.name, "context close failed: {e}");
        }
        result
    }

    /// Plain GET; the unrendered body serves as both HTML (for static
    /// selector hits) and scan text.
    async fn fetch_raw(&self, vault: &Vault) -> Result<PageContent, FetchError> {
        let body = self.http.get(&vault.url).await?;
        Ok(PageContent::rendered(body.clone(), body))
    }

    fn miss(&self, vault: &Vault, kind: Miss) -> VaultReading {
        match kind {
            Miss::Fetch => tracing::warn!(vault = %vault.name, "no reading: fetch failed"),
            Miss::NotFound => tracing::warn!(vault = %vault.name, "no reading: no rate found"),
            Miss::OutOfRangeOnly => tracing::warn!(
                vault = %vault.name,
                "no reading: only implausible percentages on page"
            ),
        }
        VaultReading::error(vault)
    }
}

/// Classify an extraction miss for diagnostics: did the page contain
/// any percentage at all?
fn miss_kind(content: &PageContent) -> Miss {
    let percent_re = regex::Regex::new(r"\d+\.?\d*\s*%").expect("percent regex is valid");
    if percent_re.is_match(&content.text) {
        Miss::OutOfRangeOnly
    } else {
        Miss::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::{NetApy, Sentinel};
    use crate::registry::builtin_vaults;

    fn offline_config(mode: ScrapeMode) -> CollectorConfig {
        CollectorConfig {
            // Nothing listens here; connections fail immediately.
            api_endpoint: "http://127.0.0.1:9".to_string(),
            fetch_timeout: Duration::from_millis(250),
            retry: RetryPolicy {
                max_attempts: 2,
                backoff: Duration::from_millis(1),
            },
            mode,
        }
    }

    #[tokio::test]
    async fn every_vault_gets_a_reading_in_registry_order() {
        let vaults = builtin_vaults();
        let collector = Collector::new(offline_config(ScrapeMode::Disabled));
        let readings = collector.collect(&vaults).await;

        assert_eq!(readings.len(), vaults.len());
        for (vault, reading) in vaults.iter().zip(&readings) {
            assert_eq!(vault.name, reading.name);
        }
    }

    #[tokio::test]
    async fn api_failure_degrades_to_error_sentinel_without_aborting() {
        let vaults = builtin_vaults();
        let collector = Collector::new(offline_config(ScrapeMode::Disabled));
        let readings = collector.collect(&vaults).await;

        for reading in &readings {
            match reading.source {
                // API vaults hit the dead endpoint and degrade.
                Source::Error => assert!(reading.net_apy.is_error()),
                // Scraped vaults were intentionally skipped.
                Source::ApiOnly => {
                    assert_eq!(reading.net_apy, NetApy::Sentinel(Sentinel::Unavailable));
                }
                other => panic!("unexpected source {other:?}"),
            }
        }
        let api_errors = readings.iter().filter(|r| r.net_apy.is_error()).count();
        assert_eq!(api_errors, 2, "both Compound Blue vaults fail offline");
    }

    #[test]
    fn miss_classification_distinguishes_noise_from_absence() {
        let noisy = PageContent::text_only("price moved 37.5% today".to_string());
        assert_eq!(miss_kind(&noisy), Miss::OutOfRangeOnly);

        let silent = PageContent::text_only("no rates here".to_string());
        assert_eq!(miss_kind(&silent), Miss::NotFound);
    }
}
