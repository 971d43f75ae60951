//! Chromium-based renderer using chromiumoxide.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;

use super::{RenderContext, Renderer};
use crate::error::FetchError;
use crate::extraction::WaitMode;

/// Bound on the wait for the post-navigation idle signal. Pages that
/// never reach idle proceed with whatever content loaded.
const IDLE_WAIT_CAP: Duration = Duration::from_secs(10);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. VAULTWATCH_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("VAULTWATCH_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.vaultwatch/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".vaultwatch/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".vaultwatch/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".vaultwatch/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".vaultwatch/chromium/chrome-linux64/chrome"),
                home.join(".vaultwatch/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    browser: Browser,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance.
    pub async fn new() -> Result<Self, FetchError> {
        let chrome_path = find_chromium().ok_or(FetchError::NoRenderer)?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| FetchError::Navigation {
                url: String::new(),
                reason: format!("failed to build browser config: {e}"),
            })?;

        let (browser, mut handler) =
            Browser::launch(config)
                .await
                .map_err(|e| FetchError::Navigation {
                    url: String::new(),
                    reason: format!("failed to launch Chromium: {e}"),
                })?;

        // Drain CDP events for the lifetime of the browser.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser,
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>, FetchError> {
        let page =
            self.browser
                .new_page("about:blank")
                .await
                .map_err(|e| FetchError::Navigation {
                    url: String::new(),
                    reason: format!("failed to create page: {e}"),
                })?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> Result<(), FetchError> {
        // Browser is torn down when ChromiumRenderer is dropped.
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumContext {
    async fn evaluate_string(&self, script: &str, url_hint: &str) -> Result<String, FetchError> {
        let result =
            self.page
                .evaluate(script)
                .await
                .map_err(|e| FetchError::Navigation {
                    url: url_hint.to_string(),
                    reason: format!("JS evaluation failed: {e}"),
                })?;
        result.into_value().map_err(|e| FetchError::Navigation {
            url: url_hint.to_string(),
            reason: format!("failed to convert JS result: {e:?}"),
        })
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitMode,
        timeout: Duration,
    ) -> Result<(), FetchError> {
        let result = tokio::time::timeout(timeout, self.page.goto(url)).await;

        match result {
            Ok(Ok(_response)) => {
                if wait == WaitMode::Idle {
                    // Bounded: a page that never goes idle still counts
                    // as navigated.
                    let _ =
                        tokio::time::timeout(IDLE_WAIT_CAP, self.page.wait_for_navigation()).await;
                }
                Ok(())
            }
            Ok(Err(e)) => Err(FetchError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(FetchError::Navigation {
                url: url.to_string(),
                reason: format!("timed out after {}ms", timeout.as_millis()),
            }),
        }
    }

    async fn body_text(&self) -> Result<String, FetchError> {
        self.evaluate_string("document.body ? document.body.innerText : ''", "")
            .await
    }

    async fn html(&self) -> Result<String, FetchError> {
        self.evaluate_string("document.documentElement.outerHTML", "")
            .await
    }

    async fn close(self: Box<Self>) -> Result<(), FetchError> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        let _ = self.page.close().await;
        Ok(())
    }
}
