//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide). The
//! collection pipeline only needs "navigate, settle, hand me the
//! rendered text/HTML" — everything else stays behind this seam so the
//! pipeline is testable without a browser.

pub mod chromium;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::extraction::WaitMode;

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new isolated browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>, FetchError>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<(), FetchError>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab) for rendering one page.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL. `Idle` additionally waits (bounded) for the
    /// load/idle signal; a page that never goes idle is tolerated and
    /// extraction proceeds with whatever content loaded.
    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitMode,
        timeout: Duration,
    ) -> Result<(), FetchError>;
    /// Visible text of the rendered document body.
    async fn body_text(&self) -> Result<String, FetchError>;
    /// Full rendered HTML.
    async fn html(&self) -> Result<String, FetchError>;
    /// Close this context, releasing its browser resources.
    async fn close(self: Box<Self>) -> Result<(), FetchError>;
}

/// A no-op renderer used when Chromium is unavailable.
///
/// Scraped vaults degrade to the raw-fetch adapter; only rendered
/// fetching errors out through this stub.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>, FetchError> {
        Err(FetchError::NoRenderer)
    }
    async fn shutdown(&self) -> Result<(), FetchError> {
        Ok(())
    }
    fn active_contexts(&self) -> usize {
        0
    }
}
