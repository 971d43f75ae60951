//! Plain-HTTP fetch adapter wrapping reqwest.
//!
//! Not a browser — no JavaScript execution. Used as the low-capability
//! fallback for scraped vaults when no renderer is configured. Sends a
//! conventional desktop-Chrome user-agent and follows a bounded number
//! of redirects. Retrying lives in the orchestrator's
//! [`super::retry::RetryPolicy`], not here.

use std::time::Duration;

use crate::error::FetchError;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/131.0.0.0 Safari/537.36";

/// HTTP client for raw document fetches.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    /// HTTP/1.1-only fallback client for sites that reject HTTP/2.
    h1_client: reqwest::Client,
}

impl HttpClient {
    /// Create a client with the standard browser user-agent and a
    /// per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        let h1_client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .http1_only()
            .build()
            .unwrap_or_default();

        Self { client, h1_client }
    }

    /// GET a URL and return the unrendered body text.
    ///
    /// Falls back to HTTP/1.1 on protocol errors (some CDNs reject
    /// HTTP/2). Non-success statuses are a [`FetchError::Status`].
    pub async fn get(&self, url: &str) -> Result<String, FetchError> {
        match self.get_inner(&self.client, url).await {
            Ok(body) => Ok(body),
            Err(e) => {
                let err_str = format!("{e}");
                if err_str.contains("http2")
                    || err_str.contains("protocol")
                    || err_str.contains("connection closed")
                {
                    self.get_inner(&self.h1_client, url).await
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn get_inner(&self, client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
        let resp = client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.text().await?)
    }
}
