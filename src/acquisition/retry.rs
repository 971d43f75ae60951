//! Reusable retry policy for adapter calls.
//!
//! One policy object parameterized by attempt count and delay, applied
//! uniformly across all adapters instead of each fetch path growing its
//! own loop.

use std::future::Future;
use std::time::Duration;

use crate::error::FetchError;

/// Bounded retry with a fixed backoff between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    /// One retry after a short pause.
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds or attempts are exhausted, returning
    /// the last error. `what` labels the operation in the logs.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts => {
                    tracing::warn!(
                        attempt,
                        max = self.max_attempts,
                        "{what} failed, retrying in {}ms: {e}",
                        self.backoff.as_millis()
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
