//! Error taxonomy for the collection pipeline and the snapshot store.
//!
//! Fetch failures are recoverable: the orchestrator retries them and
//! ultimately degrades the vault to an `Error` sentinel reading. Store
//! failures are surfaced to the caller — silent data loss is not
//! acceptable. An extraction miss is *not* an error; strategies return
//! `Option::None` for it.

use thiserror::Error;

/// Failure at an adapter boundary (network, timeout, protocol).
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure from reqwest (DNS, TLS, connect, timeout).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status after retries were exhausted upstream.
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// Browser navigation failed or never completed within the bound.
    #[error("navigation failed for {url}: {reason}")]
    Navigation { url: String, reason: String },

    /// No rendering capability is configured for a vault that needs one.
    #[error("no browser renderer available")]
    NoRenderer,

    /// The structured API answered but the payload was not usable.
    #[error("malformed API response: {0}")]
    Malformed(String),
}

/// Failure reading or writing persisted snapshots.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot at '{key}' is not valid JSON: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize snapshot: {0}")]
    Encode(#[source] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            key: key.into(),
            source,
        }
    }
}
