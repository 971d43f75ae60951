//! Source adapters — the retrieval side of the pipeline.
//!
//! Three ways to obtain content for a vault: a structured GraphQL
//! query (`morpho`), a rendered-page fetch (via the `renderer` seam),
//! and a plain HTTP GET fallback (`http_client`). All of them fail
//! with [`crate::error::FetchError`], which the orchestrator retries
//! through one shared [`retry::RetryPolicy`] before degrading the
//! vault to an error-sentinel reading.

pub mod http_client;
pub mod morpho;
pub mod retry;
