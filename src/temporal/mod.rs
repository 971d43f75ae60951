//! Snapshot persistence and historical analysis.

pub mod store;
pub mod trends;
