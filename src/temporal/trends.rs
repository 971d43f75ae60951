//! Historical analysis over stored snapshots.
//!
//! All analysis reads through [`SnapshotStore`]; sentinel readings are
//! excluded from every numeric computation so an outage never skews a
//! trend or an average.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::reading::VaultReading;
use crate::temporal::store::{SnapshotStore, StorageBackend};

/// Per-vault rate series over a trailing window, newest-first.
#[derive(Debug, Clone, Serialize)]
pub struct VaultTrend {
    pub vault: String,
    /// `(collected_at, net_apy)` pairs, newest-first.
    pub samples: Vec<(DateTime<Utc>, f64)>,
    pub highest: Option<f64>,
    pub lowest: Option<f64>,
    /// Relative change from the oldest to the newest sample, in
    /// percent. `None` with fewer than two samples or a zero baseline.
    pub change_pct: Option<f64>,
}

/// Window extrema for one vault, with the samples behind them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VaultExtrema {
    pub max: f64,
    pub min: f64,
    /// `(collected_at, net_apy)` pairs, newest-first.
    pub samples: Vec<(DateTime<Utc>, f64)>,
}

/// Summary statistics across the store.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateStats {
    /// Vaults in the most recent snapshot.
    pub vault_count: usize,
    /// Historical snapshots inside the window.
    pub record_count: usize,
    /// Mean of the numeric rates in the latest snapshot.
    pub average: Option<f64>,
    pub highest: Option<f64>,
    pub lowest: Option<f64>,
    /// Oldest and newest snapshot timestamps in the window.
    pub range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

fn rate_of(reading: &VaultReading) -> Option<f64> {
    reading.net_apy.rate()
}

/// Rate series for one vault over the trailing window.
pub fn trends_for<B: StorageBackend>(
    store: &SnapshotStore<B>,
    vault: &str,
    window_days: i64,
) -> Result<VaultTrend, StoreError> {
    let mut samples = Vec::new();
    for snapshot in store.history(window_days)? {
        let rate = snapshot
            .vaults
            .iter()
            .find(|r| r.name == vault)
            .and_then(rate_of);
        if let Some(rate) = rate {
            samples.push((snapshot.timestamp, rate));
        }
    }

    let highest = samples
        .iter()
        .map(|&(_, r)| r)
        .fold(None, |acc: Option<f64>, r| {
            Some(acc.map_or(r, |a| a.max(r)))
        });
    let lowest = samples
        .iter()
        .map(|&(_, r)| r)
        .fold(None, |acc: Option<f64>, r| {
            Some(acc.map_or(r, |a| a.min(r)))
        });

    // Samples are newest-first: last element is the oldest baseline.
    let change_pct = match (samples.first(), samples.last()) {
        (Some(&(_, newest)), Some(&(_, oldest))) if samples.len() >= 2 && oldest != 0.0 => {
            Some((newest - oldest) / oldest * 100.0)
        }
        _ => None,
    };

    Ok(VaultTrend {
        vault: vault.to_string(),
        samples,
        highest,
        lowest,
        change_pct,
    })
}

/// Highest and lowest observed rate per vault across the window.
pub fn extrema_over_window<B: StorageBackend>(
    store: &SnapshotStore<B>,
    window_days: i64,
) -> Result<BTreeMap<String, VaultExtrema>, StoreError> {
    let mut out: BTreeMap<String, VaultExtrema> = BTreeMap::new();
    for snapshot in store.history(window_days)? {
        for reading in &snapshot.vaults {
            let Some(rate) = rate_of(reading) else {
                continue;
            };
            let at = snapshot.timestamp;
            out.entry(reading.name.clone())
                .and_modify(|e| {
                    e.max = e.max.max(rate);
                    e.min = e.min.min(rate);
                    e.samples.push((at, rate));
                })
                .or_insert_with(|| VaultExtrema {
                    max: rate,
                    min: rate,
                    samples: vec![(at, rate)],
                });
        }
    }
    Ok(out)
}

/// Summary statistics over the latest snapshot and the trailing window.
pub fn aggregate_stats<B: StorageBackend>(
    store: &SnapshotStore<B>,
    window_days: i64,
) -> Result<AggregateStats, StoreError> {
    let history = store.history(window_days)?;
    let range = match (history.last(), history.first()) {
        (Some(oldest), Some(newest)) => Some((oldest.timestamp, newest.timestamp)),
        _ => None,
    };

    let latest = store.latest()?;
    let (vault_count, rates) = match &latest {
        Some(snapshot) => (
            snapshot.vaults.len(),
            snapshot
                .vaults
                .iter()
                .filter_map(rate_of)
                .collect::<Vec<_>>(),
        ),
        None => (0, Vec::new()),
    };

    let average = if rates.is_empty() {
        None
    } else {
        Some(rates.iter().sum::<f64>() / rates.len() as f64)
    };
    let highest = rates.iter().copied().fold(None, |acc: Option<f64>, r| {
        Some(acc.map_or(r, |a| a.max(r)))
    });
    let lowest = rates.iter().copied().fold(None, |acc: Option<f64>, r| {
        Some(acc.map_or(r, |a| a.min(r)))
    });

    Ok(AggregateStats {
        vault_count,
        record_count: history.len(),
        average,
        highest,
        lowest,
        range,
    })
}
