//! Snapshot store — persists collection runs and serves history.
//!
//! Snapshots are append-only and immutable once written; `latest` is a
//! distinguished, overwritable pointer record, while historical
//! snapshots accumulate under a dated naming scheme. The persistence
//! backend is injected so the store logic is testable without disk I/O.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::StoreError;
use crate::reading::VaultReading;

const LATEST_KEY: &str = "latest.json";
const HISTORY_PREFIX: &str = "history/";
const BACKUP_PREFIX: &str = "backups/";

/// One persisted collection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// ISO-8601 collection time.
    pub timestamp: DateTime<Utc>,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Time of day, `HH-MM-SS` (path-safe).
    pub time: String,
    pub vaults: Vec<VaultReading>,
}

impl Snapshot {
    fn at(timestamp: DateTime<Utc>, vaults: Vec<VaultReading>) -> Self {
        Self {
            timestamp,
            date: timestamp.format("%Y-%m-%d").to_string(),
            time: timestamp.format("%H-%M-%S").to_string(),
            vaults,
        }
    }
}

/// Flat key-value persistence for snapshot JSON.
pub trait StorageBackend: Send + Sync {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    /// All stored keys under a prefix, in unspecified order.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Snapshot store over an injected backend.
pub struct SnapshotStore<B: StorageBackend> {
    backend: B,
}

impl<B: StorageBackend> SnapshotStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Persist a run as the new latest snapshot and append it to the
    /// dated historical record.
    pub fn write(&self, vaults: Vec<VaultReading>) -> Result<Snapshot, StoreError> {
        self.write_at(vaults, Utc::now())
    }

    /// `write` with an explicit timestamp (backfills, tests).
    pub fn write_at(
        &self,
        vaults: Vec<VaultReading>,
        timestamp: DateTime<Utc>,
    ) -> Result<Snapshot, StoreError> {
        let snapshot = Snapshot::at(timestamp, vaults);
        let bytes = serde_json::to_vec_pretty(&snapshot).map_err(StoreError::Encode)?;

        let history_key = format!("{HISTORY_PREFIX}{}_{}.json", snapshot.date, snapshot.time);
        self.backend.put(&history_key, &bytes)?;
        self.backend.put(LATEST_KEY, &bytes)?;

        tracing::info!(
            key = %history_key,
            vaults = snapshot.vaults.len(),
            "snapshot written"
        );
        Ok(snapshot)
    }

    /// The most recent snapshot, or `None` if never written.
    pub fn latest(&self) -> Result<Option<Snapshot>, StoreError> {
        match self.backend.get(LATEST_KEY)? {
            Some(bytes) => Ok(Some(decode(LATEST_KEY, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Historical snapshots within the trailing window, newest-first.
    pub fn history(&self, window_days: i64) -> Result<Vec<Snapshot>, StoreError> {
        let cutoff = Utc::now() - chrono::Duration::days(window_days);
        let mut snapshots = Vec::new();
        for key in self.backend.list(HISTORY_PREFIX)? {
            let Some(bytes) = self.backend.get(&key)? else {
                continue;
            };
            let snapshot = decode(&key, &bytes)?;
            if snapshot.timestamp >= cutoff {
                snapshots.push(snapshot);
            }
        }
        snapshots.sort_by_key(|s| std::cmp::Reverse(s.timestamp));
        Ok(snapshots)
    }

    /// The most recent snapshot recorded on a calendar date.
    pub fn by_date(&self, date: NaiveDate) -> Result<Option<Snapshot>, StoreError> {
        let wanted = format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        );
        let mut newest: Option<Snapshot> = None;
        for key in self.backend.list(HISTORY_PREFIX)? {
            let Some(bytes) = self.backend.get(&key)? else {
                continue;
            };
            let snapshot = decode(&key, &bytes)?;
            if snapshot.date == wanted
                && newest
                    .as_ref()
                    .map_or(true, |n| snapshot.timestamp > n.timestamp)
            {
                newest = Some(snapshot);
            }
        }
        Ok(newest)
    }

    /// Permanently remove historical snapshots older than the retention
    /// window. Destructive and irreversible; returns the count removed.
    /// The latest pointer is never removed.
    pub fn cleanup(&self, retention_days: i64) -> Result<usize, StoreError> {
        let cutoff = Utc::now() - chrono::Duration::days(retention_days);
        let mut removed = 0usize;
        for key in self.backend.list(HISTORY_PREFIX)? {
            let Some(bytes) = self.backend.get(&key)? else {
                continue;
            };
            let snapshot = decode(&key, &bytes)?;
            if snapshot.timestamp < cutoff {
                self.backend.delete(&key)?;
                removed += 1;
                tracing::info!(key = %key, "expired snapshot removed");
            }
        }
        Ok(removed)
    }

    /// Copy the full historical record plus the latest pointer into a
    /// dated, isolated prefix without mutating the live store. Returns
    /// the backup prefix.
    pub fn backup(&self) -> Result<String, StoreError> {
        let now = Utc::now();
        let prefix = format!(
            "{BACKUP_PREFIX}{}_{}",
            now.format("%Y-%m-%d"),
            now.format("%H-%M-%S")
        );

        let mut copied = 0usize;
        for key in self.backend.list(HISTORY_PREFIX)? {
            if let Some(bytes) = self.backend.get(&key)? {
                self.backend.put(&format!("{prefix}/{key}"), &bytes)?;
                copied += 1;
            }
        }
        if let Some(bytes) = self.backend.get(LATEST_KEY)? {
            self.backend.put(&format!("{prefix}/{LATEST_KEY}"), &bytes)?;
            copied += 1;
        }

        tracing::info!(prefix = %prefix, copied, "backup complete");
        Ok(prefix)
    }
}

fn decode(key: &str, bytes: &[u8]) -> Result<Snapshot, StoreError> {
    serde_json::from_slice(bytes).map_err(|source| StoreError::Corrupt {
        key: key.to_string(),
        source,
    })
}

// ── Backends ──

/// Filesystem backend: keys map to paths under a root directory.
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&root).map_err(|e| StoreError::io(root.display().to_string(), e))?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn collect_keys(&self, dir: &PathBuf, out: &mut Vec<String>) -> Result<(), StoreError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StoreError::io(dir.display().to_string(), e)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(dir.display().to_string(), e))?;
            let path = entry.path();
            if path.is_dir() {
                self.collect_keys(&path, out)?;
            } else if let Ok(rel) = path.strip_prefix(&self.root) {
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
        Ok(())
    }
}

impl StorageBackend for FsBackend {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(key, e))?;
        }
        fs::write(&path, bytes).map_err(|e| StoreError::io(key, e))
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(key, e)),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let root = self.root.clone();
        self.collect_keys(&root, &mut keys)?;
        keys.retain(|k| k.starts_with(prefix));
        Ok(keys)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(key, e)),
        }
    }
}

/// In-memory backend for tests and embedding.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.entries
            .lock()
            .expect("backend lock poisoned")
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .entries
            .lock()
            .expect("backend lock poisoned")
            .get(key)
            .cloned())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .lock()
            .expect("backend lock poisoned")
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .expect("backend lock poisoned")
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::{NetApy, Sentinel, Source};
    use tempfile::TempDir;

    fn reading(name: &str, apy: NetApy) -> VaultReading {
        VaultReading {
            name: name.to_string(),
            address: format!("0x{name}"),
            asset: "USDC".to_string(),
            net_apy: apy,
            source: Source::WebScraping,
            url: format!("https://example.com/{name}"),
        }
    }

    fn sample_run() -> Vec<VaultReading> {
        vec![
            reading("A", NetApy::Rate(0.061)),
            reading("B", NetApy::Sentinel(Sentinel::Error)),
        ]
    }

    #[test]
    fn write_then_latest_round_trips() {
        let store = SnapshotStore::new(MemoryBackend::new());
        let written = store.write(sample_run()).unwrap();

        let latest = store.latest().unwrap().expect("latest should exist");
        assert_eq!(latest.vaults, written.vaults);
        assert_eq!(latest.timestamp, written.timestamp);
        assert_eq!(latest.date.len(), 10);
        assert_eq!(latest.time.len(), 8);
    }

    #[test]
    fn latest_is_idempotent_without_intervening_write() {
        let store = SnapshotStore::new(MemoryBackend::new());
        store.write(sample_run()).unwrap();

        let a = store.latest().unwrap().unwrap();
        let b = store.latest().unwrap().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn latest_is_none_before_first_write() {
        let store = SnapshotStore::new(MemoryBackend::new());
        assert!(store.latest().unwrap().is_none());
    }

    #[test]
    fn history_returns_window_newest_first() {
        let store = SnapshotStore::new(MemoryBackend::new());
        let now = Utc::now();
        store
            .write_at(sample_run(), now - chrono::Duration::days(10))
            .unwrap();
        store
            .write_at(sample_run(), now - chrono::Duration::days(2))
            .unwrap();
        store.write_at(sample_run(), now).unwrap();

        let week = store.history(7).unwrap();
        assert_eq!(week.len(), 2, "10-day-old snapshot is outside the window");
        assert!(week[0].timestamp > week[1].timestamp);
    }

    #[test]
    fn by_date_picks_most_recent_that_day() {
        let store = SnapshotStore::new(MemoryBackend::new());
        let day = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        let t0 = day.and_hms_opt(8, 0, 0).unwrap().and_utc();
        let t1 = day.and_hms_opt(18, 30, 0).unwrap().and_utc();

        store.write_at(sample_run(), t0).unwrap();
        store
            .write_at(vec![reading("C", NetApy::Rate(0.07))], t1)
            .unwrap();

        let found = store.by_date(day).unwrap().expect("snapshot that day");
        assert_eq!(found.timestamp, t1);
        assert_eq!(found.vaults[0].name, "C");

        let other = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        assert!(store.by_date(other).unwrap().is_none());
    }

    #[test]
    fn cleanup_removes_only_expired_history() {
        let store = SnapshotStore::new(MemoryBackend::new());
        let now = Utc::now();
        store
            .write_at(sample_run(), now - chrono::Duration::days(40))
            .unwrap();
        store.write_at(sample_run(), now).unwrap();

        let removed = store.cleanup(30).unwrap();
        assert_eq!(removed, 1);

        let remaining = store.history(365).unwrap();
        assert_eq!(remaining.len(), 1);
        // Latest pointer survives cleanup.
        assert!(store.latest().unwrap().is_some());
    }

    #[test]
    fn backup_copies_without_mutating_live_records() {
        let backend = MemoryBackend::new();
        let store = SnapshotStore::new(backend);
        store.write(sample_run()).unwrap();

        let prefix = store.backup().unwrap();
        assert!(prefix.starts_with("backups/"));

        // Live records untouched.
        assert_eq!(store.history(7).unwrap().len(), 1);
        assert!(store.latest().unwrap().is_some());
    }

    #[test]
    fn fs_backend_round_trips_on_disk() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(FsBackend::new(dir.path().to_path_buf()).unwrap());

        let written = store.write(sample_run()).unwrap();
        let latest = store.latest().unwrap().unwrap();
        assert_eq!(latest.vaults, written.vaults);

        // Files land where the dated naming scheme says.
        assert!(dir.path().join("latest.json").exists());
        let history_dir = dir.path().join("history");
        assert_eq!(fs::read_dir(history_dir).unwrap().count(), 1);
    }

    #[test]
    fn snapshot_json_layout_matches_the_wire_contract() {
        let day = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let ts = day.and_hms_opt(14, 5, 1).unwrap().and_utc();
        let snapshot = Snapshot::at(ts, sample_run());

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["date"], "2026-08-30");
        assert_eq!(value["time"], "14-05-01");
        assert_eq!(value["vaults"][0]["netApy"], 0.061);
        assert_eq!(value["vaults"][1]["netApy"], "Error");
    }
}
