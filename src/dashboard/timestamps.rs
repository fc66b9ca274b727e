//! First-seen timestamps for customers.
//!
//! The proxy does not report when a customer was created, so the dashboard
//! records the first time it observes each customer id and shows that date
//! instead. Entries are written once and never overwritten.

use crate::{Error, Result};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Shown when no date is known.
pub const UNKNOWN_DATE: &str = "N/A";

/// Write-once store of customer first-seen times.
pub trait TimestampStore: Send + Sync {
    /// Recorded time for `user_id`, if any.
    fn get(&self, user_id: &str) -> Result<Option<DateTime<Utc>>>;

    /// Record `at` unless an entry already exists; returns the stored time.
    fn set_if_absent(&self, user_id: &str, at: DateTime<Utc>) -> Result<DateTime<Utc>>;

    /// Record `at` for every id without an entry; returns the stored time of each id.
    fn set_many_if_absent(
        &self,
        user_ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<HashMap<String, DateTime<Utc>>> {
        user_ids
            .iter()
            .map(|id| Ok((id.clone(), self.set_if_absent(id, at)?)))
            .collect()
    }

    /// Record the current time on first observation.
    fn observe(&self, user_id: &str) -> Result<DateTime<Utc>> {
        self.set_if_absent(user_id, Utc::now())
    }
}

/// In-process store, lost on restart.
#[derive(Debug, Default)]
pub struct MemoryTimestampStore {
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl MemoryTimestampStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded customers.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl TimestampStore for MemoryTimestampStore {
    fn get(&self, user_id: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.entries.read().get(user_id).copied())
    }

    fn set_if_absent(&self, user_id: &str, at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let mut entries = self.entries.write();
        Ok(*entries.entry(user_id.to_string()).or_insert(at))
    }
}

/// Store persisted as a JSON object of `user_id -> RFC 3339 time`.
///
/// The whole map is rewritten through a temporary file and a rename whenever
/// a call adds entries; a batch of new ids costs one write. Writes are blocking
/// file I/O, so async callers go through `spawn_blocking`.
#[derive(Debug)]
pub struct FileTimestampStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
    writes: AtomicU64,
}

impl FileTimestampStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            HashMap::new()
        };

        debug!(path = %path.display(), entries = entries.len(), "timestamp store opened");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
            writes: AtomicU64::new(0),
        })
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of times the file has been rewritten since opening.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn persist(&self, entries: &HashMap<String, DateTime<Utc>>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file_name = self.path.file_name().ok_or_else(|| {
            Error::config_key(
                "timestamp store path has no file name",
                "dashboard.timestamp_store_path",
            )
        })?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);

        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl TimestampStore for FileTimestampStore {
    fn get(&self, user_id: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.entries.lock().get(user_id).copied())
    }

    fn set_if_absent(&self, user_id: &str, at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let stored = self.set_many_if_absent(&[user_id.to_string()], at)?;
        stored
            .get(user_id)
            .copied()
            .ok_or_else(|| Error::internal("timestamp store lost an entry"))
    }

    fn set_many_if_absent(
        &self,
        user_ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<HashMap<String, DateTime<Utc>>> {
        let mut entries = self.entries.lock();
        let mut added = Vec::new();
        let mut stored = HashMap::with_capacity(user_ids.len());
        for id in user_ids {
            let time = *entries.entry(id.clone()).or_insert_with(|| {
                added.push(id.clone());
                at
            });
            stored.insert(id.clone(), time);
        }

        if added.is_empty() {
            return Ok(stored);
        }
        if let Err(e) = self.persist(&entries) {
            warn!(path = %self.path.display(), error = %e, "failed to persist timestamp store");
            for id in &added {
                entries.remove(id);
            }
            return Err(e);
        }
        debug!(added = added.len(), "timestamp store persisted");
        Ok(stored)
    }
}

/// Date shown in customer tables: `MM/DD/YYYY`, or `N/A` when unknown.
pub fn format_creation_date(at: Option<DateTime<Utc>>) -> String {
    at.map(|at| at.format("%m/%d/%Y").to_string())
        .unwrap_or_else(|| UNKNOWN_DATE.to_string())
}

/// Parse a proxy-reported creation time, ignoring values that are not RFC 3339.
pub fn parse_reported(created_at: Option<&str>) -> Option<DateTime<Utc>> {
    created_at
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|at| at.with_timezone(&Utc))
}
