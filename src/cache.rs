//! Persistent TTL cache for directory size measurements.
//!
//! The cache is a pure performance optimization: total loss of its contents
//! must never change scan results, only how long a scan takes. Load failures
//! start the cache empty; save failures drop the write silently.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::paths;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Every Nth write triggers a sweep of expired entries so the map and the
/// persisted document stay bounded.
const SWEEP_INTERVAL: u64 = 100;

/// One measurement result, keyed by canonical path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Seconds since the Unix epoch when the measurement was taken.
    pub timestamp: u64,
    pub size_bytes: u64,
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub total_entries: usize,
    pub exists_count: usize,
    pub error_count: usize,
    pub total_cached_bytes: u64,
    pub cache_file: PathBuf,
    pub ttl_seconds: u64,
}

struct CacheState {
    entries: HashMap<String, CacheEntry>,
    writes: u64,
}

/// Size cache shared across scan workers. All access goes through an internal
/// lock; the expiry sweep runs under that same lock so it cannot race writes.
pub struct SizeCache {
    file: PathBuf,
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl SizeCache {
    /// Open the per-user default cache (`~/.cache/decruft/scan_cache.json`).
    pub fn open_default(ttl: Duration) -> SizeCache {
        let file = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("decruft")
            .join("scan_cache.json");
        SizeCache::open(file, ttl)
    }

    /// Open a cache backed by the given file. A missing or corrupt file is
    /// recovered by starting empty.
    pub fn open(file: PathBuf, ttl: Duration) -> SizeCache {
        let entries = load_entries(&file);
        SizeCache {
            file,
            ttl,
            state: Mutex::new(CacheState { entries, writes: 0 }),
        }
    }

    /// Look up a path. Expired entries are purged and reported as absent.
    pub fn get(&self, path: &Path) -> Option<CacheEntry> {
        let key = paths::canonical_key(path);
        let now = unix_now();
        let mut state = self.state.lock().expect("cache lock poisoned");

        match state.entries.get(&key) {
            Some(entry) if self.is_expired(entry, now) => {
                state.entries.remove(&key);
                None
            }
            Some(entry) => Some(entry.clone()),
            None => None,
        }
    }

    /// Record a measurement. Last writer wins.
    pub fn set(&self, path: &Path, size_bytes: u64, exists: bool, error: Option<String>) {
        let key = paths::canonical_key(path);
        let entry = CacheEntry {
            timestamp: unix_now(),
            size_bytes,
            exists,
            error,
        };

        let mut state = self.state.lock().expect("cache lock poisoned");
        state.entries.insert(key, entry);
        state.writes += 1;
        if state.writes % SWEEP_INTERVAL == 0 {
            let now = unix_now();
            let before = state.entries.len();
            let ttl = self.ttl;
            state
                .entries
                .retain(|_, e| now.saturating_sub(e.timestamp) <= ttl.as_secs());
            debug!(
                removed = before - state.entries.len(),
                "swept expired cache entries"
            );
        }
    }

    pub fn invalidate(&self, path: &Path) {
        self.invalidate_key(&paths::canonical_key(path));
    }

    /// Invalidate by a key resolved earlier, for callers whose path no
    /// longer resolves (a just-deleted directory behind a symlink).
    pub fn invalidate_key(&self, key: &str) {
        let mut state = self.state.lock().expect("cache lock poisoned");
        state.entries.remove(key);
    }

    /// Drop every entry and persist the now-empty document.
    pub fn clear(&self) {
        {
            let mut state = self.state.lock().expect("cache lock poisoned");
            state.entries.clear();
        }
        self.save();
    }

    /// Sweep expired entries and write the cache to disk. Persistence
    /// failures are logged and dropped, never raised.
    pub fn save(&self) {
        let now = unix_now();
        let document = {
            let mut state = self.state.lock().expect("cache lock poisoned");
            let ttl = self.ttl;
            state
                .entries
                .retain(|_, e| now.saturating_sub(e.timestamp) <= ttl.as_secs());
            match serde_json::to_string_pretty(&state.entries) {
                Ok(json) => json,
                Err(err) => {
                    warn!(%err, "could not serialize size cache");
                    return;
                }
            }
        };

        if let Some(parent) = self.file.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                warn!(%err, "could not create cache directory");
                return;
            }
        }
        if let Err(err) = std::fs::write(&self.file, document) {
            warn!(%err, file = %self.file.display(), "could not write size cache");
        }
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock().expect("cache lock poisoned");
        let exists_count = state.entries.values().filter(|e| e.exists).count();
        let error_count = state.entries.values().filter(|e| e.error.is_some()).count();
        let total_cached_bytes = state
            .entries
            .values()
            .filter(|e| e.exists)
            .map(|e| e.size_bytes)
            .sum();

        CacheStats {
            total_entries: state.entries.len(),
            exists_count,
            error_count,
            total_cached_bytes,
            cache_file: self.file.clone(),
            ttl_seconds: self.ttl.as_secs(),
        }
    }

    fn is_expired(&self, entry: &CacheEntry, now: u64) -> bool {
        now.saturating_sub(entry.timestamp) > self.ttl.as_secs()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn load_entries(file: &Path) -> HashMap<String, CacheEntry> {
    let raw = match std::fs::read_to_string(file) {
        Ok(raw) => raw,
        Err(_) => return HashMap::new(),
    };
    match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(%err, file = %file.display(), "size cache is corrupt, starting empty");
            HashMap::new()
        }
    }
}
