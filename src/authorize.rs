//! Session-scoped registry of paths eligible for deletion.
//!
//! This is the single code-level guardrail between a destructive request and
//! disk access: deletion of a path never proceeds unless an entry exists for
//! it here, either because a scan discovered it or because it was explicitly
//! approved after inspection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::paths;

/// How a path became eligible for deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Discovered by a scan.
    Scanned,
    /// Explicitly approved after inspection, with a stated reason.
    Approved,
}

#[derive(Debug, Clone)]
pub struct AuthorizationEntry {
    pub path: PathBuf,
    pub provenance: Provenance,
    /// Required for explicit approval; recorded for audit output.
    pub reason: Option<String>,
}

/// Owned by the calling session and passed to the scan engine and deletion
/// executor explicitly; there is no ambient global set.
#[derive(Debug, Default)]
pub struct AuthorizationStore {
    entries: HashMap<String, AuthorizationEntry>,
}

impl AuthorizationStore {
    pub fn new() -> AuthorizationStore {
        AuthorizationStore::default()
    }

    /// Register a scan-discovered path.
    pub fn register_scanned(&mut self, path: &Path) {
        self.entries.insert(
            paths::canonical_key(path),
            AuthorizationEntry {
                path: path.to_path_buf(),
                provenance: Provenance::Scanned,
                reason: None,
            },
        );
    }

    /// Register an explicitly approved path with its non-empty reason.
    pub fn register_approved(&mut self, path: &Path, reason: &str) {
        self.entries.insert(
            paths::canonical_key(path),
            AuthorizationEntry {
                path: path.to_path_buf(),
                provenance: Provenance::Approved,
                reason: Some(reason.to_string()),
            },
        );
    }

    pub fn is_authorized(&self, path: &Path) -> bool {
        self.entries.contains_key(&paths::canonical_key(path))
    }

    pub fn entry(&self, path: &Path) -> Option<&AuthorizationEntry> {
        self.entries.get(&paths::canonical_key(path))
    }

    /// Remove a path, after successful deletion or when it is found missing.
    pub fn release(&mut self, path: &Path) {
        self.entries.remove(&paths::canonical_key(path));
    }

    /// Key-based lookup for callers that resolved the key while the path
    /// still existed. After removal the key can no longer be recomputed
    /// from the path: any symlinks that were part of its ancestry are gone.
    pub fn is_authorized_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Key-based counterpart of [`release`](Self::release).
    pub fn release_key(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Snapshot of every entry with its store key, for batch deletion.
    pub fn snapshot(&self) -> Vec<(String, PathBuf)> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.path.clone()))
            .collect()
    }

    /// Snapshot of every authorized path.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.values().map(|e| e.path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
