//! Boundary operations consumed by the presentation layer.
//!
//! A [`Session`] owns the collaborators (catalog, cache, authorization
//! store, protected set) for one process; every operation returns a
//! structured result the caller can render or branch on.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::authorize::AuthorizationStore;
use crate::cache::{CacheStats, SizeCache};
use crate::catalog::PatternCatalog;
use crate::config::Config;
use crate::delete::{BatchOutcome, DeletionExecutor, DeletionOutcome};
use crate::error::{Error, Result};
use crate::measure::{self, ToolStatus};
use crate::paths;
use crate::safety::ProtectedPathSet;
use crate::scan::{ScanOptions, ScanResult};
use crate::{scan, safety};

/// Machine-checkable failure kind carried by an [`OpReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpErrorKind {
    PathNotScanned,
    PathNotFound,
    ProtectedPath,
    PermissionDenied,
    SudoFailed,
    FullDiskAccessRequired,
    AlreadyAuthorized,
    ReasonRequired,
    UnknownError,
}

/// Structured result of a single-path boundary operation.
#[derive(Debug, Clone, Serialize)]
pub struct OpReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<OpErrorKind>,
    pub message: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freed_bytes: Option<u64>,
}

impl OpReport {
    fn success(path: &Path, message: String) -> OpReport {
        OpReport {
            success: true,
            error: None,
            message,
            path: path.display().to_string(),
            suggestion: None,
            freed_bytes: None,
        }
    }

    fn failure(path: &Path, error: OpErrorKind, message: String) -> OpReport {
        OpReport {
            success: false,
            error: Some(error),
            message,
            path: path.display().to_string(),
            suggestion: None,
            freed_bytes: None,
        }
    }

    fn with_suggestion(mut self, suggestion: impl Into<String>) -> OpReport {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Map a deletion outcome onto the report surface.
    pub fn from_deletion(path: &Path, outcome: &DeletionOutcome) -> OpReport {
        match outcome {
            DeletionOutcome::Succeeded { freed_bytes } => {
                let mut report = OpReport::success(
                    path,
                    format!(
                        "deleted {} ({})",
                        path.display(),
                        humansize::format_size(*freed_bytes, humansize::BINARY)
                    ),
                );
                report.freed_bytes = Some(*freed_bytes);
                report
            }
            DeletionOutcome::Unauthorized => OpReport::failure(
                path,
                OpErrorKind::PathNotScanned,
                format!(
                    "{} was not found in a scan and was never approved; nothing was deleted",
                    path.display()
                ),
            )
            .with_suggestion("run a scan first, or approve the path with an explicit reason"),
            DeletionOutcome::NotFound => OpReport::failure(
                path,
                OpErrorKind::PathNotFound,
                format!("{} does not exist (already deleted?)", path.display()),
            ),
            DeletionOutcome::ProtectedDenied { reason, overridable } => {
                let report =
                    OpReport::failure(path, OpErrorKind::ProtectedPath, reason.clone());
                if *overridable {
                    report.with_suggestion("pass the override flag if you are certain this is safe")
                } else {
                    report.with_suggestion("this safety check cannot be bypassed")
                }
            }
            DeletionOutcome::PermissionDenied => OpReport::failure(
                path,
                OpErrorKind::PermissionDenied,
                format!("permission denied deleting {}", path.display()),
            )
            .with_suggestion("retry with elevated deletion"),
            DeletionOutcome::SudoFailed { stderr } => OpReport::failure(
                path,
                OpErrorKind::SudoFailed,
                format!("elevated removal failed: {stderr}"),
            ),
            DeletionOutcome::FullDiskAccessRequired => OpReport::failure(
                path,
                OpErrorKind::FullDiskAccessRequired,
                "even elevated removal was refused by the OS sandbox".to_string(),
            )
            .with_suggestion(
                "grant the terminal Full Disk Access in System Settings > Privacy & Security",
            ),
            DeletionOutcome::UnknownError { message } => {
                OpReport::failure(path, OpErrorKind::UnknownError, message.clone())
            }
        }
    }
}

/// One measured child of a listed directory.
#[derive(Debug, Clone, Serialize)]
pub struct ChildEntry {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
}

/// Result of a batch-deletion request.
#[derive(Debug)]
pub enum BatchRequest {
    Ran(BatchOutcome),
    /// The caller did not confirm; nothing was attempted.
    ConfirmationRequired,
    /// The authorization store is empty; nothing to delete.
    NothingAuthorized,
}

/// Per-process state shared by all boundary operations.
pub struct Session {
    home: PathBuf,
    catalog: PatternCatalog,
    cache: SizeCache,
    auth: AuthorizationStore,
    protected: ProtectedPathSet,
    config: Config,
}

impl Session {
    pub fn new(config: Config) -> Result<Session> {
        let home = paths::home_dir()?;
        Session::with_home(config, home)
    }

    /// Session rooted at an explicit home directory. Tests use this to run
    /// against a temporary tree.
    pub fn with_home(config: Config, home: PathBuf) -> Result<Session> {
        let catalog = PatternCatalog::builtin()?;
        let ttl = std::time::Duration::from_secs(config.cache.ttl_seconds.max(1));
        let cache = match &config.cache.file {
            Some(file) => SizeCache::open(file.clone(), ttl),
            None => SizeCache::open_default(ttl),
        };
        let protected = ProtectedPathSet::with_extra(&home, &config.safety.protected_paths);

        Ok(Session {
            home,
            catalog,
            cache,
            auth: AuthorizationStore::new(),
            protected,
            config,
        })
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    pub fn authorized_count(&self) -> usize {
        self.auth.len()
    }

    pub fn scan_options(&self) -> ScanOptions {
        self.config.scan_options(&self.home)
    }

    /// Run a scan and register every discovered item as deletable.
    pub fn scan(&mut self, options: &ScanOptions) -> Result<ScanResult> {
        let result = scan::scan_all(&self.catalog, &self.cache, &self.home, options)?;
        for item in result.all_items() {
            self.auth.register_scanned(&item.path);
        }
        Ok(result)
    }

    /// Measure one directory through the cache.
    pub fn measure_size(&self, path: &Path) -> Result<u64> {
        if !path.exists() {
            return Err(Error::PathNotFound(path.to_path_buf()));
        }
        match measure::dir_size(path, &self.cache, measure::SIZE_TIMEOUT)? {
            Some(size) => Ok(size),
            None => Err(Error::ScanMeasurement {
                path: path.to_path_buf(),
                reason: "size unavailable".to_string(),
            }),
        }
    }

    /// List the immediate children of a directory with their sizes, largest
    /// first, bounded by `max_items`. Unmeasurable children are skipped.
    pub fn list_children(&self, path: &Path, max_items: usize) -> Result<Vec<ChildEntry>> {
        if !path.exists() {
            return Err(Error::PathNotFound(path.to_path_buf()));
        }

        let mut children = Vec::new();
        for entry in std::fs::read_dir(path)?.flatten().take(max_items) {
            let child = entry.path();
            let size = measure::dir_size(&child, &self.cache, measure::DISCOVERY_SIZE_TIMEOUT)
                .ok()
                .flatten();
            if let Some(size_bytes) = size {
                children.push(ChildEntry {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    path: child,
                    size_bytes,
                });
            }
        }

        children.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
        Ok(children)
    }

    pub fn probe_tool(&self, tool: &str) -> (ToolStatus, Option<String>) {
        let status = measure::probe_tool(tool);
        let location = match status {
            ToolStatus::Installed => measure::probe_tool_path(tool),
            _ => None,
        };
        (status, location)
    }

    /// Approve a path outside any scan for deletion. The caller must have
    /// inspected the path first and must supply a non-empty reason.
    pub fn approve_for_deletion(&mut self, path: &Path, reason: &str) -> OpReport {
        if reason.trim().is_empty() {
            return OpReport::failure(
                path,
                OpErrorKind::ReasonRequired,
                "explicit approval requires a non-empty reason".to_string(),
            );
        }
        if !path.exists() {
            return OpReport::failure(
                path,
                OpErrorKind::PathNotFound,
                format!("cannot approve non-existent path {}", path.display()),
            );
        }

        let resolved = paths::canonical_or_lexical(path);
        if let safety::SafetyDecision::Deny { reason, overridable: false } =
            safety::evaluate(path, &self.home, &self.protected, &self.catalog, false)
        {
            // Only hard denials block approval; overridable ones are decided
            // at deletion time.
            return OpReport::failure(path, OpErrorKind::ProtectedPath, reason)
                .with_suggestion("this safety check cannot be bypassed");
        }
        if self
            .protected
            .paths()
            .iter()
            .any(|p| paths::canonical_or_lexical(p) == resolved)
        {
            return OpReport::failure(
                path,
                OpErrorKind::ProtectedPath,
                format!("cannot approve protected path {}", path.display()),
            );
        }
        if self.auth.is_authorized(path) {
            return OpReport::failure(
                path,
                OpErrorKind::AlreadyAuthorized,
                format!("{} is already authorized for deletion", path.display()),
            );
        }

        self.auth.register_approved(path, reason.trim());
        let size = measure::dir_size(path, &self.cache, measure::SIZE_TIMEOUT)
            .ok()
            .flatten();
        let size_str = size
            .map(|s| humansize::format_size(s, humansize::BINARY))
            .unwrap_or_else(|| "unknown size".to_string());
        OpReport::success(
            path,
            format!(
                "approved {} ({size_str}) for deletion: {}",
                path.display(),
                reason.trim()
            ),
        )
    }

    /// Delete one path through the full state machine.
    pub fn delete(&mut self, path: &Path, use_elevated: bool, force_override: bool) -> OpReport {
        let outcome = self
            .executor()
            .delete(path, use_elevated, force_override);
        OpReport::from_deletion(path, &outcome)
    }

    /// Delete everything currently authorized, sequentially.
    pub fn delete_all_authorized(&mut self, confirm: bool, use_elevated: bool) -> BatchRequest {
        if !confirm {
            return BatchRequest::ConfirmationRequired;
        }
        if self.auth.is_empty() {
            return BatchRequest::NothingAuthorized;
        }
        BatchRequest::Ran(self.executor().delete_all(use_elevated))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn save_cache(&self) {
        self.cache.save();
    }

    fn executor(&mut self) -> DeletionExecutor<'_> {
        DeletionExecutor {
            auth: &mut self.auth,
            protected: &self.protected,
            catalog: &self.catalog,
            cache: &self.cache,
            home: &self.home,
        }
    }
}

