//! State-machine-gated deletion of authorized paths.
//!
//! Every request walks the same gates in order: authorization, existence,
//! safety validation, then removal and outcome classification. Batch
//! deletion applies the machine sequentially; elevated subprocess spawning
//! is kept serial so each privileged action is auditable one at a time.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::authorize::AuthorizationStore;
use crate::cache::SizeCache;
use crate::catalog::PatternCatalog;
use crate::error::Error;
use crate::measure;
use crate::paths;
use crate::safety::{self, ProtectedPathSet, SafetyDecision};

const ELEVATED_TIMEOUT: Duration = Duration::from_secs(120);

/// Stderr signature of an OS sandbox denial that persists under elevation.
/// Distinct from a plain permission failure: the fix is a one-time
/// filesystem-access grant, not sudo.
const SANDBOX_DENIAL_SIGNATURE: &str = "Operation not permitted";

/// Terminal state of one deletion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    Succeeded {
        freed_bytes: u64,
    },
    /// The path was never scanned or approved. No mutation was attempted.
    Unauthorized,
    /// The path no longer exists; its authorization has been released.
    NotFound,
    /// The safety validator refused the path.
    ProtectedDenied {
        reason: String,
        overridable: bool,
    },
    /// Non-elevated removal hit a permission error; retry with elevation.
    PermissionDenied,
    /// Elevated removal failed for an ordinary reason.
    SudoFailed {
        stderr: String,
    },
    /// Elevated removal was refused by the OS sandbox; elevation alone
    /// cannot fix this.
    FullDiskAccessRequired,
    UnknownError {
        message: String,
    },
}

impl DeletionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeletionOutcome::Succeeded { .. })
    }

    /// Would retrying with elevated privileges plausibly succeed?
    pub fn suggests_elevation(&self) -> bool {
        matches!(self, DeletionOutcome::PermissionDenied)
    }
}

/// Result of a sequential batch deletion over every authorized path.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<BatchFailure>,
    /// Paths that had vanished before removal. Skipped silently, not
    /// counted as failures; their authorizations were released.
    pub skipped_missing: Vec<PathBuf>,
    pub total_freed_bytes: u64,
    /// True when at least one failure would plausibly succeed elevated.
    pub retry_with_elevation: bool,
}

#[derive(Debug)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub outcome: DeletionOutcome,
}

/// Executes deletions against an authorization store and safety validator.
/// Borrowed from the owning session for the duration of the operation.
pub struct DeletionExecutor<'a> {
    pub auth: &'a mut AuthorizationStore,
    pub protected: &'a ProtectedPathSet,
    pub catalog: &'a PatternCatalog,
    pub cache: &'a SizeCache,
    pub home: &'a Path,
}

impl DeletionExecutor<'_> {
    /// Run the full state machine for one path.
    pub fn delete(&mut self, path: &Path, use_elevated: bool, force_override: bool) -> DeletionOutcome {
        // The store key must be resolved while the path and any symlinks in
        // its ancestry still exist; after removal it could only be
        // reconstructed lexically, which would miss the registered entry.
        let key = paths::canonical_key(path);
        self.delete_keyed(path, &key, use_elevated, force_override)
    }

    fn delete_keyed(
        &mut self,
        path: &Path,
        key: &str,
        use_elevated: bool,
        force_override: bool,
    ) -> DeletionOutcome {
        if !self.auth.is_authorized_key(key) {
            return DeletionOutcome::Unauthorized;
        }

        if !path.exists() {
            self.auth.release_key(key);
            return DeletionOutcome::NotFound;
        }

        match safety::evaluate(path, self.home, self.protected, self.catalog, force_override) {
            SafetyDecision::Allow => {}
            SafetyDecision::Deny { reason, overridable } => {
                return DeletionOutcome::ProtectedDenied { reason, overridable };
            }
        }

        // Best-effort size for the freed-bytes report; failure to measure
        // must not block the deletion itself.
        let freed_bytes = measure::dir_size(path, self.cache, measure::SIZE_TIMEOUT)
            .ok()
            .flatten()
            .unwrap_or(0);

        let removal = if use_elevated {
            remove_elevated(path)
        } else {
            remove_local(path)
        };

        match removal {
            Ok(()) => {
                self.auth.release_key(key);
                self.cache.invalidate_key(key);
                info!(path = %path.display(), freed_bytes, "deleted");
                DeletionOutcome::Succeeded { freed_bytes }
            }
            Err(outcome) => {
                warn!(path = %path.display(), ?outcome, "deletion failed");
                outcome
            }
        }
    }

    /// Apply the single-path machine to every currently authorized path,
    /// continuing past individual failures. The caller already confirmed
    /// bulk deletion, so the overridable protections are bypassed; the
    /// ancestor-of-home rule still applies to every path.
    pub fn delete_all(&mut self, use_elevated: bool) -> BatchOutcome {
        let mut batch = BatchOutcome::default();

        let mut targets = self.auth.snapshot();
        targets.sort_by(|a, b| a.1.cmp(&b.1));

        for (key, path) in targets {
            match self.delete_keyed(&path, &key, use_elevated, true) {
                DeletionOutcome::Succeeded { freed_bytes } => {
                    batch.total_freed_bytes += freed_bytes;
                    batch.deleted.push(path);
                }
                DeletionOutcome::NotFound => batch.skipped_missing.push(path),
                outcome => {
                    if outcome.suggests_elevation() {
                        batch.retry_with_elevation = true;
                    }
                    batch.failed.push(BatchFailure { path, outcome });
                }
            }
        }

        batch
    }
}

fn remove_local(path: &Path) -> Result<(), DeletionOutcome> {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(DeletionOutcome::PermissionDenied)
        }
        Err(err) => Err(DeletionOutcome::UnknownError {
            message: format!("error deleting {}: {err}", path.display()),
        }),
    }
}

fn remove_elevated(path: &Path) -> Result<(), DeletionOutcome> {
    let path_str = path.to_string_lossy();
    match measure::run_with_timeout("sudo", &["rm", "-rf", &path_str], ELEVATED_TIMEOUT) {
        Ok(output) if output.status.success() => Ok(()),
        Ok(output) => {
            let stderr = output.stderr.trim().to_string();
            if stderr.contains(SANDBOX_DENIAL_SIGNATURE) {
                Err(DeletionOutcome::FullDiskAccessRequired)
            } else {
                Err(DeletionOutcome::SudoFailed { stderr })
            }
        }
        Err(err @ Error::Timeout { .. }) => Err(DeletionOutcome::SudoFailed {
            stderr: err.to_string(),
        }),
        Err(err) => Err(DeletionOutcome::UnknownError {
            message: format!("could not run elevated removal: {err}"),
        }),
    }
}
