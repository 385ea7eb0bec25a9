//! Error taxonomy for scan and measurement operations. Deletion refusals
//! are states of the deletion machine, not errors; see `delete::DeletionOutcome`.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A single item could not be measured or its output could not be parsed.
    /// Scans aggregate these and continue; they never abort a pass.
    #[error("measurement failed for {path}: {reason}")]
    ScanMeasurement { path: PathBuf, reason: String },

    /// An external process exceeded its time budget. Classified, not retried.
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// The target no longer exists. Treated as already resolved, not a failure.
    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
