//! decruft - reclaim developer disk space, carefully.
//!
//! decruft locates reclaimable developer artifacts (tool caches, virtual
//! environments, dependency trees), measures them, and deletes them only
//! through a controlled protocol:
//!
//! - a persistent TTL [`cache`] makes repeat size measurements cheap and is
//!   a pure optimization; losing it never changes scan results
//! - the [`scan`] engine runs a bounded-parallel probe of cataloged cruft
//!   locations plus a depth-bounded search for venvs and dependency trees
//! - deletion is gated three ways: a path must be authorized (scanned or
//!   explicitly approved, see [`authorize`]), must pass the [`safety`]
//!   validator, and is then executed by the [`delete`] state machine
//!
//! The ancestor-of-home protection rule has no override: nothing in this
//! crate will delete a directory that contains the home tree.

pub mod authorize;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod delete;
pub mod error;
pub mod measure;
pub mod ops;
pub mod paths;
pub mod safety;
pub mod scan;

// Re-export the types the boundary surface is built from.
pub use authorize::{AuthorizationEntry, AuthorizationStore, Provenance};
pub use cache::{CacheEntry, CacheStats, SizeCache, DEFAULT_TTL};
pub use catalog::{CruftPattern, PatternCatalog};
pub use config::Config;
pub use delete::{BatchOutcome, DeletionExecutor, DeletionOutcome};
pub use error::{Error, Result};
pub use measure::ToolStatus;
pub use ops::{BatchRequest, ChildEntry, OpErrorKind, OpReport, Session};
pub use safety::{ProtectedPathSet, SafetyDecision};
pub use scan::{CruftItem, ScanOptions, ScanResult};
