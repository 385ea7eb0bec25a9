//! Static catalog of known cruft locations, loaded from the embedded
//! `patterns.toml` at startup.

use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::paths::{self, HomeRelative};

// Embed the pattern table directly in the binary at compile time.
const PATTERNS_TOML: &str = include_str!("../patterns.toml");

/// A known location that accumulates developer cruft.
#[derive(Debug, Clone, Deserialize)]
pub struct CruftPattern {
    /// Location relative to the user's home directory.
    pub path: HomeRelative,
    pub category: String,
    pub description: String,
    /// Binary probed to decide whether the owning tool is still installed.
    #[serde(default)]
    pub check_installed: Option<String>,
    /// Safe to delete without breaking running applications.
    #[serde(default = "default_safe")]
    pub safe: bool,
    /// Only report instances larger than this.
    #[serde(default = "default_min_size_mb")]
    pub min_size_mb: u64,
}

fn default_safe() -> bool {
    true
}

fn default_min_size_mb() -> u64 {
    100
}

#[derive(Debug, Deserialize)]
struct CatalogConfig {
    patterns: Vec<CruftPattern>,
}

/// Read-only registry of [`CruftPattern`]s.
#[derive(Debug)]
pub struct PatternCatalog {
    patterns: Vec<CruftPattern>,
}

impl PatternCatalog {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<PatternCatalog> {
        PatternCatalog::from_toml(PATTERNS_TOML)
    }

    pub fn from_toml(raw: &str) -> Result<PatternCatalog> {
        let config: CatalogConfig = toml::from_str(raw)
            .map_err(|err| Error::Config(format!("invalid pattern catalog: {err}")))?;
        Ok(PatternCatalog {
            patterns: config.patterns,
        })
    }

    pub fn patterns(&self) -> &[CruftPattern] {
        &self.patterns
    }

    /// Does this exact resolved path correspond to a cataloged pattern marked
    /// safe? Used by the safety validator to permit known-safe subpaths under
    /// an otherwise-protected ancestor.
    pub fn is_safe_pattern(&self, path: &Path, home: &Path) -> bool {
        let target = paths::canonical_or_lexical(path);
        self.patterns.iter().any(|pattern| {
            pattern.safe && paths::canonical_or_lexical(&pattern.path.resolve(home)) == target
        })
    }
}

/// Directory names that identify a Python virtual environment candidate.
pub const VENV_NAMES: &[&str] = &[".venv", "venv", ".env", "env", ".virtualenv", "virtualenv"];

/// Marker file that confirms a candidate directory really is a venv.
pub const VENV_MARKER: &str = "pyvenv.cfg";

/// Directory name package managers use for installed dependency trees.
pub const DEP_TREE_DIR: &str = "node_modules";

/// Home-relative roots searched for venvs and dependency trees.
pub const DEFAULT_SEARCH_DIRS: &[&str] = &[
    "Documents/GitHub",
    "Documents",
    "projects",
    "code",
    "dev",
    "src",
    "repos",
    "work",
];
