//! Settings file loading (`.decruft.toml` in the working directory, falling
//! back to the user's home).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::DEFAULT_SEARCH_DIRS;
use crate::error::{Error, Result};
use crate::paths;
use crate::scan::ScanOptions;

pub const CONFIG_FILE_NAME: &str = ".decruft.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanSection,
    pub safety: SafetySection,
    pub cache: CacheSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScanSection {
    pub min_size_mb: u64,
    pub include_venvs: bool,
    pub include_dependency_trees: bool,
    pub timeout_seconds: u64,
    pub max_depth: usize,
    pub workers: usize,
    /// Home-relative (or `~`-prefixed) roots searched for venvs and
    /// dependency trees.
    pub search_paths: Vec<String>,
}

impl Default for ScanSection {
    fn default() -> Self {
        ScanSection {
            min_size_mb: 100,
            include_venvs: true,
            include_dependency_trees: true,
            timeout_seconds: 30,
            max_depth: 4,
            workers: 4,
            search_paths: DEFAULT_SEARCH_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SafetySection {
    /// Extra protected paths beyond the built-in defaults.
    pub protected_paths: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub ttl_seconds: u64,
    /// Override for the cache file location.
    pub file: Option<PathBuf>,
}

impl Default for CacheSection {
    fn default() -> Self {
        CacheSection {
            ttl_seconds: 3600,
            file: None,
        }
    }
}

impl Config {
    /// Load from the default locations. A missing file yields defaults; a
    /// malformed one is a configuration error.
    pub fn load_default(home: &Path) -> Result<Config> {
        let local = std::env::current_dir()
            .map(|cwd| cwd.join(CONFIG_FILE_NAME))
            .ok()
            .filter(|p| p.exists());
        let path = local.unwrap_or_else(|| home.join(CONFIG_FILE_NAME));
        Config::load(&path)
    }

    pub fn load(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|err| Error::Config(format!("invalid {}: {err}", path.display())))
    }

    /// Scan options derived from this configuration.
    pub fn scan_options(&self, home: &Path) -> ScanOptions {
        let mut options = ScanOptions::defaults_for_home(home);
        options.min_size_mb = self.scan.min_size_mb;
        options.include_venvs = self.scan.include_venvs;
        options.include_dependency_trees = self.scan.include_dependency_trees;
        options.size_timeout = Duration::from_secs(self.scan.timeout_seconds);
        options.max_depth = self.scan.max_depth;
        options.workers = self.scan.workers;
        options.search_roots = self
            .scan
            .search_paths
            .iter()
            .map(|raw| {
                if raw.starts_with('~') || Path::new(raw).is_absolute() {
                    paths::expand_tilde(raw, home)
                } else {
                    home.join(raw)
                }
            })
            .collect();
        options
    }
}
