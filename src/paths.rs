//! Path resolution helpers: home-relative templates, canonical keys.

use serde::Deserialize;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// A path relative to the user's home directory, as stored in the pattern
/// catalog. Resolution takes the home root as an explicit parameter so no
/// ambient state or string templating is involved.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct HomeRelative(String);

impl HomeRelative {
    pub fn resolve(&self, home: &Path) -> PathBuf {
        home.join(&self.0)
    }
}

/// The user's home directory.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| Error::Config("could not determine home directory".into()))
}

/// Stable string key for a path, used by the cache and the authorization
/// store. Symlinks are resolved when the path exists; for paths that no
/// longer exist (a just-deleted directory being released, for example) the
/// key falls back to lexical normalization of the absolute path, so both
/// forms agree as long as no symlink sits in between.
pub fn canonical_key(path: &Path) -> String {
    match path.canonicalize() {
        Ok(resolved) => resolved.to_string_lossy().into_owned(),
        Err(_) => normalize_lexically(path).to_string_lossy().into_owned(),
    }
}

/// Canonicalize with a lexical fallback, keeping a `PathBuf`.
pub fn canonical_or_lexical(path: &Path) -> PathBuf {
    path.canonicalize()
        .unwrap_or_else(|_| normalize_lexically(path))
}

/// Make a path absolute and strip `.` / `..` segments without touching the
/// filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Expand a leading `~` against the given home root. Config-supplied
/// protected paths use this form.
pub fn expand_tilde(raw: &str, home: &Path) -> PathBuf {
    if raw == "~" {
        home.to_path_buf()
    } else if let Some(rest) = raw.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(raw)
    }
}

/// Shorten a path for display by replacing the home prefix with `~`.
pub fn display_path(path: &Path, home: &Path) -> String {
    match path.strip_prefix(home) {
        Ok(relative) => format!("~/{}", relative.display()),
        Err(_) => path.display().to_string(),
    }
}
