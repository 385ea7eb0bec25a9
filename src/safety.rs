//! Path safety validation for deletions.
//!
//! Protected-path rules fall in two classes: convenience defaults the user
//! may consciously bypass with an override flag, and the ancestor-of-home
//! rule, which has no escape hatch.

use std::path::{Path, PathBuf};

use crate::catalog::PatternCatalog;
use crate::paths;

/// Absolute paths that are never deletable by default. The list is ordered:
/// exact matches are checked before ancestor containment.
#[derive(Debug, Clone)]
pub struct ProtectedPathSet {
    paths: Vec<PathBuf>,
}

const HOME_SPECIAL_SUBDIRS: &[&str] = &[
    "Documents",
    "Desktop",
    "Downloads",
    "Pictures",
    "Music",
    "Movies",
];

const SYSTEM_DIRS: &[&str] = &[
    "/",
    "/System",
    "/Applications",
    "/usr",
    "/bin",
    "/sbin",
    "/lib",
    "/etc",
];

impl ProtectedPathSet {
    /// The default protections: home, its special subdirectories, the
    /// filesystem root, and system/application/binary directories.
    pub fn defaults(home: &Path) -> ProtectedPathSet {
        let mut paths = vec![home.to_path_buf()];
        paths.extend(HOME_SPECIAL_SUBDIRS.iter().map(|sub| home.join(sub)));
        paths.extend(SYSTEM_DIRS.iter().map(PathBuf::from));
        ProtectedPathSet { paths }
    }

    /// Defaults plus configuration-supplied entries (`~` forms expanded
    /// against the home root).
    pub fn with_extra(home: &Path, extra: &[String]) -> ProtectedPathSet {
        let mut set = ProtectedPathSet::defaults(home);
        set.paths
            .extend(extra.iter().map(|raw| paths::expand_tilde(raw, home)));
        set
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn contains_exact(&self, resolved: &Path) -> bool {
        self.paths
            .iter()
            .any(|p| paths::canonical_or_lexical(p) == resolved)
    }

    /// The first protected entry that `resolved` is a strict descendant of.
    fn protecting_ancestor(&self, resolved: &Path) -> Option<PathBuf> {
        self.paths.iter().map(|p| paths::canonical_or_lexical(p)).find(|protected| {
            resolved != protected.as_path() && resolved.starts_with(protected)
        })
    }
}

/// Outcome of safety evaluation for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyDecision {
    Allow,
    Deny {
        reason: String,
        /// Whether the caller's override flag could have bypassed (or did
        /// not bypass) this denial. The ancestor-of-home rule is never
        /// overridable.
        overridable: bool,
    },
}

impl SafetyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, SafetyDecision::Allow)
    }
}

/// Decide whether `path` may be deleted.
///
/// The path is canonicalized first; resolution failure (broken symlink,
/// permission denied) is itself a denial, since none of the containment
/// checks can be trusted on an unresolved path. The ancestor-of-home check
/// runs unconditionally and ignores `allow_override`: deleting a directory
/// that contains the home tree has no escape hatch.
pub fn evaluate(
    path: &Path,
    home: &Path,
    protected: &ProtectedPathSet,
    catalog: &PatternCatalog,
    allow_override: bool,
) -> SafetyDecision {
    let resolved = match path.canonicalize() {
        Ok(resolved) => resolved,
        Err(err) => {
            return SafetyDecision::Deny {
                reason: format!("could not resolve path: {err}"),
                overridable: false,
            }
        }
    };
    let home = paths::canonical_or_lexical(home);

    // Never overridable: deleting this path would delete or orphan home.
    if home == resolved || home.starts_with(&resolved) {
        return SafetyDecision::Deny {
            reason: format!(
                "deleting {} would remove the home directory {}",
                resolved.display(),
                home.display()
            ),
            overridable: false,
        };
    }

    if protected.contains_exact(&resolved) {
        if allow_override {
            return SafetyDecision::Allow;
        }
        return SafetyDecision::Deny {
            reason: format!("{} is a protected path", resolved.display()),
            overridable: true,
        };
    }

    if let Some(ancestor) = protected.protecting_ancestor(&resolved) {
        // Known-safe cataloged locations under a protected ancestor are
        // deletable without an override.
        if catalog.is_safe_pattern(&resolved, &home) {
            return SafetyDecision::Allow;
        }
        if allow_override {
            return SafetyDecision::Allow;
        }
        return SafetyDecision::Deny {
            reason: format!(
                "{} is under protected directory {}",
                resolved.display(),
                ancestor.display()
            ),
            overridable: true,
        };
    }

    SafetyDecision::Allow
}
