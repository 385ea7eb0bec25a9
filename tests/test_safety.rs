use std::fs;
use tempfile::tempdir;

use decruft::catalog::PatternCatalog;
use decruft::safety::{self, ProtectedPathSet, SafetyDecision};

const TEST_CATALOG: &str = r#"
[[patterns]]
path = ".cache/pip"
category = "python"
description = "pip download cache"

[[patterns]]
path = "Library/Containers/com.docker.docker"
category = "docker"
description = "Docker Desktop data"
safe = false
"#;

fn catalog() -> PatternCatalog {
    PatternCatalog::from_toml(TEST_CATALOG).unwrap()
}

fn assert_denied(decision: &SafetyDecision, expect_overridable: bool) {
    match decision {
        SafetyDecision::Deny { overridable, .. } => assert_eq!(*overridable, expect_overridable),
        SafetyDecision::Allow => panic!("expected denial, got Allow"),
    }
}

#[test]
fn test_home_itself_is_never_deletable() {
    let home = tempdir().unwrap();
    let protected = ProtectedPathSet::defaults(home.path());
    let catalog = catalog();

    for allow_override in [false, true] {
        let decision =
            safety::evaluate(home.path(), home.path(), &protected, &catalog, allow_override);
        assert_denied(&decision, false);
    }
}

#[test]
fn test_ancestor_of_home_is_never_deletable() {
    let home = tempdir().unwrap();
    let protected = ProtectedPathSet::defaults(home.path());
    let parent = home.path().parent().unwrap();

    let decision = safety::evaluate(parent, home.path(), &protected, &catalog(), true);
    assert_denied(&decision, false);
}

#[test]
fn test_unresolvable_path_is_denied() {
    let home = tempdir().unwrap();
    let protected = ProtectedPathSet::defaults(home.path());
    let missing = home.path().join("does-not-exist");

    let decision = safety::evaluate(&missing, home.path(), &protected, &catalog(), true);
    assert_denied(&decision, false);
}

#[test]
fn test_special_subdirectory_denied_unless_overridden() {
    let home = tempdir().unwrap();
    let documents = home.path().join("Documents");
    fs::create_dir(&documents).unwrap();
    let protected = ProtectedPathSet::defaults(home.path());
    let catalog = catalog();

    let decision = safety::evaluate(&documents, home.path(), &protected, &catalog, false);
    assert_denied(&decision, true);

    let decision = safety::evaluate(&documents, home.path(), &protected, &catalog, true);
    assert!(decision.is_allowed());
}

#[test]
fn test_arbitrary_path_under_home_denied_unless_overridden() {
    let home = tempdir().unwrap();
    let project = home.path().join("projects").join("thesis");
    fs::create_dir_all(&project).unwrap();
    let protected = ProtectedPathSet::defaults(home.path());
    let catalog = catalog();

    let decision = safety::evaluate(&project, home.path(), &protected, &catalog, false);
    assert_denied(&decision, true);

    let decision = safety::evaluate(&project, home.path(), &protected, &catalog, true);
    assert!(decision.is_allowed());
}

#[test]
fn test_safe_cataloged_location_allowed_without_override() {
    let home = tempdir().unwrap();
    let pip_cache = home.path().join(".cache").join("pip");
    fs::create_dir_all(&pip_cache).unwrap();
    let protected = ProtectedPathSet::defaults(home.path());

    let decision = safety::evaluate(&pip_cache, home.path(), &protected, &catalog(), false);
    assert!(decision.is_allowed());
}

#[test]
fn test_unsafe_cataloged_location_still_requires_override() {
    let home = tempdir().unwrap();
    let docker = home
        .path()
        .join("Library/Containers/com.docker.docker");
    fs::create_dir_all(&docker).unwrap();
    let protected = ProtectedPathSet::defaults(home.path());

    let decision = safety::evaluate(&docker, home.path(), &protected, &catalog(), false);
    assert_denied(&decision, true);
}

#[test]
fn test_configured_extra_protected_path() {
    let home = tempdir().unwrap();
    let vault = home.path().join("vault");
    fs::create_dir(&vault).unwrap();
    let protected =
        ProtectedPathSet::with_extra(home.path(), &["~/vault".to_string()]);

    assert!(protected.paths().iter().any(|p| p == &vault));

    let decision = safety::evaluate(&vault, home.path(), &protected, &catalog(), false);
    assert_denied(&decision, true);
}
