use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

/// A throwaway home directory so tests never touch the real user's files,
/// catalog locations, or size cache.
fn fake_home() -> TempDir {
    tempdir().unwrap()
}

fn decruft(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("decruft").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CACHE_HOME", home.join(".cache"));
    cmd
}

fn make_junk(home: &Path, name: &str) -> std::path::PathBuf {
    let dir = home.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("data.bin"), vec![0u8; 256 * 1024]).unwrap();
    dir
}

#[test]
fn test_scan_empty_home_reports_nothing() {
    let home = fake_home();

    decruft(home.path())
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("No cruft found"));
}

#[test]
fn test_size_measures_a_directory() {
    let home = fake_home();
    let junk = make_junk(home.path(), "junk");

    decruft(home.path())
        .arg("size")
        .arg(&junk)
        .assert()
        .success()
        .stdout(predicate::str::contains("junk"));
}

#[test]
fn test_size_of_missing_path_fails() {
    let home = fake_home();

    decruft(home.path())
        .arg("size")
        .arg(home.path().join("ghost"))
        .assert()
        .failure();
}

#[test]
fn test_ls_lists_children() {
    let home = fake_home();
    let junk = make_junk(home.path(), "stuff");
    fs::create_dir_all(junk.join("subdir")).unwrap();

    decruft(home.path())
        .arg("ls")
        .arg(&junk)
        .assert()
        .success()
        .stdout(predicate::str::contains("Contents of"))
        .stdout(predicate::str::contains("subdir"));
}

#[test]
fn test_probe_missing_tool() {
    let home = fake_home();

    decruft(home.path())
        .arg("probe")
        .arg("definitely-not-a-real-tool-7f3a")
        .assert()
        .success()
        .stdout(predicate::str::contains("not installed"));
}

#[test]
fn test_delete_refuses_unscanned_path() {
    let home = fake_home();
    let precious = make_junk(home.path(), "precious");

    decruft(home.path())
        .arg("delete")
        .arg(&precious)
        .assert()
        .failure()
        .stdout(predicate::str::contains("was not found in a scan"));

    assert!(precious.exists());
}

#[test]
fn test_delete_with_reason_requires_force_under_home() {
    let home = fake_home();
    let junk = make_junk(home.path(), "junk");

    decruft(home.path())
        .arg("delete")
        .arg(&junk)
        .arg("--reason")
        .arg("stale experiment")
        .assert()
        .failure()
        .stdout(predicate::str::contains("is under protected directory"));

    assert!(junk.exists());
}

#[test]
fn test_delete_with_reason_and_force() {
    let home = fake_home();
    let junk = make_junk(home.path(), "junk");

    decruft(home.path())
        .arg("delete")
        .arg(&junk)
        .arg("--reason")
        .arg("stale experiment")
        .arg("--force")
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted"));

    assert!(!junk.exists());
}

#[test]
fn test_delete_json_output() {
    let home = fake_home();
    let junk = make_junk(home.path(), "junk");

    decruft(home.path())
        .arg("delete")
        .arg(&junk)
        .arg("--reason")
        .arg("stale experiment")
        .arg("--force")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"success\": true"))
        .stdout(predicate::str::contains("\"freed_bytes\""));
}

#[test]
fn test_clean_without_confirm_deletes_nothing() {
    let home = fake_home();
    let junk = make_junk(home.path(), "junk");

    decruft(home.path())
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing was deleted"));

    assert!(junk.exists());
}

#[test]
fn test_cache_stats_after_a_measurement() {
    let home = fake_home();
    let junk = make_junk(home.path(), "junk");

    decruft(home.path()).arg("size").arg(&junk).assert().success();

    decruft(home.path())
        .arg("cache")
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Size cache"))
        .stdout(predicate::str::contains("entries:       1"));
}

#[test]
fn test_cache_clear() {
    let home = fake_home();
    let junk = make_junk(home.path(), "junk");

    decruft(home.path()).arg("size").arg(&junk).assert().success();
    decruft(home.path())
        .arg("cache")
        .arg("clear")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache cleared"));

    decruft(home.path())
        .arg("cache")
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("entries:       0"));
}

#[test]
fn test_config_file_controls_the_scan() {
    let home = fake_home();

    // Point the discovery pass at a custom root via the settings file.
    let projects = home.path().join("work");
    let venv = projects.join("app").join(".venv");
    fs::create_dir_all(&venv).unwrap();
    fs::write(venv.join("pyvenv.cfg"), "home = /usr/bin\n").unwrap();
    fs::write(venv.join("payload.bin"), vec![0u8; 64 * 1024]).unwrap();

    fs::write(
        home.path().join(".decruft.toml"),
        r#"
[scan]
min_size_mb = 0
search_paths = ["work"]
workers = 2
"#,
    )
    .unwrap();

    // The venv is far below the 50 MB venv floor, so the scan still reports
    // nothing; the point is that the settings file parses and is honored.
    decruft(home.path())
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("No cruft found"));
}

#[test]
fn test_malformed_config_is_an_error() {
    let home = fake_home();
    fs::write(home.path().join(".decruft.toml"), "scan = \"not a table\"").unwrap();

    decruft(home.path())
        .arg("scan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("settings"));
}
