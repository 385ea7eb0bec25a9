use std::fs;
use std::time::Duration;
use tempfile::tempdir;

use decruft::cache::{SizeCache, DEFAULT_TTL};
use decruft::paths;

#[test]
fn test_set_and_get_round_trip() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("measured");
    fs::create_dir(&target).unwrap();

    let cache = SizeCache::open(dir.path().join("cache.json"), DEFAULT_TTL);
    cache.set(&target, 4096, true, None);

    let entry = cache.get(&target).expect("entry should be present");
    assert_eq!(entry.size_bytes, 4096);
    assert!(entry.exists);
    assert!(entry.error.is_none());
}

#[test]
fn test_get_unknown_path_is_none() {
    let dir = tempdir().unwrap();
    let cache = SizeCache::open(dir.path().join("cache.json"), DEFAULT_TTL);
    assert!(cache.get(&dir.path().join("never-measured")).is_none());
}

#[test]
fn test_expired_entry_is_purged_on_get() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("stale");
    fs::create_dir(&target).unwrap();

    // Hand-write a cache document whose single entry is two hours old.
    let key = paths::canonical_key(&target);
    let backdated = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
        - 7200;
    let document = format!(
        r#"{{"{key}": {{"timestamp": {backdated}, "size_bytes": 123, "exists": true}}}}"#
    );
    let file = dir.path().join("cache.json");
    fs::write(&file, document).unwrap();

    let cache = SizeCache::open(file, DEFAULT_TTL);
    assert_eq!(cache.stats().total_entries, 1);
    assert!(cache.get(&target).is_none());
    assert_eq!(cache.stats().total_entries, 0);
}

#[test]
fn test_fresh_entry_survives_reload() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("kept");
    fs::create_dir(&target).unwrap();
    let file = dir.path().join("cache.json");

    let cache = SizeCache::open(file.clone(), DEFAULT_TTL);
    cache.set(&target, 1024 * 1024, true, None);
    cache.save();

    let reopened = SizeCache::open(file, DEFAULT_TTL);
    let entry = reopened.get(&target).expect("entry should persist");
    assert_eq!(entry.size_bytes, 1024 * 1024);
}

#[test]
fn test_corrupt_cache_file_starts_empty() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("thing");
    fs::create_dir(&target).unwrap();
    let file = dir.path().join("cache.json");
    fs::write(&file, "this is not json {{{").unwrap();

    let cache = SizeCache::open(file, DEFAULT_TTL);
    assert_eq!(cache.stats().total_entries, 0);

    // The cache remains usable after recovery.
    cache.set(&target, 77, true, None);
    assert_eq!(cache.get(&target).unwrap().size_bytes, 77);
}

#[test]
fn test_invalidate_removes_single_entry() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::create_dir(&a).unwrap();
    fs::create_dir(&b).unwrap();

    let cache = SizeCache::open(dir.path().join("cache.json"), DEFAULT_TTL);
    cache.set(&a, 1, true, None);
    cache.set(&b, 2, true, None);

    cache.invalidate(&a);
    assert!(cache.get(&a).is_none());
    assert_eq!(cache.get(&b).unwrap().size_bytes, 2);
}

#[test]
fn test_clear_persists_empty_document() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("gone");
    fs::create_dir(&target).unwrap();
    let file = dir.path().join("cache.json");

    let cache = SizeCache::open(file.clone(), DEFAULT_TTL);
    cache.set(&target, 42, true, None);
    cache.clear();

    assert!(cache.get(&target).is_none());
    let reopened = SizeCache::open(file, DEFAULT_TTL);
    assert_eq!(reopened.stats().total_entries, 0);
}

#[test]
fn test_stats_distinguish_missing_and_errored_entries() {
    let dir = tempdir().unwrap();
    let ok = dir.path().join("ok");
    let missing = dir.path().join("missing");
    let broken = dir.path().join("broken");
    fs::create_dir(&ok).unwrap();
    fs::create_dir(&broken).unwrap();

    let cache = SizeCache::open(dir.path().join("cache.json"), DEFAULT_TTL);
    cache.set(&ok, 500, true, None);
    cache.set(&missing, 0, false, None);
    cache.set(&broken, 0, true, Some("timeout: du took too long".to_string()));

    let stats = cache.stats();
    assert_eq!(stats.total_entries, 3);
    assert_eq!(stats.exists_count, 2);
    assert_eq!(stats.error_count, 1);
    assert_eq!(stats.total_cached_bytes, 500);
    assert_eq!(stats.ttl_seconds, 3600);
}

#[test]
fn test_last_writer_wins() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("rewritten");
    fs::create_dir(&target).unwrap();

    let cache = SizeCache::open(dir.path().join("cache.json"), Duration::from_secs(60));
    cache.set(&target, 100, true, None);
    cache.set(&target, 200, true, None);

    assert_eq!(cache.get(&target).unwrap().size_bytes, 200);
}
