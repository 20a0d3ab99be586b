//! Integration tests for checkpoint persistence

use influx_migrate::resume::{CheckpointSet, CheckpointStore, ProgressKey, ResumeError};
use tempfile::TempDir;

#[test]
fn test_missing_checkpoint_loads_empty_without_side_effects() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());

    let set = store
        .load_or_default(&ProgressKey::new("telegraf", "backup"))
        .unwrap();

    assert!(set.is_empty());
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_save_then_reload_across_store_instances() {
    let temp_dir = TempDir::new().unwrap();
    let key = ProgressKey::new("telegraf", "archive");

    let mut set = CheckpointSet::new();
    set.insert("cpu");
    set.insert("mem");
    CheckpointStore::new(temp_dir.path()).save(&key, &set).unwrap();

    let reloaded = CheckpointStore::new(temp_dir.path())
        .load_or_default(&key)
        .unwrap();
    assert_eq!(reloaded, set);
}

#[test]
fn test_membership_grows_monotonically() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());
    let key = ProgressKey::new("telegraf", "backup");

    for series in ["cpu", "disk", "mem"] {
        let mut set = store.load_or_default(&key).unwrap();
        let before = set.len();
        set.insert(series);
        store.save(&key, &set).unwrap();
        assert_eq!(store.load_or_default(&key).unwrap().len(), before + 1);
    }

    let names: Vec<_> = store
        .load_or_default(&key)
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    assert_eq!(names, vec!["cpu", "disk", "mem"]);
}

#[test]
fn test_pairs_never_share_state() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());

    // Naive `progress_{a}_{b}` naming would collide on these
    let first = ProgressKey::new("a_b", "c");
    let second = ProgressKey::new("a", "b_c");
    assert_ne!(store.path_for(&first), store.path_for(&second));

    store
        .save(&first, &["cpu"].into_iter().collect())
        .unwrap();
    assert!(store.load_or_default(&second).unwrap().is_empty());
}

#[test]
fn test_no_temp_files_left_after_save() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());
    let key = ProgressKey::new("telegraf", "backup");

    for _ in 0..3 {
        store.save(&key, &["cpu"].into_iter().collect()).unwrap();
    }

    let json_files: Vec<_> = std::fs::read_dir(temp_dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .collect();
    assert_eq!(json_files.len(), 1);
}

#[test]
fn test_truncated_checkpoint_is_corrupt() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());
    let key = ProgressKey::new("telegraf", "backup");
    store.save(&key, &["cpu"].into_iter().collect()).unwrap();

    let path = store.path_for(&key);
    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, &content[..content.len() / 2]).unwrap();

    assert!(matches!(
        store.load_or_default(&key),
        Err(ResumeError::Corrupt { .. })
    ));
}
