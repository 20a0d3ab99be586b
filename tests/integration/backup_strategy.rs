//! Integration tests for the file backup strategy

use crate::support::mock_store::{hours_before_t0, point, t0, MockStore};
use influx_migrate::migrator::{FileBackupStrategy, MigrationConfig, MigrationEngine};
use influx_migrate::output::backup_file_name;
use influx_migrate::Record;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn run_config(state_dir: &TempDir) -> MigrationConfig {
    MigrationConfig::default()
        .with_state_dir(state_dir.path())
        .with_window_pause(Duration::ZERO)
}

#[tokio::test]
async fn test_backup_file_holds_line_protocol_per_window() {
    let state_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let store = MockStore::new("telegraf").with_series(
        "cpu",
        &[t0(), hours_before_t0(1), hours_before_t0(7)],
    );

    let engine = MigrationEngine::new(Arc::new(store.clone()), "telegraf", run_config(&state_dir));
    let mut strategy = FileBackupStrategy::new("telegraf", output_dir.path());
    let summary = engine.run(&mut strategy).await.unwrap();

    let path = output_dir
        .path()
        .join(backup_file_name("telegraf", "cpu", t0()));
    let content = std::fs::read_to_string(&path).unwrap();

    let ns = |h: i64| hours_before_t0(h).timestamp_nanos_opt().unwrap();
    // The latest point sits on the first window's exclusive end bound
    assert_eq!(
        content,
        format!(
            "cpu,host=server\\ a value=1i {}\ncpu,host=server\\ a value=2i {}\n",
            ns(1),
            ns(7)
        )
    );
    assert_eq!(summary.rows_transferred, 2);
    assert_eq!(summary.windows_transferred, 2);
    assert!(strategy.current_file().is_none());
}

#[tokio::test]
async fn test_record_without_time_is_skipped() {
    let state_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let broken = (
        hours_before_t0(2),
        Record::new().with_field("value", 9i64),
    );
    let store = MockStore::new("telegraf").with_points(
        "cpu",
        vec![point(t0(), 0), point(hours_before_t0(1), 1), broken],
    );

    let engine = MigrationEngine::new(Arc::new(store.clone()), "telegraf", run_config(&state_dir));
    let mut strategy = FileBackupStrategy::new("telegraf", output_dir.path());
    let summary = engine.run(&mut strategy).await.unwrap();

    let path = output_dir
        .path()
        .join(backup_file_name("telegraf", "cpu", t0()));
    let content = std::fs::read_to_string(&path).unwrap();

    assert_eq!(content.lines().count(), 1);
    assert!(content.starts_with("cpu,host=server\\ a value=1i "));
    assert_eq!(summary.rows_transferred, 1);
    assert_eq!(summary.completed, 1);
}

#[tokio::test]
async fn test_fetch_failure_drops_window_but_checkpoints() {
    let state_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let store = MockStore::new("telegraf")
        .with_series("cpu", &[t0(), hours_before_t0(1), hours_before_t0(7)])
        .failing_fetch("cpu");

    let engine = MigrationEngine::new(Arc::new(store.clone()), "telegraf", run_config(&state_dir));
    let mut strategy = FileBackupStrategy::new("telegraf", output_dir.path());
    let summary = engine.run(&mut strategy).await.unwrap();

    assert_eq!(summary.windows_failed, 2);
    assert_eq!(summary.windows_transferred, 0);
    assert_eq!(summary.completed, 1);

    let path = output_dir
        .path()
        .join(backup_file_name("telegraf", "cpu", t0()));
    assert_eq!(std::fs::read_to_string(path).unwrap(), "");
}

#[tokio::test]
async fn test_unwritable_output_leaves_series_incomplete() {
    let state_dir = TempDir::new().unwrap();
    let blocker = TempDir::new().unwrap();
    let not_a_dir = blocker.path().join("file");
    std::fs::write(&not_a_dir, "").unwrap();

    let store = MockStore::new("telegraf").with_series("cpu", &[t0(), hours_before_t0(1)]);
    let engine = MigrationEngine::new(Arc::new(store.clone()), "telegraf", run_config(&state_dir));
    let mut strategy = FileBackupStrategy::new("telegraf", &not_a_dir);
    let summary = engine.run(&mut strategy).await.unwrap();

    assert_eq!(summary.incomplete, 1);
    assert_eq!(summary.completed, 0);
    assert_eq!(store.transfer_count(), 0);
}

#[tokio::test]
async fn test_rerun_after_interruption_restarts_file() {
    let state_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let path = output_dir
        .path()
        .join(backup_file_name("telegraf", "cpu", t0()));
    std::fs::write(&path, "stale line from an interrupted run\n").unwrap();

    let store = MockStore::new("telegraf").with_series("cpu", &[t0(), hours_before_t0(1)]);
    let engine = MigrationEngine::new(Arc::new(store.clone()), "telegraf", run_config(&state_dir));
    let mut strategy = FileBackupStrategy::new("telegraf", output_dir.path());
    engine.run(&mut strategy).await.unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(!content.contains("stale"));
    assert_eq!(content.lines().count(), 1);
}

#[tokio::test]
async fn test_series_differing_only_by_separator_keep_their_rows() {
    let state_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let instants = [t0(), hours_before_t0(1), hours_before_t0(2), hours_before_t0(3)];
    let store = MockStore::new("telegraf")
        .with_series("http/req", &instants)
        .with_series("http_req", &instants);

    let engine = MigrationEngine::new(Arc::new(store.clone()), "telegraf", run_config(&state_dir));
    let mut strategy = FileBackupStrategy::new("telegraf", output_dir.path());
    let summary = engine.run(&mut strategy).await.unwrap();

    assert_eq!(summary.completed, 2);
    assert_eq!(summary.rows_transferred, 6);
    for series in ["http/req", "http_req"] {
        let path = output_dir
            .path()
            .join(backup_file_name("telegraf", series, t0()));
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3, "{series}");
        assert!(content.lines().all(|l| l.starts_with(&format!("{series},"))));
    }
}
