//! Unit tests for CLI parsing

use assert_cmd::Command;
use clap::Parser;
use influx_migrate::cli::{Cli, Commands, OutputFormat};
use influx_migrate::migrator::{backup_target_label, copy_target_label};
use influx_migrate::store::CopyDestination;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[test]
fn test_backup_defaults() {
    let cli = Cli::parse_from(["influx-migrate", "backup", "telegraf"]);

    let Commands::Backup(args) = &cli.command else {
        panic!("expected backup command");
    };
    assert_eq!(args.database, "telegraf");
    assert_eq!(args.window_hours, 6);
    assert_eq!(args.hours_limit, None);
    assert_eq!(args.output_dir, PathBuf::from("."));

    assert_eq!(cli.window_pause_ms, 1000);
    assert_eq!(cli.output_format, OutputFormat::Human);
    assert_eq!(cli.state_dir, PathBuf::from("."));
}

#[test]
fn test_copy_positional_hours_limit() {
    let cli = Cli::parse_from(["influx-migrate", "copy", "telegraf", "archive", "720"]);

    let Commands::Copy(args) = &cli.command else {
        panic!("expected copy command");
    };
    assert_eq!(args.from_db, "telegraf");
    assert_eq!(args.to_db, "archive");
    assert_eq!(args.hours_limit, Some(720));
    assert_eq!(args.window_hours, 48);
    assert_eq!(args.retention_policy, "autogen");
}

#[test]
fn test_global_flags_build_configs() {
    let cli = Cli::parse_from([
        "influx-migrate",
        "--host",
        "influx.internal",
        "--port",
        "9999",
        "--ssl",
        "--timeout-secs",
        "5",
        "--max-retries",
        "0",
        "--window-pause-ms",
        "0",
        "--state-dir",
        "/tmp/progress",
        "copy",
        "a",
        "b",
        "--retention-policy",
        "one_year",
    ]);

    let store = cli.store_config();
    assert_eq!(store.base_url(), "https://influx.internal:9999");
    assert_eq!(store.timeout, Duration::from_secs(5));
    assert_eq!(store.retries, 0);

    let migration = cli.migration_config(48, Some(10));
    assert_eq!(migration.window_hours, 48);
    assert_eq!(migration.hours_limit, Some(10));
    assert!(migration.window_pause.is_zero());
    assert_eq!(migration.state_dir, PathBuf::from("/tmp/progress"));
}

#[test]
fn test_zero_window_rejected_at_parse() {
    let result = Cli::try_parse_from(["influx-migrate", "backup", "db", "--window-hours", "0"]);
    assert!(result.is_err());
}

#[test]
fn test_status_requires_exactly_one_target() {
    assert!(Cli::try_parse_from(["influx-migrate", "status", "--source", "db"]).is_err());
    assert!(Cli::try_parse_from([
        "influx-migrate",
        "status",
        "--source",
        "db",
        "--output-dir",
        "out",
        "--to-db",
        "archive",
    ])
    .is_err());
    assert!(Cli::try_parse_from([
        "influx-migrate",
        "status",
        "--source",
        "db",
        "--output-dir",
        "out"
    ])
    .is_ok());
}

#[test]
fn test_status_target_matches_run_labels() {
    let cli = Cli::parse_from([
        "influx-migrate",
        "status",
        "--source",
        "telegraf",
        "--to-db",
        "archive",
        "--retention-policy",
        "one_year",
    ]);
    let Commands::Status(args) = &cli.command else {
        panic!("expected status command");
    };
    assert_eq!(
        args.target_label(),
        copy_target_label(&CopyDestination::new("archive", "one_year"))
    );

    let cli = Cli::parse_from([
        "influx-migrate",
        "status",
        "--source",
        "telegraf",
        "--output-dir",
        "/srv/backups",
    ]);
    let Commands::Status(args) = &cli.command else {
        panic!("expected status command");
    };
    assert_eq!(
        args.target_label(),
        backup_target_label(Path::new("/srv/backups"))
    );
}

#[test]
fn test_binary_help_lists_commands() {
    let output = Command::cargo_bin("influx-migrate")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("backup"));
    assert!(stdout.contains("copy"));
    assert!(stdout.contains("status"));
}

#[test]
fn test_status_of_fresh_pair_prints_nothing_completed() {
    let temp_dir = tempfile::TempDir::new().unwrap();

    let output = Command::cargo_bin("influx-migrate")
        .unwrap()
        .args([
            "--state-dir",
            temp_dir.path().to_str().unwrap(),
            "--output-format",
            "json",
            "status",
            "--source",
            "telegraf",
            "--output-dir",
            temp_dir.path().to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["completed"], serde_json::json!([]));
    assert_eq!(json["source"], "telegraf");
}
