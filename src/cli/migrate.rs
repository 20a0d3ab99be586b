//! Backup and copy commands

use crate::metrics;
use crate::migrator::config::{
    DEFAULT_COPY_WINDOW_HOURS, DEFAULT_RETENTION_POLICY, DEFAULT_WINDOW_HOURS,
};
use crate::migrator::{
    FileBackupStrategy, MigrationConfig, MigrationEngine, RemoteCopyStrategy, RunSummary,
    TransferStrategy,
};
use crate::store::config::{DEFAULT_PORT, DEFAULT_RETRIES};
use crate::store::{InfluxHttpClient, StoreConfig};
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::status::StatusArgs;
use super::CliError;

/// InfluxDB migration CLI
#[derive(Parser, Debug)]
#[command(name = "influx-migrate")]
#[command(about = "Resumable, windowed backup and copy of InfluxDB measurements", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// InfluxDB host
    #[arg(long, global = true, env = "INFLUXDB_HOST", default_value = "localhost")]
    pub host: String,

    /// InfluxDB HTTP port
    #[arg(long, global = true, env = "INFLUXDB_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// InfluxDB user
    #[arg(long, global = true, env = "INFLUXDB_USER")]
    pub username: Option<String>,

    /// InfluxDB password
    #[arg(long, global = true, env = "INFLUXDB_PASS", hide_env_values = true)]
    pub password: Option<String>,

    /// Connect over HTTPS
    #[arg(long, global = true, default_value_t = false)]
    pub ssl: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Maximum number of retries for failed requests (range: 0-10)
    #[arg(long, global = true, default_value_t = DEFAULT_RETRIES, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub max_retries: u32,

    /// Directory holding checkpoint files
    #[arg(long, global = true, default_value = ".")]
    pub state_dir: PathBuf,

    /// Pause between windows in milliseconds (0 disables it)
    #[arg(long, global = true, default_value_t = 1000)]
    pub window_pause_ms: u64,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Connection settings from the global flags
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            ssl: self.ssl,
            timeout: Duration::from_secs(self.timeout_secs),
            retries: self.max_retries,
        }
    }

    /// Migration settings shared by every command
    pub fn migration_config(&self, window_hours: u32, hours_limit: Option<u32>) -> MigrationConfig {
        MigrationConfig::default()
            .with_window_hours(window_hours)
            .with_hours_limit(hours_limit)
            .with_window_pause(Duration::from_millis(self.window_pause_ms))
            .with_state_dir(self.state_dir.clone())
    }

    /// Start the metrics exporter if an address was given.
    ///
    /// A failure to bind is logged; the migration still runs.
    pub fn init_metrics(&self) {
        if let Some(addr) = self.metrics_addr {
            if let Err(e) = metrics::init_metrics(addr) {
                warn!(error = %e, "Failed to start metrics exporter");
            }
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Back up every measurement of a database to line-protocol files
    Backup(BackupArgs),
    /// Copy every measurement of a database into another database
    Copy(CopyArgs),
    /// Show the series recorded as completed for a source/target pair
    Status(StatusArgs),
}

/// Arguments of the backup command
#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Database to back up
    pub database: String,

    /// Directory for backup files
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Window size in hours
    #[arg(long, default_value_t = DEFAULT_WINDOW_HOURS, value_parser = parse_window_hours)]
    pub window_hours: u32,

    /// Stop each series after this many hours
    #[arg(long)]
    pub hours_limit: Option<u32>,
}

/// Arguments of the copy command
#[derive(Args, Debug)]
pub struct CopyArgs {
    /// Source database
    pub from_db: String,

    /// Destination database
    pub to_db: String,

    /// Stop each series after this many hours
    pub hours_limit: Option<u32>,

    /// Retention policy on both sides of the copy
    #[arg(long, default_value = DEFAULT_RETENTION_POLICY)]
    pub retention_policy: String,

    /// Window size in hours
    #[arg(long, default_value_t = DEFAULT_COPY_WINDOW_HOURS, value_parser = parse_window_hours)]
    pub window_hours: u32,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

/// Parse and validate a window size
fn parse_window_hours(s: &str) -> Result<u32, String> {
    let value: u32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number of hours"))?;
    if value == 0 {
        return Err("window size must be at least 1 hour".to_string());
    }
    Ok(value)
}

/// Print a run summary in the requested format
pub(crate) fn print_summary(
    format: OutputFormat,
    operation: &str,
    target: &str,
    summary: &RunSummary,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "operation": operation,
                "target": target,
                "summary": summary,
            });
            let text = serde_json::to_string(&output)
                .map_err(|e| CliError::InvalidArgument(format!("Failed to render summary: {e}")))?;
            println!("{text}");
        }
        OutputFormat::Human => {
            println!("\n{operation} finished: {target}");
            println!("Series listed: {}", summary.series_total);
            println!("Series completed: {}", summary.completed);
            println!("Series already done: {}", summary.skipped);
            if summary.incomplete > 0 {
                println!("Series left for next run: {}", summary.incomplete);
            }
            println!("Windows transferred: {}", summary.windows_transferred);
            println!("Rows transferred: {}", summary.rows_transferred);
            if summary.windows_failed > 0 {
                println!("Windows failed: {}", summary.windows_failed);
            }
        }
    }
    Ok(())
}

async fn run_migration(
    cli: &Cli,
    database: &str,
    config: MigrationConfig,
    strategy: &mut dyn TransferStrategy,
) -> Result<RunSummary, CliError> {
    cli.init_metrics();
    let store = InfluxHttpClient::new(cli.store_config(), database)?;
    let engine = MigrationEngine::new(Arc::new(store), database, config);
    Ok(engine.run(strategy).await?)
}

impl BackupArgs {
    /// Execute the backup command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        info!(
            database = %self.database,
            output_dir = %self.output_dir.display(),
            window_hours = self.window_hours,
            "Starting backup"
        );

        let config = cli.migration_config(self.window_hours, self.hours_limit);
        let mut strategy = FileBackupStrategy::new(&self.database, &self.output_dir);
        let summary = run_migration(cli, &self.database, config, &mut strategy).await?;

        print_summary(
            cli.output_format,
            "Backup",
            &self.output_dir.display().to_string(),
            &summary,
        )
    }
}

impl CopyArgs {
    /// Execute the copy command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        if self.from_db == self.to_db {
            return Err(CliError::InvalidArgument(
                "source and destination databases must differ".to_string(),
            ));
        }

        info!(
            from = %self.from_db,
            to = %self.to_db,
            retention_policy = %self.retention_policy,
            window_hours = self.window_hours,
            "Starting copy"
        );

        let config = cli.migration_config(self.window_hours, self.hours_limit);
        let mut strategy =
            RemoteCopyStrategy::new(&self.from_db, &self.to_db, &self.retention_policy);
        let summary = run_migration(cli, &self.from_db, config, &mut strategy).await?;

        print_summary(cli.output_format, "Copy", &self.to_db, &summary)
    }
}
