//! CLI command for inspecting checkpoint progress

use crate::migrator::config::DEFAULT_RETENTION_POLICY;
use crate::migrator::{backup_target_label, copy_target_label};
use crate::resume::{CheckpointStore, ProgressKey};
use crate::store::CopyDestination;
use clap::{ArgGroup, Args};
use serde_json::json;
use std::path::PathBuf;

use super::migrate::{Cli, OutputFormat};
use super::CliError;

/// Status subcommand
#[derive(Debug, Args)]
#[command(group(ArgGroup::new("target").required(true).args(["output_dir", "to_db"])))]
pub struct StatusArgs {
    /// Source database
    #[arg(long)]
    pub source: String,

    /// Backup directory the source was backed up into
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Database the source was copied into
    #[arg(long)]
    pub to_db: Option<String>,

    /// Retention policy of the copy
    #[arg(long, default_value = DEFAULT_RETENTION_POLICY, requires = "to_db")]
    pub retention_policy: String,
}

impl StatusArgs {
    /// Checkpoint target label the matching backup or copy run uses
    pub fn target_label(&self) -> String {
        match (&self.output_dir, &self.to_db) {
            (Some(dir), _) => backup_target_label(dir),
            (None, Some(db)) => copy_target_label(&CopyDestination::new(
                db.as_str(),
                self.retention_policy.as_str(),
            )),
            (None, None) => backup_target_label(&PathBuf::from(".")),
        }
    }

    /// Print the completed series recorded for the pair.
    ///
    /// Reads the checkpoint file only; the store is never contacted.
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let store = CheckpointStore::new(cli.state_dir.clone());
        let key = ProgressKey::new(self.source.as_str(), self.target_label());
        let completed = store.load_or_default(&key)?;

        match cli.output_format {
            OutputFormat::Json => {
                let series: Vec<&str> = completed.iter().collect();
                let output = json!({
                    "source": key.source(),
                    "target": key.target(),
                    "checkpoint": store.path_for(&key).display().to_string(),
                    "completed": series,
                });
                println!("{output}");
            }
            OutputFormat::Human => {
                println!("Checkpoint: {}", store.path_for(&key).display());
                println!("Completed series: {}", completed.len());
                for series in completed.iter() {
                    println!("  {series}");
                }
            }
        }
        Ok(())
    }
}
