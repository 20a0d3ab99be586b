//! Windowed migration engine
//!
//! The engine walks every series of a source database backwards from its
//! latest point in fixed-size windows and hands each non-empty window to a
//! [`TransferStrategy`]. A series is checkpointed only once it is fully
//! drained, so an interrupted run replays at most the windows of the one
//! in-flight series.
//!
//! # Quick Start
//!
//! ```no_run
//! use influx_migrate::migrator::{MigrationConfig, MigrationEngine, RemoteCopyStrategy};
//! use influx_migrate::store::{InfluxHttpClient, StoreConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InfluxHttpClient::new(StoreConfig::default(), "telegraf")?;
//! let config = MigrationConfig::default()
//!     .with_window_hours(48)
//!     .with_hours_limit(Some(24 * 30));
//! let engine = MigrationEngine::new(Arc::new(store), "telegraf", config);
//!
//! let mut copy = RemoteCopyStrategy::new("telegraf", "archive", "autogen");
//! let summary = engine.run(&mut copy).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - [`config`] - defaults, [`MigrationConfig`] and backoff calculation
//! - [`window`] - backward window iteration with an optional hours budget
//! - [`strategy`] - file backup and server-side copy transfers
//! - [`engine`] - the per-series loop and checkpointing
//!
//! # Error Handling
//!
//! Only setup failures abort a run: listing series and loading or saving
//! checkpoints. Everything that goes wrong inside a series is logged and
//! degrades that series instead:
//! - latest-timestamp failures mark the series exhausted
//! - existence-probe failures stop the series without checkpointing it
//! - transfer failures drop the window and the walk continues

pub mod config;
pub mod engine;
pub mod strategy;
pub mod window;

pub use config::MigrationConfig;
pub use engine::{MigrationEngine, RunSummary, WindowProbe};
pub use strategy::{
    backup_target_label, copy_target_label, FileBackupStrategy, RemoteCopyStrategy,
    TransferStrategy, WindowReport,
};
pub use window::WindowWalker;

use crate::output::OutputError;
use crate::resume::ResumeError;
use crate::store::StoreError;

/// Errors that abort a migration run
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Store error during setup
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Checkpoint could not be loaded or saved
    #[error("resume error: {0}")]
    Resume(#[from] ResumeError),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors of a single window or series transfer
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Fetch or copy failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Backup file could not be written
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// A window was handed over before its series was started
    #[error("series not started: {0}")]
    SeriesNotStarted(String),
}
