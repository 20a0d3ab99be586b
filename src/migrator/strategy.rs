//! Transfer strategies
//!
//! A strategy moves one window of one series to its target. The engine
//! brackets the windows of a series with [`TransferStrategy::begin_series`]
//! and [`TransferStrategy::finish_series`].

use super::TransferError;
use crate::output::BackupFile;
use crate::resume::progress::escape_component;
use crate::store::{CopyDestination, SeriesStore};
use crate::TimeWindow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of one transferred window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowReport {
    /// Rows written or copied
    pub rows: u64,
}

/// Checkpoint target for file backups into `output_dir`: `backup:<dir>`.
///
/// The directory is made absolute (without resolving symlinks) so the same
/// directory named relatively or absolutely resumes the same progress.
pub fn backup_target_label(output_dir: &Path) -> String {
    let dir = std::path::absolute(output_dir).unwrap_or_else(|_| output_dir.to_path_buf());
    format!("backup:{}", dir.display())
}

/// Checkpoint target for server-side copies: `copy:<db>:<rp>`
pub fn copy_target_label(destination: &CopyDestination) -> String {
    format!(
        "copy:{}:{}",
        escape_component(&destination.database),
        escape_component(&destination.retention_policy)
    )
}

/// Moves windows of a series to a target
#[async_trait]
pub trait TransferStrategy: Send {
    /// Identity of the target, the second half of the checkpoint key.
    ///
    /// Distinct targets must return distinct labels.
    fn target_label(&self) -> String;

    /// Prepare for a series whose newest point is `latest`
    async fn begin_series(
        &mut self,
        series: &str,
        latest: DateTime<Utc>,
    ) -> Result<(), TransferError>;

    /// Transfer the rows of `series` inside `window`
    async fn transfer_window(
        &mut self,
        store: &dyn SeriesStore,
        series: &str,
        window: &TimeWindow,
    ) -> Result<WindowReport, TransferError>;

    /// Called after the last window of a series
    async fn finish_series(&mut self, series: &str) -> Result<(), TransferError>;
}

/// Appends every window as line protocol to a per-series backup file
pub struct FileBackupStrategy {
    database: String,
    output_dir: PathBuf,
    current: Option<BackupFile>,
}

impl FileBackupStrategy {
    /// Back up `database` into files under `output_dir`
    pub fn new(database: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            output_dir: output_dir.into(),
            current: None,
        }
    }

    /// Backup file of the series in progress
    pub fn current_file(&self) -> Option<&BackupFile> {
        self.current.as_ref()
    }
}

#[async_trait]
impl TransferStrategy for FileBackupStrategy {
    fn target_label(&self) -> String {
        backup_target_label(&self.output_dir)
    }

    async fn begin_series(
        &mut self,
        series: &str,
        latest: DateTime<Utc>,
    ) -> Result<(), TransferError> {
        self.current = Some(BackupFile::create(
            &self.output_dir,
            &self.database,
            series,
            latest,
        )?);
        Ok(())
    }

    async fn transfer_window(
        &mut self,
        store: &dyn SeriesStore,
        series: &str,
        window: &TimeWindow,
    ) -> Result<WindowReport, TransferError> {
        let file = self
            .current
            .as_mut()
            .ok_or_else(|| TransferError::SeriesNotStarted(series.to_string()))?;

        info!(window = %window, "Backing up window");
        let records = store.fetch_in_range(series, window).await?;

        let mut lines = Vec::with_capacity(records.len());
        for record in &records {
            match record.to_line(series) {
                Ok(line) => lines.push(line),
                Err(e) => warn!(error = %e, tags = ?record.tags, "Skipping record"),
            }
        }

        info!(lines = lines.len(), path = %file.path().display(), "Writing lines");
        file.append_lines(&lines)?;

        Ok(WindowReport {
            rows: lines.len() as u64,
        })
    }

    async fn finish_series(&mut self, _series: &str) -> Result<(), TransferError> {
        if let Some(file) = self.current.take() {
            info!(
                path = %file.path().display(),
                lines = file.lines_written(),
                "Backup file complete"
            );
        }
        Ok(())
    }
}

/// Copies every window server-side with `SELECT ... INTO`
pub struct RemoteCopyStrategy {
    source_database: String,
    destination: CopyDestination,
}

impl RemoteCopyStrategy {
    /// Copy from `source_database` into `destination_database`, both under
    /// `retention_policy`
    pub fn new(
        source_database: impl Into<String>,
        destination_database: impl Into<String>,
        retention_policy: impl Into<String>,
    ) -> Self {
        Self {
            source_database: source_database.into(),
            destination: CopyDestination::new(destination_database, retention_policy),
        }
    }

    /// Where rows are copied to
    pub fn destination(&self) -> &CopyDestination {
        &self.destination
    }
}

#[async_trait]
impl TransferStrategy for RemoteCopyStrategy {
    fn target_label(&self) -> String {
        copy_target_label(&self.destination)
    }

    async fn begin_series(
        &mut self,
        _series: &str,
        _latest: DateTime<Utc>,
    ) -> Result<(), TransferError> {
        Ok(())
    }

    async fn transfer_window(
        &mut self,
        store: &dyn SeriesStore,
        series: &str,
        window: &TimeWindow,
    ) -> Result<WindowReport, TransferError> {
        info!(
            window = %window,
            from = %self.source_database,
            to = %self.destination.database,
            "Moving data"
        );
        let rows = store.copy_in_range(series, window, &self.destination).await?;
        Ok(WindowReport { rows })
    }

    async fn finish_series(&mut self, _series: &str) -> Result<(), TransferError> {
        Ok(())
    }
}
