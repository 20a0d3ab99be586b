//! Per-series line-protocol backup files
//!
//! One file per (database, series, latest timestamp):
//! `influxdb_<db>_<series>_<%Y-%m-%dT%H:%M:%SZ>.backup`. The file is truncated
//! when the series begins and appended to once per window.

use super::{OutputError, OutputResult};
use crate::resume::progress::escape_component;
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// Deterministic backup file name for a series.
///
/// Database and series names are percent-escaped (including `_`), so two
/// distinct series never share a file and no name contains a separator.
pub fn backup_file_name(database: &str, series: &str, latest: DateTime<Utc>) -> String {
    format!(
        "influxdb_{}_{}_{}.backup",
        escape_component(database),
        escape_component(series),
        latest.format("%Y-%m-%dT%H:%M:%SZ")
    )
}

/// Append-only backup file for one series
#[derive(Debug)]
pub struct BackupFile {
    path: PathBuf,
    lines_written: u64,
}

impl BackupFile {
    /// Create (or truncate) the backup file for `series` under `dir`
    pub fn create<P: AsRef<Path>>(
        dir: P,
        database: &str,
        series: &str,
        latest: DateTime<Utc>,
    ) -> OutputResult<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|e| OutputError::IoError(format!("Failed to create directory: {}", e)))?;

        let path = dir.join(backup_file_name(database, series, latest));
        File::create(&path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {}", e)))?;

        info!(path = %path.display(), "Created backup file");

        Ok(Self {
            path,
            lines_written: 0,
        })
    }

    /// Path of the backup file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines appended so far
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Append `lines`, each terminated by a newline, and sync to disk.
    ///
    /// Either every line lands or the file is cut back to its previous
    /// length.
    pub fn append_lines(&mut self, lines: &[String]) -> OutputResult<()> {
        self.append_through(lines, |file| file)
    }

    fn append_through<W, F>(&mut self, lines: &[String], wrap: F) -> OutputResult<()>
    where
        W: Write,
        F: FnOnce(File) -> W,
    {
        if lines.is_empty() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| OutputError::IoError(format!("Failed to open file: {}", e)))?;
        let start_len = file
            .metadata()
            .map_err(|e| OutputError::IoError(format!("Failed to stat file: {}", e)))?
            .len();
        let handle = file
            .try_clone()
            .map_err(|e| OutputError::IoError(format!("Failed to clone file handle: {}", e)))?;

        let result = write_lines(wrap(file), lines).and_then(|_| {
            handle
                .sync_all()
                .map_err(|e| OutputError::IoError(format!("Failed to sync file: {}", e)))
        });
        if let Err(e) = result {
            self.rollback(&handle, start_len);
            return Err(e);
        }

        self.lines_written += lines.len() as u64;
        debug!(
            path = %self.path.display(),
            lines = lines.len(),
            total = self.lines_written,
            "Appended lines"
        );
        Ok(())
    }

    fn rollback(&self, file: &File, len: u64) {
        if let Err(e) = file.set_len(len).and_then(|_| file.sync_all()) {
            warn!(path = %self.path.display(), error = %e, "Failed to roll back partial window");
        }
    }
}

fn write_lines<W: Write>(inner: W, lines: &[String]) -> OutputResult<()> {
    let mut writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, inner);
    for line in lines {
        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .map_err(|e| OutputError::IoError(format!("Failed to write line: {}", e)))?;
    }
    writer
        .flush()
        .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
}
