//! Migration configuration constants

use std::path::PathBuf;
use std::time::Duration;

/// Default window size in hours for file backups.
pub const DEFAULT_WINDOW_HOURS: u32 = 6;

/// Default window size in hours for server-side copies.
/// Copies never leave the server, so larger windows are cheap.
pub const DEFAULT_COPY_WINDOW_HOURS: u32 = 48;

/// Pause between consecutive windows, bounding load on the source store.
pub const DEFAULT_WINDOW_PAUSE: Duration = Duration::from_millis(1000);

/// Retention policy used by server-side copies when none is given.
pub const DEFAULT_RETENTION_POLICY: &str = "autogen";

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1000; // 1 second

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30000; // 30 seconds

/// Calculate exponential backoff delay
pub fn calculate_backoff(retry_count: u32) -> Duration {
    let factor = 2u64.checked_pow(retry_count).unwrap_or(u64::MAX);
    let delay_ms = INITIAL_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS);
    Duration::from_millis(delay_ms)
}

/// Settings of one migration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Length of each window in hours
    pub window_hours: u32,
    /// Stop walking a series once this many hours have been consumed
    pub hours_limit: Option<u32>,
    /// Pause between windows (zero disables it)
    pub window_pause: Duration,
    /// Directory holding checkpoint artifacts
    pub state_dir: PathBuf,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            window_hours: DEFAULT_WINDOW_HOURS,
            hours_limit: None,
            window_pause: DEFAULT_WINDOW_PAUSE,
            state_dir: PathBuf::from("."),
        }
    }
}

impl MigrationConfig {
    /// Set the window size in hours
    pub fn with_window_hours(mut self, hours: u32) -> Self {
        self.window_hours = hours;
        self
    }

    /// Set the total hours budget per series
    pub fn with_hours_limit(mut self, limit: Option<u32>) -> Self {
        self.hours_limit = limit;
        self
    }

    /// Set the pause between windows
    pub fn with_window_pause(mut self, pause: Duration) -> Self {
        self.window_pause = pause;
        self
    }

    /// Set the checkpoint directory
    pub fn with_state_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.state_dir = dir.into();
        self
    }

    /// Reject settings that cannot make progress
    pub fn validate(&self) -> Result<(), String> {
        if self.window_hours == 0 {
            return Err("window size must be at least one hour".to_string());
        }
        Ok(())
    }
}
