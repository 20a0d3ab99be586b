//! # InfluxDB Migration Library
//!
//! Resumable export and relocation of InfluxDB measurements. Each measurement
//! ("series") is walked backwards from its latest point in fixed-size time
//! windows, and every window is either appended to a line-protocol backup file
//! or copied server-side into another database.
//!
//! ## Features
//!
//! - **Line Protocol**: canonical, escape-safe encoding of typed records
//! - **Timestamp Normalization**: integer epochs, ISO-8601 strings and native
//!   date-times collapse to one nanosecond epoch
//! - **Resume Capability**: completed series are checkpointed per
//!   source/target pair, so an interrupted run picks up where it stopped
//! - **Pluggable Transfers**: file backup or server-side `SELECT ... INTO` copy
//!
//! ## Quick Start
//!
//! ```no_run
//! use influx_migrate::migrator::{FileBackupStrategy, MigrationConfig, MigrationEngine};
//! use influx_migrate::store::{InfluxHttpClient, StoreConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InfluxHttpClient::new(StoreConfig::default(), "telegraf")?;
//! let engine = MigrationEngine::new(Arc::new(store), "telegraf", MigrationConfig::default());
//!
//! let mut backup = FileBackupStrategy::new("telegraf", "./backups");
//! let summary = engine.run(&mut backup).await?;
//! println!("{} series completed", summary.completed);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`protocol`] - line-protocol encoder and timestamp normalizer
//! - [`store`] - the store transport seam and its InfluxDB HTTP implementation
//! - [`migrator`] - the windowed migration engine and transfer strategies
//! - [`resume`] - durable checkpoint sets of completed series
//! - [`output`] - backup file writer
//! - [`metrics`] - Prometheus counters for windows, rows and series
//! - [`cli`] - command line surface

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// CLI command implementations
pub mod cli;

/// Observability counters
pub mod metrics;

/// Windowed migration engine
pub mod migrator;

/// Backup file writers
pub mod output;

/// Line-protocol encoding and timestamp normalization
pub mod protocol;

/// Resume capability for migration runs
pub mod resume;

/// Time-series store transport
pub mod store;

/// Typed value of a single field in a [`Record`]
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// UTF-8 string value
    String(String),
    /// Signed 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

/// One row of a series: tag set plus typed fields.
///
/// The point's timestamp travels as the `time` field, exactly as the store
/// returns it; the encoder lifts it out into the trailing timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// Tag keys to tag values
    pub tags: BTreeMap<String, String>,
    /// Field keys to typed values, including `time`
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag, replacing any previous value for the key
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add a field, replacing any previous value for the key
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Raw value of the `time` field, if present
    pub fn time(&self) -> Option<&FieldValue> {
        self.fields.get(protocol::TIME_KEY)
    }
}

/// A window of wall-clock time processed as one migration unit.
///
/// Both bounds are exclusive when queried (`time > start AND time < end`).
/// Consecutive windows share a boundary instant, so a point landing exactly
/// on a boundary is transferred by neither neighbour. The first window of a
/// series ends on the series' latest timestamp, which therefore excludes that
/// latest point as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Lower bound (exclusive)
    pub start: DateTime<Utc>,
    /// Upper bound (exclusive)
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window from explicit bounds
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The window of `hours` hours that ends at `end`.
    ///
    /// Returns `None` when the start would fall outside the representable range.
    pub fn ending_at(end: DateTime<Utc>, hours: u32) -> Option<Self> {
        let start = end.checked_sub_signed(Duration::hours(i64::from(hours)))?;
        Some(Self { start, end })
    }

    /// Lower bound rendered as an RFC 3339 UTC literal
    pub fn start_literal(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    /// Upper bound rendered as an RFC 3339 UTC literal
    pub fn end_literal(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.start_literal(), self.end_literal())
    }
}
