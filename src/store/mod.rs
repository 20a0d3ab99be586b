//! Time-series store transport
//!
//! The migration engine only ever talks to a store through [`SeriesStore`].
//! [`InfluxHttpClient`] implements it against the InfluxDB 1.x HTTP API.

use crate::{Record, TimeWindow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod config;
pub mod influx_http;
pub mod parser;
pub mod query;

pub use config::StoreConfig;
pub use influx_http::InfluxHttpClient;

/// Store transport errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// HTTP-level failure (non-success status)
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network error (connect, timeout, body read)
    #[error("network error: {0}")]
    NetworkError(String),

    /// Server asked us to slow down
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// The store rejected the statement
    #[error("query failed: {message} (query: {query})")]
    QueryError {
        /// Offending statement
        query: String,
        /// Error reported by the store
        message: String,
    },

    /// Response body parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// Response was well-formed but not what the statement should produce
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Client could not be constructed
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Where a server-side copy writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyDestination {
    /// Destination database
    pub database: String,
    /// Retention policy used on both sides of the copy
    pub retention_policy: String,
}

impl CopyDestination {
    /// Create a destination
    pub fn new(database: impl Into<String>, retention_policy: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            retention_policy: retention_policy.into(),
        }
    }
}

/// Operations the migration engine needs from a source store.
///
/// Range operations use exclusive bounds on both sides of the window.
#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// Name of the source database
    fn database(&self) -> &str;

    /// List all series names, in store order
    async fn list_series(&self) -> StoreResult<Vec<String>>;

    /// Timestamp of the newest point of `series`, `None` if it has no data
    async fn latest_timestamp(&self, series: &str) -> StoreResult<Option<DateTime<Utc>>>;

    /// Number of rows of `series` strictly inside `window`
    async fn count_in_range(&self, series: &str, window: &TimeWindow) -> StoreResult<u64>;

    /// All rows of `series` strictly inside `window`, one record per row with
    /// the row's tag set attached
    async fn fetch_in_range(&self, series: &str, window: &TimeWindow) -> StoreResult<Vec<Record>>;

    /// Copy rows of `series` strictly inside `window` to `destination`
    /// without materializing them locally. Returns the number of points
    /// written.
    async fn copy_in_range(
        &self,
        series: &str,
        window: &TimeWindow,
        destination: &CopyDestination,
    ) -> StoreResult<u64>;
}
