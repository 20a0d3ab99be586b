//! Store connection configuration

use std::time::Duration;

/// Default InfluxDB HTTP port
pub const DEFAULT_PORT: u16 = 8086;

/// Default per-request timeout.
/// Large `SELECT ... INTO` windows can take a while server-side.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of retries after a failed request
pub const DEFAULT_RETRIES: u32 = 3;

/// Connection settings for an InfluxDB server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Server host name
    pub host: String,
    /// Server HTTP port
    pub port: u16,
    /// Username for basic auth
    pub username: Option<String>,
    /// Password for basic auth
    pub password: Option<String>,
    /// Use HTTPS
    pub ssl: bool,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries after the first failed attempt
    pub retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            ssl: false,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
        }
    }
}

impl StoreConfig {
    /// Base URL of the HTTP API
    pub fn base_url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}
