//! Migration metrics
//!
//! Counters for windows, rows and failures, recorded through the `metrics`
//! facade. Without an installed recorder every call is a no-op; with
//! `--metrics-addr` a Prometheus scrape endpoint serves them.

use metrics::{counter, describe_counter, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Mutex;
use tracing::{debug, info};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(false));

/// Initialize the Prometheus exporter.
///
/// Idempotent: a second call is a no-op.
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED
        .lock()
        .map_err(|_| "metrics initialization lock poisoned")?;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "windows_transferred_total",
        Unit::Count,
        "Windows transferred to the backup target"
    );
    describe_counter!(
        "windows_failed_total",
        Unit::Count,
        "Windows whose transfer failed and whose payload was dropped"
    );
    describe_counter!(
        "rows_transferred_total",
        Unit::Count,
        "Rows written to a backup file or copied to a destination"
    );
    describe_counter!(
        "series_completed_total",
        Unit::Count,
        "Series fully drained and checkpointed"
    );
    describe_counter!(
        "window_probe_failures_total",
        Unit::Count,
        "Window existence probes that failed"
    );

    *initialized = true;
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

/// Check if the exporter is installed
pub fn is_initialized() -> bool {
    METRICS_INITIALIZED.lock().map(|g| *g).unwrap_or(false)
}

/// Record a transferred window and its rows
pub fn record_window_transferred(target: &str, rows: u64) {
    counter!("windows_transferred_total", "target" => target.to_string()).increment(1);
    counter!("rows_transferred_total", "target" => target.to_string()).increment(rows);
}

/// Record a window whose transfer failed
pub fn record_window_failed(target: &str) {
    counter!("windows_failed_total", "target" => target.to_string()).increment(1);
}

/// Record a checkpointed series
pub fn record_series_completed(target: &str) {
    counter!("series_completed_total", "target" => target.to_string()).increment(1);
}

/// Record a failed existence probe
pub fn record_probe_failure(series: &str) {
    counter!("window_probe_failures_total", "series" => series.to_string()).increment(1);
}
