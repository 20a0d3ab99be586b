//! InfluxQL statement builders

use super::CopyDestination;
use crate::TimeWindow;

/// Double-quote an identifier, escaping backslash, quote and newline
pub fn quote_ident(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

/// Single-quote a literal, escaping backslash and quote
pub fn quote_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            other => quoted.push(other),
        }
    }
    quoted.push('\'');
    quoted
}

fn time_predicate(window: &TimeWindow) -> String {
    format!(
        "time > {} AND time < {}",
        quote_literal(&window.start_literal()),
        quote_literal(&window.end_literal())
    )
}

/// List every measurement of the current database
pub fn show_measurements() -> String {
    "SHOW MEASUREMENTS".to_string()
}

/// Newest point of `series`
pub fn latest_point(series: &str) -> String {
    format!("SELECT * FROM {} ORDER BY time DESC LIMIT 1", quote_ident(series))
}

/// Per-field row counts of `series` inside `window`
pub fn count_in_range(series: &str, window: &TimeWindow) -> String {
    format!(
        "SELECT COUNT(*) FROM {} WHERE {}",
        quote_ident(series),
        time_predicate(window)
    )
}

/// Every row of `series` inside `window`, grouped by tag set
pub fn select_in_range(series: &str, window: &TimeWindow) -> String {
    format!(
        "SELECT * FROM {} WHERE {} GROUP BY *",
        quote_ident(series),
        time_predicate(window)
    )
}

/// Server-side copy of `series` inside `window` from `source_db` into `destination`
pub fn copy_in_range(
    source_db: &str,
    series: &str,
    window: &TimeWindow,
    destination: &CopyDestination,
) -> String {
    let rp = quote_ident(&destination.retention_policy);
    let measurement = quote_ident(series);
    format!(
        "SELECT * INTO {}.{rp}.{measurement} FROM {}.{rp}.{measurement} WHERE {} GROUP BY *",
        quote_ident(&destination.database),
        quote_ident(source_db),
        time_predicate(window)
    )
}
