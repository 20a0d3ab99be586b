//! InfluxDB `/query` response parsing
//!
//! Response layout:
//!
//! ```json
//! {"results": [{"statement_id": 0, "series": [
//!     {"name": "cpu", "tags": {"host": "a"}, "columns": ["time", "value"], "values": [[0, 1.5]]}
//! ]}]}
//! ```
//!
//! Statement failures arrive as an `error` member on the result, request
//! failures as a top-level `error`.

use super::{StoreError, StoreResult};
use crate::protocol::{parse_datetime, TimestampValue};
use crate::{FieldValue, Record};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

// Top-level body of a `/query` response
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    error: Option<String>,
}

/// Result of one statement
#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<ResultSeries>,
    #[serde(default)]
    error: Option<String>,
}

/// One result series: a tag set with a table of rows
#[derive(Debug, Clone, Deserialize)]
pub struct ResultSeries {
    /// Measurement name (or `result` for `SELECT ... INTO`)
    #[serde(default)]
    pub name: Option<String>,
    /// Tag set of this group (`GROUP BY` queries only)
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Column names
    #[serde(default)]
    pub columns: Vec<String>,
    /// Rows, aligned with `columns`
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl ResultSeries {
    fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Parse a response body and unwrap the first statement's series.
///
/// Any error reported in the body becomes [`StoreError::QueryError`].
pub fn parse_series(body: &str, query: &str) -> StoreResult<Vec<ResultSeries>> {
    let response: QueryResponse =
        serde_json::from_str(body).map_err(|e| StoreError::ParseError(e.to_string()))?;

    if let Some(message) = response.error {
        return Err(StoreError::QueryError {
            query: query.to_string(),
            message,
        });
    }

    let Some(statement) = response.results.into_iter().next() else {
        return Ok(Vec::new());
    };

    if let Some(message) = statement.error {
        return Err(StoreError::QueryError {
            query: query.to_string(),
            message,
        });
    }

    Ok(statement.series)
}

/// Names from a `SHOW MEASUREMENTS` result
pub fn measurement_names(series: &[ResultSeries]) -> Vec<String> {
    series
        .iter()
        .flat_map(|s| {
            let idx = s.column("name").unwrap_or(0);
            s.values
                .iter()
                .filter_map(move |row| row.get(idx).and_then(Value::as_str).map(str::to_string))
        })
        .collect()
}

/// Timestamp of the first row, if any.
///
/// Accepts RFC 3339 text or an integer nanosecond epoch.
pub fn first_timestamp(series: &[ResultSeries]) -> StoreResult<Option<DateTime<Utc>>> {
    let Some(first) = series.first() else {
        return Ok(None);
    };
    let idx = first
        .column(crate::protocol::TIME_KEY)
        .ok_or_else(|| StoreError::InvalidResponse("result has no time column".to_string()))?;
    let Some(raw) = first.values.first().and_then(|row| row.get(idx)) else {
        return Ok(None);
    };

    match TimestampValue::try_from(raw).map_err(|e| StoreError::InvalidResponse(e.to_string()))? {
        TimestampValue::Integer(nanos) => Ok(Some(Utc.timestamp_nanos(nanos))),
        TimestampValue::Text(text) => parse_datetime(&text)
            .map(Some)
            .map_err(|e| StoreError::InvalidResponse(e.to_string())),
        TimestampValue::DateTime(dt) => Ok(Some(dt.with_timezone(&Utc))),
        TimestampValue::Naive(naive) => Ok(Some(naive.and_utc())),
    }
}

/// Row count from a `SELECT COUNT(*)` result.
///
/// `COUNT(*)` yields one `count_<field>` column per field; the row count is
/// the largest of them. An empty result means zero rows.
pub fn max_count(series: &[ResultSeries]) -> u64 {
    series
        .iter()
        .flat_map(|s| {
            s.columns
                .iter()
                .enumerate()
                .filter(|(_, c)| c.starts_with("count"))
                .flat_map(move |(idx, _)| s.values.iter().filter_map(move |row| row.get(idx)))
        })
        .filter_map(Value::as_u64)
        .max()
        .unwrap_or(0)
}

/// Points written by a `SELECT ... INTO` statement
pub fn written_count(series: &[ResultSeries]) -> u64 {
    series
        .iter()
        .filter_map(|s| {
            let idx = s.column("written")?;
            Some(
                s.values
                    .iter()
                    .filter_map(|row| row.get(idx).and_then(Value::as_u64))
                    .sum::<u64>(),
            )
        })
        .sum()
}

/// Convert a JSON cell into a field value. `null` means the field is absent.
pub fn field_value(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(FieldValue::Boolean(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(FieldValue::Integer(i)),
            None => n.as_f64().map(FieldValue::Float),
        },
        Value::String(s) => Some(FieldValue::String(s.clone())),
        Value::Array(_) | Value::Object(_) => Some(FieldValue::String(value.to_string())),
    }
}

/// Rows of every result series as records, carrying each series' tag set
pub fn records(series: Vec<ResultSeries>) -> Vec<Record> {
    let mut out = Vec::new();
    for s in series {
        for row in &s.values {
            let fields = s
                .columns
                .iter()
                .zip(row.iter())
                .filter_map(|(column, cell)| field_value(cell).map(|v| (column.clone(), v)))
                .collect();
            out.push(Record {
                tags: s.tags.clone(),
                fields,
            });
        }
    }
    out
}
