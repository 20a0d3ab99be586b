//! Line-protocol encoding
//!
//! Renders one [`Record`] as a single point line:
//!
//! ```text
//! <series>[,<tag>=<value>...] <field>=<value>[,...] <timestamp>
//! ```
//!
//! Tags and fields are emitted in ascending key order, the `time` field
//! becomes the trailing nanosecond timestamp.

use crate::{FieldValue, Record};
use std::collections::BTreeMap;

pub mod timestamp;

pub use timestamp::{convert_timestamp, parse_datetime, Precision, TimestampError, TimestampValue};

/// Field key that carries the point timestamp
pub const TIME_KEY: &str = "time";

/// Encoding errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EncodeError {
    /// The field mapping has no `time` entry
    #[error("record has no 'time' field")]
    MissingTime,

    /// The `time` entry could not be normalized
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] TimestampError),
}

/// Escape a series name, tag key, tag value or field key.
///
/// Backslash, space, comma, equals and newline are each escaped with a
/// backslash in a single pass, so escapes introduced for one character are
/// never escaped again.
pub fn escape_key(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ' ' => escaped.push_str("\\ "),
            ',' => escaped.push_str("\\,"),
            '=' => escaped.push_str("\\="),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Double-quote a string field value, escaping backslash, quote and newline
pub fn quote_string(raw: &str) -> String {
    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push('"');
    for c in raw.chars() {
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

/// Encode a field value by type.
///
/// Non-finite floats have no line-protocol form and encode to an empty
/// string, which drops the field.
pub fn encode_value(value: &FieldValue) -> String {
    match value {
        FieldValue::String(s) => quote_string(s),
        FieldValue::Boolean(b) => b.to_string(),
        FieldValue::Integer(i) => format!("{i}i"),
        FieldValue::Float(f) if f.is_finite() => f.to_string(),
        FieldValue::Float(_) => String::new(),
    }
}

/// Encode one point from its parts.
///
/// `fields` must contain [`TIME_KEY`]; it supplies the trailing timestamp and
/// is never written as a regular field.
pub fn encode_line(
    series: &str,
    tags: &BTreeMap<String, String>,
    fields: &BTreeMap<String, FieldValue>,
) -> Result<String, EncodeError> {
    let time = fields.get(TIME_KEY).ok_or(EncodeError::MissingTime)?;
    let timestamp = convert_timestamp(&TimestampValue::try_from(time)?, Precision::Nanoseconds)?;

    let mut line = escape_key(series);

    let tag_list: Vec<String> = tags
        .iter()
        .map(|(k, v)| (escape_key(k), escape_key(v)))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    if !tag_list.is_empty() {
        line.push(',');
        line.push_str(&tag_list.join(","));
    }

    let field_list: Vec<String> = fields
        .iter()
        .filter(|(k, _)| k.as_str() != TIME_KEY)
        .map(|(k, v)| (escape_key(k), encode_value(v)))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    if !field_list.is_empty() {
        line.push(' ');
        line.push_str(&field_list.join(","));
    }

    line.push(' ');
    line.push_str(&timestamp.to_string());
    Ok(line)
}

impl Record {
    /// Encode this record as a point of `series`
    pub fn to_line(&self, series: &str) -> Result<String, EncodeError> {
        encode_line(series, &self.tags, &self.fields)
    }
}
