//! Timestamp normalization to integer epoch values
//!
//! Accepts the three shapes a point timestamp can arrive in (integer epoch,
//! ISO-8601 text, native date-time) and produces an integer count since the
//! Unix epoch at the requested precision.

use crate::FieldValue;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use std::fmt;
use std::str::FromStr;

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MICRO: i64 = 1_000;

/// Offset-aware layouts tried after strict RFC 3339
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

/// Naive layouts; the parsed value is taken to be UTC
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Timestamp normalization errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TimestampError {
    /// Value has a type that cannot carry a timestamp
    #[error("unsupported timestamp value: {0}")]
    UnsupportedType(String),

    /// Text could not be parsed as a calendar date-time
    #[error("unparseable timestamp: {0}")]
    Unparseable(String),

    /// Value lies outside the range of a signed 64-bit nanosecond epoch
    #[error("timestamp out of range: {0}")]
    OutOfRange(String),

    /// Unknown precision specifier
    #[error("invalid precision: {0}. Valid options: n, u, ms, s, m, h")]
    InvalidPrecision(String),
}

/// A timestamp in any of the accepted input shapes
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampValue {
    /// Integer epoch, trusted to already be at the target precision
    Integer(i64),
    /// ISO-8601 text
    Text(String),
    /// Offset-aware date-time
    DateTime(DateTime<FixedOffset>),
    /// Date-time without offset, assumed UTC
    Naive(NaiveDateTime),
}

impl TryFrom<&FieldValue> for TimestampValue {
    type Error = TimestampError;

    fn try_from(value: &FieldValue) -> Result<Self, Self::Error> {
        match value {
            FieldValue::Integer(i) => Ok(TimestampValue::Integer(*i)),
            FieldValue::String(s) => Ok(TimestampValue::Text(s.clone())),
            FieldValue::Float(f) => Err(TimestampError::UnsupportedType(format!("float {f}"))),
            FieldValue::Boolean(b) => Err(TimestampError::UnsupportedType(format!("boolean {b}"))),
        }
    }
}

impl TryFrom<&serde_json::Value> for TimestampValue {
    type Error = TimestampError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(TimestampValue::Integer)
                .ok_or_else(|| TimestampError::UnsupportedType(n.to_string())),
            serde_json::Value::String(s) => Ok(TimestampValue::Text(s.clone())),
            other => Err(TimestampError::UnsupportedType(other.to_string())),
        }
    }
}

impl From<DateTime<Utc>> for TimestampValue {
    fn from(value: DateTime<Utc>) -> Self {
        TimestampValue::DateTime(value.fixed_offset())
    }
}

/// Output precision for [`convert_timestamp`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// Nanoseconds (`n`)
    #[default]
    Nanoseconds,
    /// Microseconds (`u`)
    Microseconds,
    /// Milliseconds (`ms`)
    Milliseconds,
    /// Seconds (`s`)
    Seconds,
    /// Minutes (`m`)
    Minutes,
    /// Hours (`h`)
    Hours,
}

impl Precision {
    /// Number of nanoseconds in one unit of this precision
    pub fn nanos_per_unit(self) -> i64 {
        match self {
            Precision::Nanoseconds => 1,
            Precision::Microseconds => 1_000,
            Precision::Milliseconds => 1_000_000,
            Precision::Seconds => NANOS_PER_SECOND,
            Precision::Minutes => 60 * NANOS_PER_SECOND,
            Precision::Hours => 3_600 * NANOS_PER_SECOND,
        }
    }
}

impl FromStr for Precision {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "n" | "ns" => Ok(Precision::Nanoseconds),
            "u" | "us" => Ok(Precision::Microseconds),
            "ms" => Ok(Precision::Milliseconds),
            "s" => Ok(Precision::Seconds),
            "m" => Ok(Precision::Minutes),
            "h" => Ok(Precision::Hours),
            other => Err(TimestampError::InvalidPrecision(other.to_string())),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Precision::Nanoseconds => "n",
            Precision::Microseconds => "u",
            Precision::Milliseconds => "ms",
            Precision::Seconds => "s",
            Precision::Minutes => "m",
            Precision::Hours => "h",
        };
        f.write_str(s)
    }
}

/// Parse ISO-8601 text into a UTC date-time.
///
/// Text without an offset is taken to be UTC. A bare `YYYY-MM-DD` date maps
/// to midnight.
pub fn parse_datetime(input: &str) -> Result<DateTime<Utc>, TimestampError> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(input, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    Err(TimestampError::Unparseable(input.to_string()))
}

/// Nanoseconds since the Unix epoch, at microsecond resolution.
///
/// Computed as whole seconds times 1e9 plus microseconds times 1e3; digits
/// below the microsecond are dropped.
pub fn to_nanos(datetime: &DateTime<Utc>) -> Result<i64, TimestampError> {
    let micros = i64::from(datetime.timestamp_subsec_micros());
    datetime
        .timestamp()
        .checked_mul(NANOS_PER_SECOND)
        .and_then(|ns| ns.checked_add(micros * NANOS_PER_MICRO))
        .ok_or_else(|| TimestampError::OutOfRange(datetime.to_rfc3339()))
}

/// Convert a timestamp to an integer epoch at `precision`.
///
/// Integers are returned unchanged: the caller vouches for their precision.
/// Everything else is converted to nanoseconds first, then divided down
/// (truncating) to the requested unit.
pub fn convert_timestamp(value: &TimestampValue, precision: Precision) -> Result<i64, TimestampError> {
    let datetime = match value {
        TimestampValue::Integer(epoch) => return Ok(*epoch),
        TimestampValue::Text(text) => parse_datetime(text)?,
        TimestampValue::DateTime(dt) => dt.with_timezone(&Utc),
        TimestampValue::Naive(naive) => naive.and_utc(),
    };

    let nanos = to_nanos(&datetime)?;
    Ok(nanos / precision.nanos_per_unit())
}
