//! Unit tests for timestamp normalization

use chrono::{TimeZone, Utc};
use influx_migrate::protocol::{convert_timestamp, Precision, TimestampError, TimestampValue};
use std::str::FromStr;

fn text(s: &str) -> TimestampValue {
    TimestampValue::Text(s.to_string())
}

#[test]
fn test_epoch_zero_string() {
    let zero = text("1970-01-01T00:00:00Z");
    assert_eq!(convert_timestamp(&zero, Precision::Nanoseconds), Ok(0));
    assert_eq!(convert_timestamp(&zero, Precision::Seconds), Ok(0));
}

#[test]
fn test_one_second_after_epoch() {
    let one = text("1970-01-01T00:00:01Z");
    assert_eq!(
        convert_timestamp(&one, Precision::Nanoseconds),
        Ok(1_000_000_000)
    );
    assert_eq!(convert_timestamp(&one, Precision::Seconds), Ok(1));
}

#[test]
fn test_integer_passes_through_unchanged() {
    let raw = TimestampValue::Integer(1_700_000_000_123_456_789);
    assert_eq!(
        convert_timestamp(&raw, Precision::Nanoseconds),
        Ok(1_700_000_000_123_456_789)
    );
}

#[test]
fn test_native_datetime() {
    let dt = Utc.with_ymd_and_hms(1970, 1, 2, 0, 0, 0).unwrap();
    assert_eq!(
        convert_timestamp(&TimestampValue::from(dt), Precision::Hours),
        Ok(24)
    );
}

#[test]
fn test_offset_and_naive_strings() {
    let offset = text("1970-01-01T01:00:00+01:00");
    let naive = text("1970-01-01 00:00:00");
    assert_eq!(convert_timestamp(&offset, Precision::Seconds), Ok(0));
    assert_eq!(convert_timestamp(&naive, Precision::Seconds), Ok(0));
}

#[test]
fn test_precision_parsing() {
    assert_eq!(Precision::from_str("ms"), Ok(Precision::Milliseconds));
    assert_eq!(Precision::from_str("u"), Ok(Precision::Microseconds));
    assert_eq!(Precision::from_str("m"), Ok(Precision::Minutes));
    assert!(matches!(
        Precision::from_str("d"),
        Err(TimestampError::InvalidPrecision(_))
    ));
}

#[test]
fn test_garbage_text_rejected() {
    assert!(matches!(
        convert_timestamp(&text("not a date"), Precision::Nanoseconds),
        Err(TimestampError::Unparseable(_))
    ));
}
