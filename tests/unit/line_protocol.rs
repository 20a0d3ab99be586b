//! Unit tests for line-protocol encoding

use influx_migrate::protocol::{encode_line, escape_key, EncodeError};
use influx_migrate::{FieldValue, Record};
use std::collections::BTreeMap;

/// Split on `delim` where it is not preceded by an escaping backslash, then
/// unescape each part
fn split_unescaped(input: &str, delim: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => current.push('\n'),
                Some(next) => current.push(next),
                None => current.push('\\'),
            },
            c if c == delim => parts.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}

#[test]
fn test_reference_record() {
    let record = Record::new()
        .with_tag("host", "a b")
        .with_field("value", 1i64)
        .with_field("time", 0i64);

    assert_eq!(record.to_line("cpu").unwrap(), "cpu,host=a\\ b value=1i 0");
}

#[test]
fn test_escaped_tag_values_split_back() {
    let values = ["a,b", "x y", "k=v", "back\\slash", "all ,=\\ of\nthem"];

    for value in values {
        let escaped = escape_key(value);
        let pair = format!("tag={escaped}");
        let parts = split_unescaped(&pair, '=');
        assert_eq!(parts.len(), 2, "unescaped '=' leaked for {value:?}");
        assert_eq!(parts[1], value);

        let joined = format!("{escaped},{escaped}");
        assert_eq!(split_unescaped(&joined, ','), vec![value, value]);
    }
}

#[test]
fn test_backslash_escaped_once() {
    assert_eq!(escape_key("a\\ b"), "a\\\\\\ b");
}

#[test]
fn test_tags_and_fields_sorted() {
    let record = Record::new()
        .with_tag("zone", "eu")
        .with_tag("app", "api")
        .with_field("z", 1.5)
        .with_field("a", true)
        .with_field("m", "text")
        .with_field("time", 10i64);

    assert_eq!(
        record.to_line("m").unwrap(),
        "m,app=api,zone=eu a=true,m=\"text\",z=1.5 10"
    );
}

#[test]
fn test_empty_tags_and_fields_omitted() {
    let record = Record::new()
        .with_tag("host", "")
        .with_field("nan", f64::NAN)
        .with_field("time", 5i64);

    assert_eq!(record.to_line("cpu").unwrap(), "cpu 5");
}

#[test]
fn test_string_field_quoting() {
    let record = Record::new()
        .with_field("msg", "say \"hi\"\nback\\")
        .with_field("time", 1i64);

    assert_eq!(
        record.to_line("log").unwrap(),
        "log msg=\"say \\\"hi\\\"\\nback\\\\\" 1"
    );
}

#[test]
fn test_text_time_normalized() {
    let record = Record::new()
        .with_field("value", 2i64)
        .with_field("time", "1970-01-01T00:00:01Z");

    assert_eq!(record.to_line("cpu").unwrap(), "cpu value=2i 1000000000");
}

#[test]
fn test_missing_time_is_error() {
    let mut fields = BTreeMap::new();
    fields.insert("value".to_string(), FieldValue::Integer(1));

    assert!(matches!(
        encode_line("cpu", &BTreeMap::new(), &fields),
        Err(EncodeError::MissingTime)
    ));
}

#[test]
fn test_unparseable_time_is_error() {
    let record = Record::new().with_field("time", "yesterday");
    assert!(matches!(
        record.to_line("cpu"),
        Err(EncodeError::Timestamp(_))
    ));
}
