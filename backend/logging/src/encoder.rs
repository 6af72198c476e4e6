//! JSON encoder for log payloads.
//!
//! `LogValue` serializes through serde like any other value, with the extra
//! rules applied before falling back to the baseline representation:
//!
//! 1. datetimes render as ISO-8601 strings
//! 2. compiled regexes render as their pattern string
//! 3. sets render as their string form, not as a JSON array
//! 4. anything else uses its plain JSON form, or fails with a type error
//!
//! Dates, times, durations and UUIDs get the same string formats a Django
//! style encoder produces.

use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Utc};
use serde::ser::{Error as _, Serialize, Serializer};
use serde_json::ser::PrettyFormatter;

use advlog_core::LogError;

use crate::value::LogValue;

/// Whether `bson::Regex` payloads are recognised. Fixed at compile time.
pub const BSON_REGEX_SUPPORTED: bool = cfg!(feature = "bson");

/// Serialize any value to JSON text, pretty-printed with `indent` spaces if given.
pub fn encode<T: Serialize + ?Sized>(value: &T, indent: Option<usize>) -> Result<String, LogError> {
    let Some(width) = indent else {
        return Ok(serde_json::to_string(value)?);
    };

    let indent = " ".repeat(width);
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
    value.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| LogError::Other(e.into()))
}

impl Serialize for LogValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LogValue::Null => serializer.serialize_unit(),
            LogValue::Bool(b) => serializer.serialize_bool(*b),
            LogValue::Int(i) => serializer.serialize_i64(*i),
            LogValue::UInt(u) => serializer.serialize_u64(*u),
            LogValue::Float(x) if x.is_finite() => serializer.serialize_f64(*x),
            LogValue::Float(x) => Err(S::Error::custom(format!(
                "Out of range float values are not JSON compliant: {x}"
            ))),
            LogValue::Str(s) => serializer.serialize_str(s),
            LogValue::List(items) => serializer.collect_seq(items),
            LogValue::Map(map) => serializer.collect_map(map),

            LogValue::DateTime(dt) => serializer.serialize_str(&iso_datetime(dt)),
            LogValue::NaiveDateTime(dt) => serializer.serialize_str(&iso_naive_datetime(dt)),
            LogValue::Regex(re) => serializer.collect_str(re),
            LogValue::Set(_) => serializer.collect_str(self),

            LogValue::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            LogValue::Time(t) => serializer.serialize_str(&iso_time(t)),
            LogValue::Duration(d) => serializer.serialize_str(&iso_duration(d)),
            LogValue::Uuid(u) => serializer.collect_str(&u.hyphenated()),
            LogValue::Json(json) => json.serialize(serializer),
            LogValue::Opaque { type_name, .. } => Err(S::Error::custom(format!(
                "Object of type {type_name} is not JSON serializable"
            ))),
        }
    }
}

/// `serialize_with` adapter for envelope timestamps.
pub fn serialize_timestamp<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&iso_datetime(&time.fixed_offset()))
}

/// ISO-8601 with microseconds only when non-zero, e.g. `2024-03-01T10:00:00.250000+00:00`.
pub fn iso_datetime(dt: &DateTime<FixedOffset>) -> String {
    if dt.nanosecond() / 1_000 == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f%:z").to_string()
    }
}

pub fn iso_naive_datetime(dt: &NaiveDateTime) -> String {
    if dt.nanosecond() / 1_000 == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

/// Times keep millisecond precision.
pub fn iso_time(t: &NaiveTime) -> String {
    if t.nanosecond() / 1_000 == 0 {
        t.format("%H:%M:%S").to_string()
    } else {
        t.format("%H:%M:%S%.3f").to_string()
    }
}

/// `P{days}DT{hh}H{mm}M{ss}[.ffffff]S`, prefixed with `-` for negative spans.
pub fn iso_duration(d: &TimeDelta) -> String {
    let sign = if *d < TimeDelta::zero() { "-" } else { "" };
    let abs = d.abs();
    let total_seconds = abs.num_seconds();
    let micros = abs.subsec_nanos() / 1_000;

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;
    let fraction = if micros == 0 { String::new() } else { format!(".{micros:06}") };

    format!("{sign}P{days}DT{hours:02}H{minutes:02}M{seconds:02}{fraction}S")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;
    use std::collections::HashSet;

    fn to_json(value: LogValue) -> serde_json::Value {
        serde_json::from_str(&encode(&value, None).unwrap()).unwrap()
    }

    #[test]
    fn datetimes_render_iso8601() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(to_json(dt.into()), json!("2024-03-01T10:00:00+00:00"));

        let precise = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_micro_opt(10, 0, 0, 250_000)
            .unwrap();
        assert_eq!(to_json(precise.into()), json!("2024-03-01T10:00:00.250000"));
    }

    #[test]
    fn regex_renders_its_pattern() {
        let re = regex::Regex::new(r"^foo\d+$").unwrap();
        assert_eq!(to_json(re.into()), json!(r"^foo\d+$"));
    }

    #[test]
    fn sets_render_as_strings_not_arrays() {
        let set: HashSet<i64> = [3, 1, 2].into_iter().collect();
        assert_eq!(to_json(set.into()), json!("{1, 2, 3}"));
    }

    #[test]
    fn baseline_formats() {
        let time = NaiveTime::from_hms_micro_opt(9, 30, 5, 123_456).unwrap();
        assert_eq!(to_json(time.into()), json!("09:30:05.123"));

        let span = TimeDelta::days(1) + TimeDelta::hours(2) + TimeDelta::microseconds(5);
        assert_eq!(to_json(span.into()), json!("P1DT02H00M00.000005S"));
        assert_eq!(to_json((-TimeDelta::minutes(3)).into()), json!("-P0DT00H03M00S"));

        let id = uuid::Uuid::nil();
        assert_eq!(to_json(id.into()), json!("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn maps_are_emitted_with_sorted_keys() {
        let value = LogValue::map([("b", 1), ("a", 2)]);
        assert_eq!(encode(&value, None).unwrap(), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn opaque_and_non_finite_values_fail() {
        let err = encode(&LogValue::opaque(&std::time::Instant::now()), None).unwrap_err();
        assert!(err.to_string().contains("not JSON serializable"));
        assert!(encode(&LogValue::Float(f64::NAN), None).is_err());
    }

    #[test]
    fn indent_pretty_prints() {
        let value = LogValue::map([("a", 1)]);
        assert_eq!(encode(&value, Some(2)).unwrap(), "{\n  \"a\": 1\n}");
    }
}
