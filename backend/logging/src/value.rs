//! Log payloads.
//!
//! `LogValue` is the dynamic value a caller hands to a log method. It covers
//! everything the JSON encoder knows how to render, plus an `Opaque` escape
//! hatch for values that have no JSON form (encoding those fails and the
//! record builder falls back to the value's string form).

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};
use serde::Serialize;
use uuid::Uuid;

/// A compiled regular expression carried in a payload.
#[derive(Debug, Clone)]
pub enum RegexValue {
    Text(regex::Regex),
    Bytes(regex::bytes::Regex),
    #[cfg(feature = "bson")]
    Bson(bson::Regex),
}

impl fmt::Display for RegexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegexValue::Text(re) => f.write_str(re.as_str()),
            RegexValue::Bytes(re) => f.write_str(re.as_str()),
            #[cfg(feature = "bson")]
            RegexValue::Bson(re) => write!(f, "/{}/{}", re.pattern, re.options),
        }
    }
}

#[derive(Debug, Clone)]
pub enum LogValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    List(Vec<LogValue>),
    Map(BTreeMap<String, LogValue>),
    /// Unique members, kept sorted by their rendered form.
    Set(Vec<LogValue>),
    DateTime(DateTime<FixedOffset>),
    NaiveDateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    Duration(TimeDelta),
    Uuid(Uuid),
    Regex(RegexValue),
    /// Already-serialized JSON.
    Json(serde_json::Value),
    /// A value with no JSON representation.
    Opaque { type_name: String, repr: String },
}

impl LogValue {
    /// Build a set payload. Duplicate members (by rendered form) collapse.
    pub fn set<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<LogValue>,
    {
        let mut seen = BTreeSet::new();
        let mut members: Vec<(String, LogValue)> = items
            .into_iter()
            .map(Into::into)
            .map(|value: LogValue| (value.repr(), value))
            .filter(|(repr, _)| seen.insert(repr.clone()))
            .collect();
        members.sort_by(|a, b| a.0.cmp(&b.0));
        LogValue::Set(members.into_iter().map(|(_, value)| value).collect())
    }

    /// Build a map payload from string-like keys.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<LogValue>,
    {
        LogValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Capture any serde value. Values serde_json rejects (non-string map
    /// keys, failing `Serialize` impls) become `Opaque` with their debug form.
    pub fn serialized<T>(value: &T) -> Self
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        match serde_json::to_value(value) {
            Ok(json) => LogValue::Json(json),
            Err(_) => LogValue::opaque(value),
        }
    }

    /// Wrap a value that has no JSON representation.
    pub fn opaque<T: fmt::Debug + ?Sized>(value: &T) -> Self {
        LogValue::Opaque {
            type_name: std::any::type_name::<T>().to_string(),
            repr: format!("{value:?}"),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, LogValue::Null | LogValue::Json(serde_json::Value::Null))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LogValue::Str(s) => Some(s),
            LogValue::Json(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Rendered form used inside containers: strings are quoted.
    fn repr(&self) -> String {
        match self {
            LogValue::Str(s) => quoted(s),
            LogValue::Json(serde_json::Value::String(s)) => quoted(s),
            other => other.to_string(),
        }
    }
}

/// Double-quoted with JSON escapes.
fn quoted(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// The string form of a payload. Encoding failures retarget the message to this.
impl fmt::Display for LogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogValue::Null => f.write_str("null"),
            LogValue::Bool(b) => write!(f, "{b}"),
            LogValue::Int(i) => write!(f, "{i}"),
            LogValue::UInt(u) => write!(f, "{u}"),
            LogValue::Float(x) => write!(f, "{x}"),
            LogValue::Str(s) => f.write_str(s),
            LogValue::List(items) => {
                let parts: Vec<String> = items.iter().map(LogValue::repr).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            LogValue::Map(map) => {
                let parts: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{}: {}", quoted(k), v.repr()))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            LogValue::Set(members) => {
                let parts: Vec<String> = members.iter().map(LogValue::repr).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            LogValue::DateTime(dt) => f.write_str(&crate::encoder::iso_datetime(dt)),
            LogValue::NaiveDateTime(dt) => f.write_str(&crate::encoder::iso_naive_datetime(dt)),
            LogValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            LogValue::Time(t) => f.write_str(&crate::encoder::iso_time(t)),
            LogValue::Duration(d) => f.write_str(&crate::encoder::iso_duration(d)),
            LogValue::Uuid(u) => write!(f, "{}", u.hyphenated()),
            LogValue::Regex(re) => write!(f, "{re}"),
            LogValue::Json(json) => match json {
                serde_json::Value::String(s) => f.write_str(s),
                other => write!(f, "{other}"),
            },
            LogValue::Opaque { repr, .. } => f.write_str(repr),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

macro_rules! from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for LogValue {
            fn from(v: $t) -> Self {
                LogValue::Int(v as i64)
            }
        })*
    };
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for LogValue {
            fn from(v: $t) -> Self {
                LogValue::UInt(v as u64)
            }
        })*
    };
}

from_signed!(i8, i16, i32, i64, isize);
from_unsigned!(u8, u16, u32, u64, usize);

impl From<()> for LogValue {
    fn from(_: ()) -> Self {
        LogValue::Null
    }
}

impl From<bool> for LogValue {
    fn from(v: bool) -> Self {
        LogValue::Bool(v)
    }
}

impl From<f32> for LogValue {
    fn from(v: f32) -> Self {
        LogValue::Float(f64::from(v))
    }
}

impl From<f64> for LogValue {
    fn from(v: f64) -> Self {
        LogValue::Float(v)
    }
}

impl From<&str> for LogValue {
    fn from(v: &str) -> Self {
        LogValue::Str(v.to_string())
    }
}

impl From<String> for LogValue {
    fn from(v: String) -> Self {
        LogValue::Str(v)
    }
}

impl From<&String> for LogValue {
    fn from(v: &String) -> Self {
        LogValue::Str(v.clone())
    }
}

impl<T: Into<LogValue>> From<Option<T>> for LogValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(LogValue::Null, Into::into)
    }
}

impl<T: Into<LogValue>> From<Vec<T>> for LogValue {
    fn from(v: Vec<T>) -> Self {
        LogValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<LogValue>> From<BTreeMap<K, V>> for LogValue {
    fn from(v: BTreeMap<K, V>) -> Self {
        LogValue::map(v)
    }
}

impl<K: Into<String>, V: Into<LogValue>, S> From<HashMap<K, V, S>> for LogValue {
    fn from(v: HashMap<K, V, S>) -> Self {
        LogValue::map(v)
    }
}

impl<T: Into<LogValue>> From<BTreeSet<T>> for LogValue {
    fn from(v: BTreeSet<T>) -> Self {
        LogValue::set(v)
    }
}

impl<T: Into<LogValue>, S> From<HashSet<T, S>> for LogValue {
    fn from(v: HashSet<T, S>) -> Self {
        LogValue::set(v)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for LogValue {
    fn from(v: DateTime<Tz>) -> Self {
        LogValue::DateTime(v.fixed_offset())
    }
}

impl From<NaiveDateTime> for LogValue {
    fn from(v: NaiveDateTime) -> Self {
        LogValue::NaiveDateTime(v)
    }
}

impl From<NaiveDate> for LogValue {
    fn from(v: NaiveDate) -> Self {
        LogValue::Date(v)
    }
}

impl From<NaiveTime> for LogValue {
    fn from(v: NaiveTime) -> Self {
        LogValue::Time(v)
    }
}

impl From<TimeDelta> for LogValue {
    fn from(v: TimeDelta) -> Self {
        LogValue::Duration(v)
    }
}

impl From<Uuid> for LogValue {
    fn from(v: Uuid) -> Self {
        LogValue::Uuid(v)
    }
}

impl From<regex::Regex> for LogValue {
    fn from(v: regex::Regex) -> Self {
        LogValue::Regex(RegexValue::Text(v))
    }
}

impl From<regex::bytes::Regex> for LogValue {
    fn from(v: regex::bytes::Regex) -> Self {
        LogValue::Regex(RegexValue::Bytes(v))
    }
}

#[cfg(feature = "bson")]
impl From<bson::Regex> for LogValue {
    fn from(v: bson::Regex) -> Self {
        LogValue::Regex(RegexValue::Bson(v))
    }
}

impl From<serde_json::Value> for LogValue {
    fn from(v: serde_json::Value) -> Self {
        LogValue::Json(v)
    }
}
