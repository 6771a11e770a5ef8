//! Dynamic SQL values
//!
//! [`Value`] is the single currency between builders, drivers and the result
//! materializer. Bindings are stored as `Value`, drivers hand rows back as
//! `Vec<Value>`, and record setters receive a `Value` per column.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::error::{OrmError, OrmResult};

/// A single SQL value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, used in decode messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
        }
    }

    /// Render the value as display text.
    ///
    /// Null becomes the empty string, floats use the shortest exact decimal
    /// form, bytes are read as UTF-8 and timestamps are written as RFC 3339
    /// in UTC with sub-second digits only when present.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            Value::Timestamp(ts) => ts.and_utc().to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }

    /// Consume the value into display text, avoiding a copy for text.
    pub fn into_text(self) -> String {
        match self {
            Value::Text(s) => s,
            Value::Bytes(b) => match String::from_utf8(b) {
                Ok(s) => s,
                Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
            },
            other => other.to_text(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

macro_rules! int_into_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(v as i64)
                }
            }
        )*
    };
}

int_into_value!(i8, i16, i32, i64, u8, u16, u32, isize);

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Text(v.to_string()),
        }
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::from(v as u64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v.naive_utc())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Text(v.format("%Y-%m-%d").to_string())
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            other => Value::Text(other.to_string()),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

/// Conversion from a [`Value`] into a typed record field.
///
/// Errors are [`OrmError::Decode`] without a column name; the materializer
/// fills the column in.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> OrmResult<Self>;
}

fn mismatch<T>(value: &Value, want: &str) -> OrmResult<T> {
    Err(OrmError::decode(
        "",
        format!("cannot convert {} value `{}` into {}", value.kind(), value, want),
    ))
}

impl FromValue for Value {
    fn from_value(value: Value) -> OrmResult<Self> {
        Ok(value)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> OrmResult<Self> {
        Ok(value.into_text())
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(i) => Ok(i != 0),
            Value::Text(ref s) => match s.as_str() {
                "1" | "true" | "TRUE" => Ok(true),
                "0" | "false" | "FALSE" => Ok(false),
                _ => mismatch(&value, "bool"),
            },
            other => mismatch(&other, "bool"),
        }
    }
}

macro_rules! int_from_value {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: Value) -> OrmResult<Self> {
                    let wide: i64 = match value {
                        Value::Int(i) => i,
                        Value::Bool(b) => i64::from(b),
                        Value::Text(ref s) => match s.trim().parse() {
                            Ok(i) => i,
                            Err(_) => return mismatch(&value, stringify!($t)),
                        },
                        Value::Bytes(ref b) => match std::str::from_utf8(b).ok().and_then(|s| s.trim().parse().ok()) {
                            Some(i) => i,
                            None => return mismatch(&value, stringify!($t)),
                        },
                        other => return mismatch(&other, stringify!($t)),
                    };
                    <$t>::try_from(wide).map_err(|_| {
                        OrmError::decode("", format!("{} out of range for {}", wide, stringify!($t)))
                    })
                }
            }
        )*
    };
}

int_from_value!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

macro_rules! float_from_value {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: Value) -> OrmResult<Self> {
                    match value {
                        Value::Float(f) => Ok(f as $t),
                        Value::Int(i) => Ok(i as $t),
                        Value::Text(ref s) => match s.trim().parse() {
                            Ok(f) => Ok(f),
                            Err(_) => mismatch(&value, stringify!($t)),
                        },
                        other => mismatch(&other, stringify!($t)),
                    }
                }
            }
        )*
    };
}

float_from_value!(f32, f64);

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => mismatch(&other, "bytes"),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            Value::Text(ref s) => parse_timestamp(s).map_or_else(|| mismatch(&value, "timestamp"), Ok),
            other => mismatch(&other, "timestamp"),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> OrmResult<Self> {
        NaiveDateTime::from_value(value).map(|ts| ts.and_utc())
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Timestamp(ts) => Ok(ts.date()),
            Value::Text(ref s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .or_else(|| parse_timestamp(s).map(|ts| ts.date()))
                .map_or_else(|| mismatch(&value, "date"), Ok),
            other => mismatch(&other, "date"),
        }
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Text(ref s) => s.parse().map_or_else(|_| mismatch(&value, "uuid"), Ok),
            Value::Bytes(ref b) => uuid::Uuid::from_slice(b).map_or_else(|_| mismatch(&value, "uuid"), Ok),
            other => mismatch(&other, "uuid"),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(serde_json::Value::Null),
            Value::Text(s) => serde_json::from_str(&s).map_err(|e| OrmError::decode("", e.to_string())),
            Value::Bytes(b) => serde_json::from_slice(&b).map_err(|e| OrmError::decode("", e.to_string())),
            Value::Bool(b) => Ok(serde_json::Value::Bool(b)),
            Value::Int(i) => Ok(serde_json::Value::from(i)),
            Value::Float(f) => Ok(serde_json::Value::from(f)),
            Value::Timestamp(_) => Ok(serde_json::Value::String(value.to_text())),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}
