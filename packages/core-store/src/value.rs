//! The RawValue type - the untyped value a preferences store holds.
//!
//! Everything the typed layer reads or writes passes through this union. It is
//! the shape of the platform store's property-list values: scalars, blobs,
//! dates, and nested lists/maps of those.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A dynamically-typed value held by a [`DefaultsStore`](crate::DefaultsStore).
///
/// # Design Notes
///
/// - There is no null variant. Absence is `Option::None` at the store
///   boundary, and writing `None` removes the entry.
/// - Uses `BTreeMap` for deterministic ordering (stable file output, comparison)
/// - Uses `i64` for integers and `f64` for floats
#[derive(Clone, Debug, PartialEq)]
pub enum RawValue {
    /// UTF-8 string.
    String(String),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// Boolean value.
    Bool(bool),
    /// Binary blob.
    Bytes(Bytes),
    /// Point in time, always UTC.
    Date(DateTime<Utc>),
    /// Ordered sequence of values.
    Array(Vec<RawValue>),
    /// Key-value map with string keys.
    Map(BTreeMap<String, RawValue>),
}

impl RawValue {
    /// Create an empty map.
    pub fn map() -> Self {
        RawValue::Map(BTreeMap::new())
    }

    /// Short name of the variant, for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::String(_) => "string",
            RawValue::Integer(_) => "integer",
            RawValue::Float(_) => "float",
            RawValue::Bool(_) => "bool",
            RawValue::Bytes(_) => "bytes",
            RawValue::Date(_) => "date",
            RawValue::Array(_) => "array",
            RawValue::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RawValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RawValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            RawValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            RawValue::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[RawValue]> {
        match self {
            RawValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, RawValue>> {
        match self {
            RawValue::Map(map) => Some(map),
            _ => None,
        }
    }
}

// Conversion from common types

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        RawValue::Bool(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Integer(v)
    }
}

impl From<i32> for RawValue {
    fn from(v: i32) -> Self {
        RawValue::Integer(v as i64)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Float(v)
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::String(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::String(v.to_string())
    }
}

impl From<Bytes> for RawValue {
    fn from(v: Bytes) -> Self {
        RawValue::Bytes(v)
    }
}

impl From<DateTime<Utc>> for RawValue {
    fn from(v: DateTime<Utc>) -> Self {
        RawValue::Date(v)
    }
}

impl From<BTreeMap<String, RawValue>> for RawValue {
    fn from(v: BTreeMap<String, RawValue>) -> Self {
        RawValue::Map(v)
    }
}

impl<T: Into<RawValue>> From<Vec<T>> for RawValue {
    fn from(v: Vec<T>) -> Self {
        RawValue::Array(v.into_iter().map(Into::into).collect())
    }
}
