//! Primitive value kinds and their lenient decoding.
//!
//! Every primitive bridge reads through [`PrimitiveKind::decode`], so the
//! coercion rules for each kind live in exactly one place.

use std::path::PathBuf;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use typed_defaults_core::RawValue;
use typed_defaults_serde::{ArchiveCodec, BlobCodec};
use url::Url;

/// The closed set of primitive kinds a store hands out natively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Integer,
    Float,
    Bool,
    Data,
    Date,
    Url,
}

/// A decoded primitive value.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Data(Bytes),
    Date(DateTime<Utc>),
    Url(Url),
}

const TRUE_STRINGS: &[&str] = &["YES", "yes", "TRUE", "true", "Y", "y", "T", "t", "1"];
const FALSE_STRINGS: &[&str] = &["NO", "no", "FALSE", "false", "N", "n", "F", "f", "0"];

impl PrimitiveKind {
    /// Decode `raw` as this kind, or `None` when it cannot be read as one.
    ///
    /// | kind | accepts |
    /// |---|---|
    /// | string | strings; integers and floats rendered as text |
    /// | integer | integers; floats truncated toward zero; bools as 0/1; numeric strings |
    /// | float | floats; integers; bools as 0/1; numeric strings |
    /// | bool | bools; numbers (non-zero is true); `YES`/`true`/`y`/`1`-style strings |
    /// | data | blobs |
    /// | date | dates; RFC 3339 strings |
    /// | url | archived URL blobs; absolute URL strings; file paths (`~` expanded, relative paths against the current directory) |
    pub fn decode(self, raw: &RawValue) -> Option<Primitive> {
        match self {
            PrimitiveKind::String => decode_string(raw).map(Primitive::String),
            PrimitiveKind::Integer => decode_integer(raw).map(Primitive::Integer),
            PrimitiveKind::Float => decode_float(raw).map(Primitive::Float),
            PrimitiveKind::Bool => decode_bool(raw).map(Primitive::Bool),
            PrimitiveKind::Data => raw.as_bytes().cloned().map(Primitive::Data),
            PrimitiveKind::Date => decode_date(raw).map(Primitive::Date),
            PrimitiveKind::Url => decode_url(raw).map(Primitive::Url),
        }
    }
}

fn decode_string(raw: &RawValue) -> Option<String> {
    match raw {
        RawValue::String(s) => Some(s.clone()),
        RawValue::Integer(i) => Some(i.to_string()),
        RawValue::Float(f) => Some(f.to_string()),
        _ => None,
    }
}

fn float_to_integer(f: f64) -> Option<i64> {
    // `as` saturates at the i64 bounds.
    f.is_finite().then(|| f.trunc() as i64)
}

fn decode_integer(raw: &RawValue) -> Option<i64> {
    match raw {
        RawValue::Integer(i) => Some(*i),
        RawValue::Float(f) => float_to_integer(*f),
        RawValue::Bool(b) => Some(i64::from(*b)),
        RawValue::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_integer))
        }
        _ => None,
    }
}

fn decode_float(raw: &RawValue) -> Option<f64> {
    match raw {
        RawValue::Float(f) => Some(*f),
        RawValue::Integer(i) => Some(*i as f64),
        RawValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        RawValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn decode_bool(raw: &RawValue) -> Option<bool> {
    match raw {
        RawValue::Bool(b) => Some(*b),
        RawValue::Integer(i) => Some(*i != 0),
        RawValue::Float(f) => Some(*f != 0.0),
        RawValue::String(s) if TRUE_STRINGS.contains(&s.as_str()) => Some(true),
        RawValue::String(s) if FALSE_STRINGS.contains(&s.as_str()) => Some(false),
        _ => None,
    }
}

fn decode_date(raw: &RawValue) -> Option<DateTime<Utc>> {
    match raw {
        RawValue::Date(d) => Some(*d),
        RawValue::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        _ => None,
    }
}

fn decode_url(raw: &RawValue) -> Option<Url> {
    match raw {
        RawValue::Bytes(b) if ArchiveCodec::is_archive(b) => ArchiveCodec::decode(b).ok(),
        RawValue::String(s) => Url::parse(s).ok().or_else(|| file_url(s)),
        _ => None,
    }
}

fn file_url(path: &str) -> Option<Url> {
    let expanded = if path == "~" {
        dirs::home_dir()?
    } else if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()?.join(rest)
    } else {
        PathBuf::from(path)
    };
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir().ok()?.join(expanded)
    };
    Url::from_file_path(absolute).ok()
}
