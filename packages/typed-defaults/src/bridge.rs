//! Bridges: how each value type is read from and written to a store.
//!
//! A bridge is the [`DefaultsBridge`] impl of a value type. It is resolved at
//! compile time, so asking for a type without one is a build error rather
//! than a runtime failure.

use std::any::type_name;
use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use typed_defaults_core::{DefaultsStore, Error, RawValue};
use typed_defaults_serde::{ArchiveCodec, BlobCodec};
use url::Url;

use crate::primitive::{Primitive, PrimitiveKind};

/// Converts one value type to and from the store's [`RawValue`]s.
///
/// `deserialize` returns `None` for anything it cannot read; callers then
/// fall back to defaults. `serialize` only fails for values that have no
/// stored representation at all.
pub trait DefaultsBridge: Sized + Clone {
    fn deserialize(raw: &RawValue) -> Option<Self>;

    fn serialize(&self) -> Result<RawValue, Error>;

    /// Read and decode the value stored for `identifier`.
    ///
    /// Store failures and undecodable values are logged and read as `None`.
    fn get<S: DefaultsStore + ?Sized>(store: &S, identifier: &str) -> Option<Self> {
        match store.get_raw(identifier) {
            Ok(Some(raw)) => {
                let value = Self::deserialize(&raw);
                if value.is_none() {
                    log::debug!(
                        "'{}' holds a {} that does not decode as {}",
                        identifier,
                        raw.kind(),
                        type_name::<Self>()
                    );
                }
                value
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Failed to read '{}': {}", identifier, e);
                None
            }
        }
    }

    /// Encode and store `value` for `identifier`; `None` removes the entry.
    ///
    /// An encode failure is logged and nothing is written.
    fn save<S: DefaultsStore + ?Sized>(store: &S, identifier: &str, value: Option<&Self>) {
        let raw = match value.map(Self::serialize).transpose() {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!(
                    "Dropping write to '{}': cannot encode {}: {}",
                    identifier,
                    type_name::<Self>(),
                    e
                );
                return;
            }
        };

        if let Err(e) = store.set_raw(identifier, raw) {
            log::warn!("Failed to write '{}': {}", identifier, e);
        }
    }
}

/// Element types that can be stored as a `Vec`.
///
/// The provided encoding stores one raw value per element and decodes all or
/// nothing. Types stored as a single blob override both methods.
///
/// `Vec<T>` never implements this trait, so nested arrays have no bridge:
///
/// ```compile_fail
/// use typed_defaults::Key;
///
/// let matrix: Key<Vec<Vec<i64>>> = Key::new("matrix", Vec::new());
/// ```
pub trait ArrayBridge: DefaultsBridge {
    fn deserialize_array(raw: &RawValue) -> Option<Vec<Self>> {
        raw.as_array()?.iter().map(Self::deserialize).collect()
    }

    fn serialize_array(values: &[Self]) -> Result<RawValue, Error> {
        values
            .iter()
            .map(Self::serialize)
            .collect::<Result<Vec<_>, _>>()
            .map(RawValue::Array)
    }
}

impl<T: ArrayBridge> DefaultsBridge for Vec<T> {
    fn deserialize(raw: &RawValue) -> Option<Self> {
        T::deserialize_array(raw)
    }

    fn serialize(&self) -> Result<RawValue, Error> {
        T::serialize_array(self)
    }
}

macro_rules! primitive_bridge {
    ($($ty:ty => $kind:ident { read: |$p:ident| $read:expr, write: |$v:ident| $write:expr $(,)? })+) => {$(
        impl DefaultsBridge for $ty {
            fn deserialize(raw: &RawValue) -> Option<Self> {
                match PrimitiveKind::$kind.decode(raw)? {
                    Primitive::$kind($p) => $read,
                    _ => None,
                }
            }

            fn serialize(&self) -> Result<RawValue, Error> {
                let $v = self;
                $write
            }
        }
    )+};
}

primitive_bridge! {
    String => String {
        read: |s| Some(s),
        write: |v| Ok(RawValue::String(v.clone())),
    }
    i64 => Integer {
        read: |i| Some(i),
        write: |v| Ok(RawValue::Integer(*v)),
    }
    i32 => Integer {
        read: |i| i32::try_from(i).ok(),
        write: |v| Ok(RawValue::Integer(i64::from(*v))),
    }
    u32 => Integer {
        read: |i| u32::try_from(i).ok(),
        write: |v| Ok(RawValue::Integer(i64::from(*v))),
    }
    u64 => Integer {
        read: |i| u64::try_from(i).ok(),
        write: |v| i64::try_from(*v)
            .map(RawValue::Integer)
            .map_err(|e| Error::encode("integer", e)),
    }
    f64 => Float {
        read: |f| Some(f),
        write: |v| Ok(RawValue::Float(*v)),
    }
    f32 => Float {
        read: |f| Some(f as f32),
        write: |v| Ok(RawValue::Float(f64::from(*v))),
    }
    bool => Bool {
        read: |b| Some(b),
        write: |v| Ok(RawValue::Bool(*v)),
    }
    Bytes => Data {
        read: |b| Some(b),
        write: |v| Ok(RawValue::Bytes(v.clone())),
    }
    DateTime<Utc> => Date {
        read: |d| Some(d),
        write: |v| Ok(RawValue::Date(*v)),
    }
    Url => Url {
        read: |u| Some(u),
        write: |v| encode_blob::<ArchiveCodec, Url>(v),
    }
}

impl ArrayBridge for String {}
impl ArrayBridge for i64 {}
impl ArrayBridge for i32 {}
impl ArrayBridge for u32 {}
impl ArrayBridge for u64 {}
impl ArrayBridge for f64 {}
impl ArrayBridge for f32 {}
impl ArrayBridge for bool {}
impl ArrayBridge for Bytes {}
impl ArrayBridge for DateTime<Utc> {}

/// URL lists are archived as one blob, like single URLs.
impl ArrayBridge for Url {
    fn deserialize_array(raw: &RawValue) -> Option<Vec<Self>> {
        decode_blob::<ArchiveCodec, Vec<Url>>(raw)
    }

    fn serialize_array(values: &[Self]) -> Result<RawValue, Error> {
        encode_blob::<ArchiveCodec, [Url]>(values)
    }
}

/// Dictionaries pass through untouched.
impl DefaultsBridge for BTreeMap<String, RawValue> {
    fn deserialize(raw: &RawValue) -> Option<Self> {
        raw.as_map().cloned()
    }

    fn serialize(&self) -> Result<RawValue, Error> {
        Ok(RawValue::Map(self.clone()))
    }
}

impl ArrayBridge for BTreeMap<String, RawValue> {}

/// Untyped access: whatever is stored, as stored.
impl DefaultsBridge for RawValue {
    fn deserialize(raw: &RawValue) -> Option<Self> {
        Some(raw.clone())
    }

    fn serialize(&self) -> Result<RawValue, Error> {
        Ok(self.clone())
    }
}

impl ArrayBridge for RawValue {}

/// Encode `value` as a blob with codec `C`.
pub fn encode_blob<C: BlobCodec, T: serde::Serialize + ?Sized>(value: &T) -> Result<RawValue, Error> {
    C::encode(value).map(RawValue::Bytes)
}

/// Decode a blob written by [`encode_blob`]; anything else reads as `None`.
pub fn decode_blob<C: BlobCodec, T: DeserializeOwned>(raw: &RawValue) -> Option<T> {
    let bytes = raw.as_bytes()?;
    match C::decode(bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("Blob does not decode as {}: {}", type_name::<T>(), e);
            None
        }
    }
}

/// Types stored through a simpler raw type, usually an enum stored as its
/// name or discriminant.
///
/// Implement this and opt in with
/// [`impl_raw_representable_bridge!`](crate::impl_raw_representable_bridge).
/// Raw values with no matching variant read as `None`.
pub trait RawRepresentable: Sized {
    type Raw: DefaultsBridge;

    fn raw_value(&self) -> Self::Raw;

    fn from_raw_value(raw: Self::Raw) -> Option<Self>;
}
