//! Lossless conversions between RawValue and JSON documents.
//!
//! JSON has no blob or date type, so those travel as single-key tagged
//! objects: `{"$bytes": "<base64>"}` and `{"$date": "<rfc3339>"}`. A map
//! that would itself look like a tag is wrapped as `{"$map": {...}}`.

use std::collections::BTreeMap;

use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map as JsonMap, Value as JsonValue};
use typed_defaults_core::{Error, RawValue};

const BYTES_TAG: &str = "$bytes";
const DATE_TAG: &str = "$date";
const MAP_TAG: &str = "$map";

/// Convert a RawValue into its JSON document form.
///
/// Fails only for non-finite floats, which JSON cannot represent.
pub fn raw_to_json(value: &RawValue) -> Result<JsonValue, Error> {
    Ok(match value {
        RawValue::String(s) => JsonValue::String(s.clone()),
        RawValue::Integer(i) => JsonValue::Number((*i).into()),
        RawValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .ok_or_else(|| Error::encode("json", format!("non-finite float {}", f)))?,
        RawValue::Bool(b) => JsonValue::Bool(*b),
        RawValue::Bytes(b) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(b);
            tagged(BYTES_TAG, JsonValue::String(encoded))
        }
        RawValue::Date(d) => tagged(
            DATE_TAG,
            JsonValue::String(d.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        ),
        RawValue::Array(items) => {
            JsonValue::Array(items.iter().map(raw_to_json).collect::<Result<_, _>>()?)
        }
        RawValue::Map(map) => {
            let object = map_to_json(map)?;
            if looks_tagged(&object) {
                tagged(MAP_TAG, JsonValue::Object(object))
            } else {
                JsonValue::Object(object)
            }
        }
    })
}

/// Convert a JSON document back into a RawValue.
///
/// JSON `null` has no RawValue counterpart and is rejected.
pub fn json_to_raw(json: JsonValue) -> Result<RawValue, Error> {
    match json {
        JsonValue::Null => Err(Error::decode("json", "null is not a storable value")),
        JsonValue::Bool(b) => Ok(RawValue::Bool(b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(RawValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(RawValue::Float(f))
            } else {
                Err(Error::decode("json", format!("number out of range: {}", n)))
            }
        }
        JsonValue::String(s) => Ok(RawValue::String(s)),
        JsonValue::Array(items) => Ok(RawValue::Array(
            items.into_iter().map(json_to_raw).collect::<Result<_, _>>()?,
        )),
        JsonValue::Object(object) => object_to_raw(object),
    }
}

/// Convert a whole store document (identifier -> value) to a JSON object.
pub fn document_to_json(document: &BTreeMap<String, RawValue>) -> Result<JsonValue, Error> {
    Ok(JsonValue::Object(map_to_json(document)?))
}

/// Parse a JSON object into a store document.
///
/// Top-level `null` entries are skipped: they mean "absent".
pub fn document_from_json(json: JsonValue) -> Result<BTreeMap<String, RawValue>, Error> {
    let JsonValue::Object(object) = json else {
        return Err(Error::decode("json", "store document must be an object"));
    };

    object
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| json_to_raw(v).map(|raw| (k, raw)))
        .collect()
}

fn map_to_json(map: &BTreeMap<String, RawValue>) -> Result<JsonMap<String, JsonValue>, Error> {
    map.iter()
        .map(|(k, v)| raw_to_json(v).map(|json| (k.clone(), json)))
        .collect()
}

fn tagged(tag: &str, value: JsonValue) -> JsonValue {
    let mut object = JsonMap::new();
    object.insert(tag.to_string(), value);
    JsonValue::Object(object)
}

fn looks_tagged(object: &JsonMap<String, JsonValue>) -> bool {
    object.len() == 1
        && object
            .keys()
            .all(|k| k == BYTES_TAG || k == DATE_TAG || k == MAP_TAG)
}

fn object_to_raw(object: JsonMap<String, JsonValue>) -> Result<RawValue, Error> {
    if looks_tagged(&object) {
        let Some((tag, inner)) = object.into_iter().next() else {
            return Ok(RawValue::map());
        };
        return match (tag.as_str(), inner) {
            (BYTES_TAG, JsonValue::String(encoded)) => base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map(|b| RawValue::Bytes(Bytes::from(b)))
                .map_err(|e| Error::decode("json", e)),
            (DATE_TAG, JsonValue::String(text)) => DateTime::parse_from_rfc3339(&text)
                .map(|d| RawValue::Date(d.with_timezone(&Utc)))
                .map_err(|e| Error::decode("json", e)),
            (MAP_TAG, JsonValue::Object(inner)) => untagged_object_to_raw(inner),
            (tag, _) => Err(Error::decode(
                "json",
                format!("malformed '{}' tagged value", tag),
            )),
        };
    }
    untagged_object_to_raw(object)
}

fn untagged_object_to_raw(object: JsonMap<String, JsonValue>) -> Result<RawValue, Error> {
    Ok(RawValue::Map(
        object
            .into_iter()
            .map(|(k, v)| json_to_raw(v).map(|raw| (k, raw)))
            .collect::<Result<_, _>>()?,
    ))
}
