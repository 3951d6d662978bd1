//! Blob codecs for values stored as opaque bytes.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use typed_defaults_core::Error;

/// Encodes serde values into a single byte blob and back.
///
/// A codec is selected statically by the bridge of the value type, so the
/// trait uses generic methods and is not object-safe.
pub trait BlobCodec {
    /// Short name used in error messages.
    const KIND: &'static str;

    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, Error>;

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error>;
}

/// Structured encoding for plain data types: a JSON document.
///
/// # Example
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use typed_defaults_serde::{BlobCodec, JsonCodec};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Frog {
///     name: String,
/// }
///
/// let frog = Frog { name: "Froggy".to_string() };
/// let blob = JsonCodec::encode(&frog).unwrap();
/// assert_eq!(&blob[..], br#"{"name":"Froggy"}"#);
/// assert_eq!(JsonCodec::decode::<Frog>(&blob).unwrap(), frog);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl BlobCodec for JsonCodec {
    const KIND: &'static str = "json";

    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, Error> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| Error::encode(Self::KIND, e))
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
        serde_json::from_slice(bytes).map_err(|e| Error::decode(Self::KIND, e))
    }
}

/// Archive header so arbitrary blobs are never mistaken for archives.
pub const ARCHIVE_MAGIC: &[u8; 4] = b"TDA\x01";

/// Binary archiving for object graphs: a magic header followed by a
/// bincode payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveCodec;

impl ArchiveCodec {
    /// Whether `bytes` starts with the archive header.
    pub fn is_archive(bytes: &[u8]) -> bool {
        bytes.starts_with(ARCHIVE_MAGIC)
    }
}

impl BlobCodec for ArchiveCodec {
    const KIND: &'static str = "archive";

    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, Error> {
        let payload = bincode::serialize(value).map_err(|e| Error::encode(Self::KIND, e))?;
        let mut blob = Vec::with_capacity(ARCHIVE_MAGIC.len() + payload.len());
        blob.extend_from_slice(ARCHIVE_MAGIC);
        blob.extend_from_slice(&payload);
        Ok(Bytes::from(blob))
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
        let payload = bytes
            .strip_prefix(ARCHIVE_MAGIC.as_slice())
            .ok_or_else(|| Error::decode(Self::KIND, "missing archive header"))?;
        bincode::deserialize(payload).map_err(|e| Error::decode(Self::KIND, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Frog {
        name: String,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Pond {
        frogs: Vec<Frog>,
        depth: f64,
    }

    #[test]
    fn json_codec_roundtrip() {
        let frog = Frog {
            name: "Froggy".to_string(),
        };
        let blob = JsonCodec::encode(&frog).unwrap();
        assert_eq!(JsonCodec::decode::<Frog>(&blob).unwrap(), frog);
    }

    #[test]
    fn json_codec_rejects_garbage() {
        let result = JsonCodec::decode::<Frog>(b"not json");
        assert!(matches!(result, Err(Error::Decode { kind: "json", .. })));
    }

    #[test]
    fn json_codec_rejects_wrong_shape() {
        let blob = JsonCodec::encode(&vec![1, 2, 3]).unwrap();
        assert!(JsonCodec::decode::<Frog>(&blob).is_err());
    }

    #[test]
    fn archive_codec_roundtrip_nested() {
        let pond = Pond {
            frogs: vec![
                Frog {
                    name: "Froggy".to_string(),
                },
                Frog {
                    name: "Toad".to_string(),
                },
            ],
            depth: 1.5,
        };
        let blob = ArchiveCodec::encode(&pond).unwrap();
        assert!(ArchiveCodec::is_archive(&blob));
        assert_eq!(ArchiveCodec::decode::<Pond>(&blob).unwrap(), pond);
    }

    #[test]
    fn archive_codec_requires_header() {
        let payload = bincode::serialize("plain").unwrap();
        let result = ArchiveCodec::decode::<String>(&payload);
        assert!(matches!(result, Err(Error::Decode { kind: "archive", .. })));
    }

    #[test]
    fn archive_codec_handles_urls() {
        let url = url::Url::parse("https://example.com/a?b=c").unwrap();
        let blob = ArchiveCodec::encode(&url).unwrap();
        assert_eq!(ArchiveCodec::decode::<url::Url>(&blob).unwrap(), url);
    }
}
