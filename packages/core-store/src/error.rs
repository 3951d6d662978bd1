//! Error types for the store layer.
//!
//! Only store collaborators and codecs produce these. The typed layer above
//! never hands them to callers: it logs them and falls back to defaults.

use std::path::PathBuf;

/// Errors raised by stores and codecs.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A value could not be encoded into its stored representation.
    #[error("encode error ({kind}): {message}")]
    Encode { kind: &'static str, message: String },

    /// A stored representation could not be decoded.
    #[error("decode error ({kind}): {message}")]
    Decode { kind: &'static str, message: String },

    /// The location backing a persistent store is unusable.
    #[error("invalid store location {}: {message}", path.display())]
    InvalidLocation { path: PathBuf, message: String },

    /// File or transport I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by a store implementation.
    #[error("store backend error: {message}")]
    Backend { message: String },
}

impl Error {
    pub fn encode(kind: &'static str, message: impl ToString) -> Self {
        Error::Encode {
            kind,
            message: message.to_string(),
        }
    }

    pub fn decode(kind: &'static str, message: impl ToString) -> Self {
        Error::Decode {
            kind,
            message: message.to_string(),
        }
    }

    pub fn backend(message: impl ToString) -> Self {
        Error::Backend {
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn encode_error_display() {
        let e = Error::encode("json", "key must be a string");
        let display = format!("{}", e);
        assert!(display.contains("encode error"));
        assert!(display.contains("json"));
        assert!(display.contains("key must be a string"));
    }

    #[test]
    fn decode_error_display() {
        let e = Error::decode("archive", "unexpected end of input");
        assert_eq!(
            format!("{}", e),
            "decode error (archive): unexpected end of input"
        );
    }

    #[test]
    fn invalid_location_display() {
        let e = Error::InvalidLocation {
            path: PathBuf::from("/nonexistent/prefs.json"),
            message: "parent is not a directory".to_string(),
        };
        let display = format!("{}", e);
        assert!(display.contains("/nonexistent/prefs.json"));
        assert!(display.contains("parent is not a directory"));
    }

    #[test]
    fn io_error_converts_and_keeps_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(StdError::source(&e).is_some());
    }

    #[test]
    fn backend_error_has_no_source() {
        let e = Error::backend("remote store offline");
        assert!(StdError::source(&e).is_none());
        assert!(format!("{}", e).contains("remote store offline"));
    }
}
