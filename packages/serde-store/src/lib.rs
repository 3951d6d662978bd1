//! Serde Integration for typed-defaults
//!
//! This layer provides the serde-backed encodings the typed layer and the
//! persistent stores rely on:
//! - `JsonCodec`: structured values as a JSON byte blob
//! - `ArchiveCodec`: object graphs as a tagged binary archive
//! - RawValue <-> JSON document conversions for file-backed stores
//!
//! # Example
//!
//! ```rust
//! use typed_defaults_serde::{document_from_json, document_to_json, RawValue};
//! use std::collections::BTreeMap;
//!
//! let mut document = BTreeMap::new();
//! document.insert("launchCount".to_string(), RawValue::Integer(3));
//!
//! let json = document_to_json(&document).unwrap();
//! assert_eq!(document_from_json(json).unwrap(), document);
//! ```

pub use bytes::Bytes;

mod codec;
mod convert;

pub use codec::{ArchiveCodec, BlobCodec, JsonCodec, ARCHIVE_MAGIC};
pub use convert::{document_from_json, document_to_json, json_to_raw, raw_to_json};

// Re-export core types for convenience
pub use typed_defaults_core::{Error, RawValue};
