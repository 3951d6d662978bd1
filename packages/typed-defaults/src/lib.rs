//! typed-defaults: strongly-typed keys over a key-value preferences store
//!
//! Declare keys once, with their value type and default, and read and write
//! them through typed accessors instead of the store's untyped,
//! string-keyed API. On top of that:
//! - change observation with typed old/new values ([`DefaultsObserver`]),
//!   or as a stream of values ([`DefaultsPublisher`])
//! - mirroring selected keys to a remote store ([`DefaultsSyncer`])
//! - field-like cached handles ([`DefaultsProperty`])
//!
//! The store itself is injected: anything implementing [`DefaultsStore`]
//! works. Ready-made stores live in `typed-defaults-json-store`.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use typed_defaults::{define_keys, DefaultsAdapter, ObserveOptions};
//! use typed_defaults_json_store::MemoryStore;
//!
//! define_keys! {
//!     pub struct AppKeys {
//!         launch_count: Key<i64> = "launchCount",
//!         username: OptionalKey<String> = "username",
//!         hints_enabled: Key<bool> = "hintsEnabled" => true,
//!     }
//! }
//!
//! let defaults = DefaultsAdapter::new(Arc::new(MemoryStore::new()), AppKeys::default());
//!
//! assert_eq!(defaults.get_with(|k| &k.launch_count), 0);
//! assert!(defaults.get_with(|k| &k.hints_enabled));
//!
//! let observer = defaults.observe_with(|k| &k.launch_count, ObserveOptions::default(), |update| {
//!     assert_eq!(update.new_value, Some(1));
//! });
//! defaults.set_with(|k| &k.launch_count, 1);
//! drop(observer);
//!
//! defaults.set_with(|k| &k.username, Some("frog".to_string()));
//! defaults.set_with(|k| &k.username, None);
//! assert!(!defaults.has_key_with(|k| &k.username));
//! ```

pub use bytes::Bytes;
pub use chrono::{DateTime, Utc};
pub use url::Url;

mod accessor;
mod adapter;
pub mod bridge;
mod key;
mod macros;
mod observer;
mod primitive;
mod property;
mod publisher;
mod syncer;

pub use accessor::DefaultsAccess;
pub use adapter::DefaultsAdapter;
pub use bridge::{ArrayBridge, DefaultsBridge, RawRepresentable};
pub use key::{AnyKey, DefaultValue, Key, OptionalKey, TypedKey};
pub use observer::{DefaultsObserver, Disposable, Update};
pub use primitive::{Primitive, PrimitiveKind};
pub use property::{DefaultsProperty, PropertyOptions};
pub use publisher::DefaultsPublisher;
pub use syncer::DefaultsSyncer;

// Re-export the lower layers for convenience
pub use typed_defaults_core::{
    Change, ChangeCallback, ChangeListener, DefaultsStore, Error, ObserveOptions, ObserverToken,
    RawValue, RemoteStore,
};
pub use typed_defaults_serde::{ArchiveCodec, BlobCodec, JsonCodec};
