//! Core typed-defaults: the untyped store layer
//!
//! This is the narrow waist of the typed-defaults stack. Everything at this
//! level is untyped:
//! - `RawValue`: the dynamically-typed values a preferences store holds
//! - `DefaultsStore`: the local key-value store collaborator
//! - `RemoteStore`: the remote key-value store a subset of keys can mirror to
//! - `ChangeHub`: observer bookkeeping that store implementations embed
//!
//! Typed keys, bridges and observers live in the `typed-defaults` crate; this
//! crate knows nothing about them.
//!
//! # Example
//!
//! ```rust
//! use typed_defaults_core::{DefaultsStore, Error, RawValue};
//!
//! fn bump_launch_count(store: &dyn DefaultsStore) -> Result<i64, Error> {
//!     let current = store
//!         .get_raw("launchCount")?
//!         .and_then(|raw| raw.as_i64())
//!         .unwrap_or(0);
//!     store.set_raw("launchCount", Some(RawValue::Integer(current + 1)))?;
//!     Ok(current + 1)
//! }
//! ```

pub use bytes::Bytes;

mod error;
mod notify;
mod traits;
mod value;

pub use error::Error;
pub use notify::{
    Change, ChangeCallback, ChangeHub, ChangeListener, ObserveOptions, ObserverToken,
};
pub use traits::{DefaultsStore, RemoteStore};
pub use value::RawValue;
