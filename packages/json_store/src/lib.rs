//! Concrete stores for typed-defaults.
//!
//! - [`MemoryStore`]: a local store held in memory
//! - [`MemoryRemoteStore`]: an in-memory stand-in for a remote key-value store
//! - [`JsonFileStore`]: a local store persisted as one JSON file per suite

mod domain;
pub mod in_memory;
pub mod local_disk;

pub use in_memory::{MemoryRemoteStore, MemoryStore};
pub use local_disk::{JsonFileStore, JsonFileStoreOptions};
