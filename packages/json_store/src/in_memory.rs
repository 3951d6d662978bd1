//! In-memory stores.
//!
//! `MemoryStore` is a complete local [`DefaultsStore`] that keeps everything
//! in process memory. `MemoryRemoteStore` stands in for a remote key-value
//! service and lets callers simulate changes pushed from another device.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use typed_defaults_core::{
    ChangeCallback, ChangeHub, ChangeListener, DefaultsStore, Error, ObserveOptions,
    ObserverToken, RawValue, RemoteStore,
};

use crate::domain::{read_lock, write_lock, Domain};

/// A local preferences store held entirely in memory.
///
/// # Example
///
/// ```rust
/// use typed_defaults_json_store::MemoryStore;
/// use typed_defaults_core::{DefaultsStore, RawValue};
///
/// let store = MemoryStore::new();
///
/// store.set_raw("username", Some(RawValue::from("Alice"))).unwrap();
/// assert_eq!(store.get_raw("username").unwrap(), Some(RawValue::from("Alice")));
///
/// // Writing None removes the entry
/// store.set_raw("username", None).unwrap();
/// assert_eq!(store.get_raw("username").unwrap(), None);
/// ```
#[derive(Default)]
pub struct MemoryStore {
    domain: Domain,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with initial persisted entries.
    pub fn with_values(values: BTreeMap<String, RawValue>) -> Self {
        Self {
            domain: Domain::with_entries(values),
        }
    }

    /// Copy of every persisted entry.
    pub fn snapshot(&self) -> Result<BTreeMap<String, RawValue>, Error> {
        Ok(read_lock(self.domain.entries())?.clone())
    }

    /// Number of per-key observers registered for `identifier`.
    pub fn observer_count(&self, identifier: &str) -> usize {
        self.domain.hub().observer_count(identifier)
    }

    /// Number of store-wide change listeners.
    pub fn listener_count(&self) -> usize {
        self.domain.hub().listener_count()
    }
}

impl DefaultsStore for MemoryStore {
    fn get_raw(&self, identifier: &str) -> Result<Option<RawValue>, Error> {
        self.domain.get(identifier)
    }

    fn set_raw(&self, identifier: &str, value: Option<RawValue>) -> Result<(), Error> {
        self.domain.set(identifier, value, |_| Ok(()))
    }

    fn identifiers(&self) -> Result<BTreeSet<String>, Error> {
        self.domain.identifiers()
    }

    fn register_defaults(&self, defaults: BTreeMap<String, RawValue>) -> Result<(), Error> {
        self.domain.register(defaults)
    }

    fn add_observer(
        &self,
        identifier: &str,
        options: ObserveOptions,
        callback: ChangeCallback,
    ) -> Result<ObserverToken, Error> {
        self.domain.add_observer(identifier, options, callback)
    }

    fn add_change_listener(&self, listener: ChangeListener) -> Result<ObserverToken, Error> {
        Ok(self.domain.add_listener(listener))
    }

    fn remove_observer(&self, token: ObserverToken) {
        self.domain.remove_observer(token)
    }
}

/// An in-memory stand-in for a remote key-value store.
///
/// Local writes through [`RemoteStore::set_raw`] never notify listeners;
/// only [`MemoryRemoteStore::apply_external_change`] does, which is how a
/// change arriving from another device looks.
pub struct MemoryRemoteStore {
    data: RwLock<BTreeMap<String, RawValue>>,
    hub: ChangeHub,
    synchronize_calls: AtomicUsize,
    available: AtomicBool,
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        MemoryRemoteStore {
            data: RwLock::default(),
            hub: ChangeHub::new(),
            synchronize_calls: AtomicUsize::new(0),
            available: AtomicBool::new(true),
        }
    }
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a change pushed from elsewhere: store it and notify the
    /// external change listeners.
    pub fn apply_external_change(
        &self,
        identifier: &str,
        value: Option<RawValue>,
    ) -> Result<(), Error> {
        let (old, new) = {
            let mut data = write_lock(&self.data)?;
            let old = match value.clone() {
                Some(v) => data.insert(identifier.to_string(), v),
                None => data.remove(identifier),
            };
            (old, value)
        };
        log::debug!("external change to '{}'", identifier);
        self.hub.notify(identifier, old.as_ref(), new.as_ref());
        Ok(())
    }

    /// How many times `synchronize` has been requested.
    pub fn synchronize_count(&self) -> usize {
        self.synchronize_calls.load(Ordering::SeqCst)
    }

    /// While unavailable, `synchronize` reports `false`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn get_raw(&self, identifier: &str) -> Result<Option<RawValue>, Error> {
        Ok(read_lock(&self.data)?.get(identifier).cloned())
    }

    fn set_raw(&self, identifier: &str, value: Option<RawValue>) -> Result<(), Error> {
        let mut data = write_lock(&self.data)?;
        match value {
            Some(v) => data.insert(identifier.to_string(), v),
            None => data.remove(identifier),
        };
        Ok(())
    }

    fn identifiers(&self) -> Result<BTreeSet<String>, Error> {
        Ok(read_lock(&self.data)?.keys().cloned().collect())
    }

    fn synchronize(&self) -> Result<bool, Error> {
        self.synchronize_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.available.load(Ordering::SeqCst))
    }

    fn add_external_change_listener(
        &self,
        listener: ChangeListener,
    ) -> Result<ObserverToken, Error> {
        Ok(self.hub.add_listener(listener))
    }

    fn remove_observer(&self, token: ObserverToken) {
        self.hub.remove(token);
    }
}
