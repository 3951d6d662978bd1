//! Shared bookkeeping for local stores: persisted entries, the registration
//! domain, and the change hub.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use typed_defaults_core::{
    Change, ChangeCallback, ChangeHub, ChangeListener, Error, ObserveOptions, ObserverToken,
    RawValue,
};

pub(crate) type Entries = BTreeMap<String, RawValue>;

#[derive(Default)]
pub(crate) struct Domain {
    entries: RwLock<Entries>,
    registered: RwLock<Entries>,
    hub: ChangeHub,
}

pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, Error> {
    lock.read()
        .map_err(|_| Error::backend("store lock poisoned"))
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, Error> {
    lock.write()
        .map_err(|_| Error::backend("store lock poisoned"))
}

impl Domain {
    pub fn with_entries(entries: Entries) -> Self {
        Domain {
            entries: RwLock::new(entries),
            ..Default::default()
        }
    }

    pub fn entries(&self) -> &RwLock<Entries> {
        &self.entries
    }

    pub fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    pub fn get(&self, identifier: &str) -> Result<Option<RawValue>, Error> {
        if let Some(value) = read_lock(&self.entries)?.get(identifier) {
            return Ok(Some(value.clone()));
        }
        Ok(read_lock(&self.registered)?.get(identifier).cloned())
    }

    /// Apply a write, run `persist` on the new entry set while still holding
    /// the lock, and notify once the lock is released.
    ///
    /// If `persist` fails the write is rolled back and nobody is notified.
    pub fn set<F>(&self, identifier: &str, value: Option<RawValue>, persist: F) -> Result<(), Error>
    where
        F: FnOnce(&Entries) -> Result<(), Error>,
    {
        // Observers see the effective value, registered defaults included.
        let registered = read_lock(&self.registered)?.get(identifier).cloned();

        let (old, new) = {
            let mut entries = write_lock(&self.entries)?;
            let previous = match value.clone() {
                Some(v) => entries.insert(identifier.to_string(), v),
                None => entries.remove(identifier),
            };

            if let Err(e) = persist(&entries) {
                match previous {
                    Some(p) => entries.insert(identifier.to_string(), p),
                    None => entries.remove(identifier),
                };
                return Err(e);
            }

            (
                previous.or_else(|| registered.clone()),
                value.or(registered),
            )
        };

        self.hub.notify(identifier, old.as_ref(), new.as_ref());
        Ok(())
    }

    pub fn identifiers(&self) -> Result<BTreeSet<String>, Error> {
        Ok(read_lock(&self.entries)?.keys().cloned().collect())
    }

    pub fn register(&self, defaults: Entries) -> Result<(), Error> {
        write_lock(&self.registered)?.extend(defaults);
        Ok(())
    }

    pub fn add_observer(
        &self,
        identifier: &str,
        options: ObserveOptions,
        callback: ChangeCallback,
    ) -> Result<ObserverToken, Error> {
        let token = self.hub.add_observer(identifier, options, callback.clone());
        if options.initial {
            callback(&Change::initial(identifier, self.get(identifier)?, options));
        }
        Ok(token)
    }

    pub fn add_listener(&self, listener: ChangeListener) -> ObserverToken {
        self.hub.add_listener(listener)
    }

    pub fn remove_observer(&self, token: ObserverToken) {
        if !self.hub.remove(token) {
            log::trace!("ignoring unknown observer token {}", token.id());
        }
    }
}
