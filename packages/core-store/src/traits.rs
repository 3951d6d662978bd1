//! Store collaborator traits: DefaultsStore and RemoteStore.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::{ChangeCallback, ChangeListener, Error, ObserveOptions, ObserverToken, RawValue};

/// A local key-value preferences store.
///
/// This is the untyped collaborator the typed layer is built on. Identifiers
/// are literal store keys; values are [`RawValue`]s. Implementations use
/// interior mutability so a single `Arc` can be shared between adapters,
/// observers and a syncer.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Arc<dyn DefaultsStore>`.
pub trait DefaultsStore: Send + Sync {
    /// Read the value stored for `identifier`.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - Nothing is stored and no default was registered.
    /// * `Ok(Some(value))` - The persisted value, else the registered default.
    /// * `Err(Error)` - The store failed.
    fn get_raw(&self, identifier: &str) -> Result<Option<RawValue>, Error>;

    /// Store `value` for `identifier`; `None` removes the entry.
    ///
    /// Observers of `identifier` and store-wide listeners are notified after
    /// the write is visible to readers.
    fn set_raw(&self, identifier: &str, value: Option<RawValue>) -> Result<(), Error>;

    /// Remove the persisted entry for `identifier`.
    fn remove_raw(&self, identifier: &str) -> Result<(), Error> {
        self.set_raw(identifier, None)
    }

    /// Identifiers with a persisted entry. Registered defaults are not listed.
    fn identifiers(&self) -> Result<BTreeSet<String>, Error>;

    /// Seed in-memory fallback values. They are never persisted and are
    /// shadowed by any persisted entry.
    fn register_defaults(&self, defaults: BTreeMap<String, RawValue>) -> Result<(), Error>;

    /// Observe changes to one identifier.
    ///
    /// With [`ObserveOptions::initial`] the callback fires once before this
    /// method returns, carrying the current value.
    fn add_observer(
        &self,
        identifier: &str,
        options: ObserveOptions,
        callback: ChangeCallback,
    ) -> Result<ObserverToken, Error>;

    /// Observe every change to this store.
    fn add_change_listener(&self, listener: ChangeListener) -> Result<ObserverToken, Error>;

    /// Drop a registration. Unknown tokens are ignored.
    fn remove_observer(&self, token: ObserverToken);
}

/// A remote key-value store that a subset of local keys is mirrored to.
///
/// Writes are local until [`RemoteStore::synchronize`] is requested. The
/// external change listener only fires for changes that arrived from
/// elsewhere, never for this process's own `set_raw` calls.
pub trait RemoteStore: Send + Sync {
    fn get_raw(&self, identifier: &str) -> Result<Option<RawValue>, Error>;

    /// Store `value` for `identifier`; `None` removes the entry.
    fn set_raw(&self, identifier: &str, value: Option<RawValue>) -> Result<(), Error>;

    fn identifiers(&self) -> Result<BTreeSet<String>, Error>;

    /// Request that pending writes be pushed to the remote side.
    ///
    /// Returns whether the request was accepted.
    fn synchronize(&self) -> Result<bool, Error>;

    /// Observe changes pushed from elsewhere; receives the changed identifier.
    fn add_external_change_listener(
        &self,
        listener: ChangeListener,
    ) -> Result<ObserverToken, Error>;

    /// Drop a registration. Unknown tokens are ignored.
    fn remove_observer(&self, token: ObserverToken);
}

// Blanket implementations for references, boxes and shared handles

macro_rules! forward_defaults_store {
    ($($wrapper:ty),+) => {$(
        impl<T: DefaultsStore + ?Sized> DefaultsStore for $wrapper {
            fn get_raw(&self, identifier: &str) -> Result<Option<RawValue>, Error> {
                (**self).get_raw(identifier)
            }

            fn set_raw(&self, identifier: &str, value: Option<RawValue>) -> Result<(), Error> {
                (**self).set_raw(identifier, value)
            }

            fn remove_raw(&self, identifier: &str) -> Result<(), Error> {
                (**self).remove_raw(identifier)
            }

            fn identifiers(&self) -> Result<BTreeSet<String>, Error> {
                (**self).identifiers()
            }

            fn register_defaults(&self, defaults: BTreeMap<String, RawValue>) -> Result<(), Error> {
                (**self).register_defaults(defaults)
            }

            fn add_observer(
                &self,
                identifier: &str,
                options: ObserveOptions,
                callback: ChangeCallback,
            ) -> Result<ObserverToken, Error> {
                (**self).add_observer(identifier, options, callback)
            }

            fn add_change_listener(&self, listener: ChangeListener) -> Result<ObserverToken, Error> {
                (**self).add_change_listener(listener)
            }

            fn remove_observer(&self, token: ObserverToken) {
                (**self).remove_observer(token)
            }
        }
    )+};
}

forward_defaults_store!(&T, Box<T>, Arc<T>);

macro_rules! forward_remote_store {
    ($($wrapper:ty),+) => {$(
        impl<T: RemoteStore + ?Sized> RemoteStore for $wrapper {
            fn get_raw(&self, identifier: &str) -> Result<Option<RawValue>, Error> {
                (**self).get_raw(identifier)
            }

            fn set_raw(&self, identifier: &str, value: Option<RawValue>) -> Result<(), Error> {
                (**self).set_raw(identifier, value)
            }

            fn identifiers(&self) -> Result<BTreeSet<String>, Error> {
                (**self).identifiers()
            }

            fn synchronize(&self) -> Result<bool, Error> {
                (**self).synchronize()
            }

            fn add_external_change_listener(
                &self,
                listener: ChangeListener,
            ) -> Result<ObserverToken, Error> {
                (**self).add_external_change_listener(listener)
            }

            fn remove_observer(&self, token: ObserverToken) {
                (**self).remove_observer(token)
            }
        }
    )+};
}

forward_remote_store!(&T, Box<T>, Arc<T>);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Change, ChangeHub};
    use std::sync::RwLock;

    /// Simple in-memory store for testing.
    #[derive(Default)]
    struct TestStore {
        data: RwLock<BTreeMap<String, RawValue>>,
        registered: RwLock<BTreeMap<String, RawValue>>,
        hub: ChangeHub,
    }

    impl DefaultsStore for TestStore {
        fn get_raw(&self, identifier: &str) -> Result<Option<RawValue>, Error> {
            if let Some(value) = self.data.read().unwrap().get(identifier) {
                return Ok(Some(value.clone()));
            }
            Ok(self.registered.read().unwrap().get(identifier).cloned())
        }

        fn set_raw(&self, identifier: &str, value: Option<RawValue>) -> Result<(), Error> {
            let old = {
                let mut data = self.data.write().unwrap();
                match value.clone() {
                    Some(v) => data.insert(identifier.to_string(), v),
                    None => data.remove(identifier),
                }
            };
            self.hub.notify(identifier, old.as_ref(), value.as_ref());
            Ok(())
        }

        fn identifiers(&self) -> Result<BTreeSet<String>, Error> {
            Ok(self.data.read().unwrap().keys().cloned().collect())
        }

        fn register_defaults(&self, defaults: BTreeMap<String, RawValue>) -> Result<(), Error> {
            self.registered.write().unwrap().extend(defaults);
            Ok(())
        }

        fn add_observer(
            &self,
            identifier: &str,
            options: ObserveOptions,
            callback: ChangeCallback,
        ) -> Result<ObserverToken, Error> {
            let token = self.hub.add_observer(identifier, options, callback.clone());
            if options.initial {
                callback(&Change::initial(identifier, self.get_raw(identifier)?, options));
            }
            Ok(token)
        }

        fn add_change_listener(&self, listener: ChangeListener) -> Result<ObserverToken, Error> {
            Ok(self.hub.add_listener(listener))
        }

        fn remove_observer(&self, token: ObserverToken) {
            self.hub.remove(token);
        }
    }

    #[test]
    fn basic_store_works() {
        let store = TestStore::default();
        store.set_raw("name", Some(RawValue::from("Alice"))).unwrap();
        assert_eq!(store.get_raw("name").unwrap(), Some(RawValue::from("Alice")));

        store.remove_raw("name").unwrap();
        assert_eq!(store.get_raw("name").unwrap(), None);
    }

    #[test]
    fn registered_defaults_are_shadowed_and_not_listed() {
        let store = TestStore::default();
        store
            .register_defaults(BTreeMap::from([("k".to_string(), RawValue::Integer(1))]))
            .unwrap();
        assert_eq!(store.get_raw("k").unwrap(), Some(RawValue::Integer(1)));
        assert!(store.identifiers().unwrap().is_empty());

        store.set_raw("k", Some(RawValue::Integer(2))).unwrap();
        assert_eq!(store.get_raw("k").unwrap(), Some(RawValue::Integer(2)));
    }

    #[test]
    fn object_safety_works() {
        let store: Arc<dyn DefaultsStore> = Arc::new(TestStore::default());
        store.set_raw("test", Some(RawValue::Bool(true))).unwrap();
        assert_eq!(store.get_raw("test").unwrap(), Some(RawValue::Bool(true)));
    }

    #[test]
    fn ref_and_box_forward() {
        let store = TestStore::default();
        let by_ref: &TestStore = &store;
        DefaultsStore::set_raw(&by_ref, "a", Some(RawValue::Integer(1))).unwrap();

        let boxed: Box<dyn DefaultsStore> = Box::new(store);
        assert_eq!(boxed.get_raw("a").unwrap(), Some(RawValue::Integer(1)));
        assert_eq!(boxed.identifiers().unwrap().len(), 1);
    }
}
