//! The adapter binds a store to a key namespace.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use typed_defaults_core::{DefaultsStore, ObserveOptions, RemoteStore};

use crate::accessor::DefaultsAccess;
use crate::key::{AnyKey, TypedKey};
use crate::observer::{DefaultsObserver, Update};
use crate::publisher::DefaultsPublisher;
use crate::syncer::DefaultsSyncer;

/// A store plus a struct of declared keys.
///
/// Keys can be passed directly or picked from the namespace with a closure,
/// which keeps call sites short and checked at compile time:
///
/// ```rust
/// use std::sync::Arc;
/// use typed_defaults::{define_keys, DefaultsAdapter};
/// use typed_defaults_json_store::MemoryStore;
///
/// define_keys! {
///     pub struct AppKeys {
///         launch_count: Key<i64> = "launchCount",
///         username: OptionalKey<String> = "username",
///     }
/// }
///
/// let defaults = DefaultsAdapter::new(Arc::new(MemoryStore::new()), AppKeys::default());
///
/// defaults.set_with(|k| &k.launch_count, 1);
/// assert_eq!(defaults.get_with(|k| &k.launch_count), 1);
/// assert_eq!(defaults.get_with(|k| &k.username), None);
/// ```
pub struct DefaultsAdapter<K, S: DefaultsStore + ?Sized + 'static> {
    store: Arc<S>,
    keys: K,
    syncer: Option<DefaultsSyncer<S, dyn RemoteStore>>,
}

impl<K, S: DefaultsStore + ?Sized + 'static> DefaultsAdapter<K, S> {
    pub fn new(store: Arc<S>, keys: K) -> Self {
        DefaultsAdapter {
            store,
            keys,
            syncer: None,
        }
    }

    /// Mirror keys to `remote` once [`start_syncing`](Self::start_syncing)
    /// selects them.
    pub fn with_syncer(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.syncer = Some(DefaultsSyncer::new(self.store.clone(), remote));
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn keys(&self) -> &K {
        &self.keys
    }

    pub fn get<T: TypedKey>(&self, key: &T) -> T::Output {
        self.store.get(key)
    }

    pub fn set<T: TypedKey>(&self, key: &T, value: T::Output) {
        self.store.set(key, value)
    }

    pub fn get_with<T, F>(&self, pick: F) -> T::Output
    where
        T: TypedKey,
        F: FnOnce(&K) -> &T,
    {
        self.get(pick(&self.keys))
    }

    pub fn set_with<T, F>(&self, pick: F, value: T::Output)
    where
        T: TypedKey,
        F: FnOnce(&K) -> &T,
    {
        self.set(pick(&self.keys), value)
    }

    /// Whether the store holds an entry for `key`. Declared defaults do not
    /// count; registered ones do.
    pub fn has_key<T: AnyKey + ?Sized>(&self, key: &T) -> bool {
        self.store.has_key(key)
    }

    pub fn has_key_with<T, F>(&self, pick: F) -> bool
    where
        T: AnyKey + ?Sized,
        F: FnOnce(&K) -> &T,
    {
        self.has_key(pick(&self.keys))
    }

    pub fn remove<T: AnyKey + ?Sized>(&self, key: &T) {
        self.store.remove(key)
    }

    pub fn remove_with<T, F>(&self, pick: F)
    where
        T: AnyKey + ?Sized,
        F: FnOnce(&K) -> &T,
    {
        self.remove(pick(&self.keys))
    }

    /// Remove every persisted entry in the store.
    ///
    /// This is not limited to the keys of this namespace: entries written
    /// by other code sharing the store are removed too.
    pub fn remove_all(&self) {
        self.store.remove_all()
    }

    /// Subscribe `handler` to changes of `key`. See [`DefaultsObserver`].
    pub fn observe<T, F>(&self, key: &T, options: ObserveOptions, handler: F) -> DefaultsObserver<S>
    where
        T: TypedKey + Clone + Send + Sync + 'static,
        F: Fn(Update<T::Value>) + Send + Sync + 'static,
    {
        DefaultsObserver::observe(self.store.clone(), key, options, handler)
    }

    pub fn observe_with<T, P, F>(
        &self,
        pick: P,
        options: ObserveOptions,
        handler: F,
    ) -> DefaultsObserver<S>
    where
        T: TypedKey + Clone + Send + Sync + 'static,
        P: FnOnce(&K) -> &T,
        F: Fn(Update<T::Value>) + Send + Sync + 'static,
    {
        self.observe(pick(&self.keys), options, handler)
    }

    /// Publish every new value of `key` as a stream. See
    /// [`DefaultsPublisher`].
    pub fn publisher<T>(&self, key: &T, options: ObserveOptions) -> DefaultsPublisher<T::Output, S>
    where
        T: TypedKey + Clone + Send + Sync + 'static,
        T::Output: Send + 'static,
    {
        DefaultsPublisher::new(self.store.clone(), key, options)
    }

    pub fn publisher_with<T, P>(
        &self,
        pick: P,
        options: ObserveOptions,
    ) -> DefaultsPublisher<T::Output, S>
    where
        T: TypedKey + Clone + Send + Sync + 'static,
        T::Output: Send + 'static,
        P: FnOnce(&K) -> &T,
    {
        self.publisher(pick(&self.keys), options)
    }

    /// Seed the store's registration domain with the defaults of `keys`.
    ///
    /// Keys without a default (optional keys declared without one) are
    /// skipped. Registered values are never persisted.
    pub fn register_defaults(&self, keys: &[&dyn AnyKey]) {
        let defaults: BTreeMap<String, _> = keys
            .iter()
            .filter_map(|key| {
                key.default_raw()
                    .map(|raw| (key.identifier().to_string(), raw))
            })
            .collect();

        log::debug!("registering {} default(s)", defaults.len());
        if let Err(e) = self.store.register_defaults(defaults) {
            log::warn!("Failed to register defaults: {}", e);
        }
    }

    /// Start mirroring `keys` to the remote store.
    pub fn start_syncing(&self, keys: &[&dyn AnyKey]) {
        match &self.syncer {
            Some(syncer) => syncer.sync(keys),
            None => log::warn!("start_syncing called on an adapter without a remote store"),
        }
    }

    pub fn stop_syncing(&self, keys: &[&dyn AnyKey]) {
        if let Some(syncer) = &self.syncer {
            syncer.unsync(keys);
        }
    }

    pub fn stop_syncing_all(&self) {
        if let Some(syncer) = &self.syncer {
            syncer.unsync_all();
        }
    }

    pub fn synced_identifiers(&self) -> BTreeSet<String> {
        self.syncer
            .as_ref()
            .map(DefaultsSyncer::synced_identifiers)
            .unwrap_or_default()
    }
}

impl<K: fmt::Debug, S: DefaultsStore + ?Sized + 'static> fmt::Debug for DefaultsAdapter<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultsAdapter")
            .field("keys", &self.keys)
            .field("syncer", &self.syncer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{Key, OptionalKey};
    use futures::executor::block_on_stream;
    use std::sync::Mutex;
    use typed_defaults_core::RawValue;
    use typed_defaults_json_store::{MemoryRemoteStore, MemoryStore};

    #[derive(Debug)]
    struct Keys {
        count: Key<i64>,
        name: OptionalKey<String>,
        volume: OptionalKey<f64>,
    }

    impl Default for Keys {
        fn default() -> Self {
            Keys {
                count: Key::with_type_default("count"),
                name: OptionalKey::new("name"),
                volume: OptionalKey::with_default("volume", 0.5),
            }
        }
    }

    fn adapter() -> DefaultsAdapter<Keys, MemoryStore> {
        DefaultsAdapter::new(Arc::new(MemoryStore::new()), Keys::default())
    }

    #[test]
    fn picked_access() {
        let defaults = adapter();
        assert_eq!(defaults.get_with(|k| &k.count), 0);
        defaults.set_with(|k| &k.count, 4);
        assert_eq!(defaults.get(&defaults.keys().count), 4);
        assert!(defaults.has_key_with(|k| &k.count));

        defaults.remove_with(|k| &k.count);
        assert!(!defaults.has_key_with(|k| &k.count));
    }

    #[test]
    fn register_defaults_skips_keys_without_one() {
        let defaults = adapter();
        let keys = defaults.keys();
        defaults.register_defaults(&[&keys.count, &keys.name, &keys.volume]);

        assert!(defaults.has_key(&keys.count));
        assert!(!defaults.has_key(&keys.name));
        assert_eq!(
            defaults.store().get_raw("volume").unwrap(),
            Some(RawValue::Float(0.5))
        );
        assert!(defaults.store().identifiers().unwrap().is_empty());
    }

    #[test]
    fn observe_through_adapter() {
        let defaults = adapter();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _observer = defaults.observe_with(
            |k| &k.name,
            ObserveOptions::default(),
            move |update| sink.lock().unwrap().push(update.new_value),
        );

        defaults.set_with(|k| &k.name, Some("frog".to_string()));
        assert_eq!(*seen.lock().unwrap(), vec![Some("frog".to_string())]);
    }

    #[test]
    fn publish_through_adapter() {
        let defaults = adapter();
        let mut volumes = defaults.publisher_with(|k| &k.volume, ObserveOptions::default());

        defaults.set_with(|k| &k.volume, Some(0.8));
        defaults.remove_with(|k| &k.volume);

        let seen: Vec<Option<f64>> = block_on_stream(&mut volumes).take(2).collect();
        assert_eq!(seen, vec![Some(0.8), Some(0.5)]);

        drop(volumes);
        assert_eq!(defaults.store().observer_count("volume"), 0);
    }

    #[test]
    fn syncing_requires_a_remote() {
        let defaults = adapter();
        defaults.start_syncing(&[&defaults.keys().count]);
        assert!(defaults.synced_identifiers().is_empty());
    }

    #[test]
    fn syncing_with_remote() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let defaults = adapter().with_syncer(remote.clone());
        let keys = defaults.keys();

        defaults.start_syncing(&[&keys.count, &keys.name]);
        assert_eq!(defaults.synced_identifiers().len(), 2);

        defaults.set(&keys.count, 9);
        assert_eq!(remote.get_raw("count").unwrap(), Some(RawValue::Integer(9)));

        defaults.stop_syncing(&[&keys.name]);
        assert_eq!(
            defaults.synced_identifiers(),
            BTreeSet::from(["count".to_string()])
        );

        defaults.stop_syncing_all();
        assert!(defaults.synced_identifiers().is_empty());
    }

    #[test]
    fn remove_all_through_adapter() {
        let defaults = adapter();
        defaults.set_with(|k| &k.count, 1);
        defaults.store().set_raw("other", Some(RawValue::Bool(true))).unwrap();
        defaults.remove_all();
        assert!(defaults.store().identifiers().unwrap().is_empty());
    }
}
