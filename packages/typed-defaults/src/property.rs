//! Field-like handles bound to one key.

use std::sync::{Arc, Mutex, MutexGuard};

use typed_defaults_core::{DefaultsStore, ObserveOptions};

use crate::accessor::DefaultsAccess;
use crate::key::TypedKey;
use crate::observer::DefaultsObserver;

/// How a [`DefaultsProperty`] keeps its value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PropertyOptions {
    /// Serve reads from memory after the first one.
    pub cached: bool,
    /// Refresh the in-memory value on every change to the key.
    pub observed: bool,
}

impl PropertyOptions {
    pub const CACHED: PropertyOptions = PropertyOptions {
        cached: true,
        observed: false,
    };

    pub const CACHED_OBSERVED: PropertyOptions = PropertyOptions {
        cached: true,
        observed: true,
    };
}

type Cache<T> = Arc<Mutex<Option<T>>>;

fn lock<T>(cache: &Mutex<Option<T>>) -> MutexGuard<'_, Option<T>> {
    cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One key in one store, read and written like a field.
///
/// With [`PropertyOptions::cached`] the value is read from the store once and
/// then served from memory. Writes through the property update both. Add
/// [`PropertyOptions::observed`] to also pick up writes made elsewhere.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use typed_defaults::{DefaultsAccess, DefaultsProperty, Key, PropertyOptions};
/// use typed_defaults_json_store::MemoryStore;
///
/// let store = Arc::new(MemoryStore::new());
/// let key: Key<String> = Key::new("theme", "light".to_string());
/// let theme = DefaultsProperty::new(store.clone(), key.clone(), PropertyOptions::CACHED_OBSERVED);
///
/// assert_eq!(theme.get(), "light");
/// store.set(&key, "dark".to_string());
/// assert_eq!(theme.get(), "dark");
/// ```
pub struct DefaultsProperty<K, S>
where
    K: TypedKey,
    S: DefaultsStore + ?Sized,
{
    store: Arc<S>,
    key: K,
    options: PropertyOptions,
    cache: Cache<K::Output>,
    // Held for its Drop; disposing ends the refresh subscription.
    _observer: Option<DefaultsObserver<S>>,
}

impl<K, S> DefaultsProperty<K, S>
where
    K: TypedKey + Clone + Send + Sync + 'static,
    K::Output: Clone + Send,
    S: DefaultsStore + ?Sized,
{
    pub fn new(store: Arc<S>, key: K, options: PropertyOptions) -> Self {
        let cache: Cache<K::Output> = Arc::new(Mutex::new(None));

        let observer = options.observed.then(|| {
            let sink = cache.clone();
            let resolver = key.clone();
            DefaultsObserver::observe(
                store.clone(),
                &key,
                ObserveOptions::default(),
                move |update| {
                    *lock(&sink) = Some(resolver.resolve(update.new_value));
                },
            )
        });

        DefaultsProperty {
            store,
            key,
            options,
            cache,
            _observer: observer,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn get(&self) -> K::Output {
        if !self.options.cached {
            return self.store.get(&self.key);
        }

        let mut cache = lock(&self.cache);
        if let Some(value) = cache.as_ref() {
            return value.clone();
        }
        let value = self.store.get(&self.key);
        *cache = Some(value.clone());
        value
    }

    /// Write through to the store.
    ///
    /// The cache is refilled from the store afterwards, so a write the store
    /// did not take is not served from memory.
    pub fn set(&self, value: K::Output) {
        self.store.set(&self.key, value);
        if self.options.cached {
            *lock(&self.cache) = Some(self.store.get(&self.key));
        }
    }
}
