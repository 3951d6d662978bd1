//! Typed change observation.

use std::fmt;
use std::sync::{Arc, Mutex};

use typed_defaults_core::{Change, ChangeCallback, DefaultsStore, ObserveOptions, ObserverToken};

use crate::bridge::DefaultsBridge;
use crate::key::TypedKey;

/// One typed change notification.
///
/// Missing or undecodable payloads fall back to the key's default, so for a
/// [`Key`](crate::Key) both values are always `Some` (unless the options
/// excluded them and the key has no default to fall back to).
#[derive(Clone, Debug, PartialEq)]
pub struct Update<T> {
    pub identifier: String,
    pub old_value: Option<T>,
    pub new_value: Option<T>,
    /// True for the notification delivered on subscribe.
    pub is_initial: bool,
}

/// A handle that can end a subscription.
pub trait Disposable: Send + Sync {
    /// End the subscription. Calling this more than once is a no-op.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

/// A live subscription to one key.
///
/// Dropping the observer disposes it.
///
/// # Example
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use typed_defaults::{DefaultsAccess, DefaultsObserver, Disposable, Key, ObserveOptions};
/// use typed_defaults_json_store::MemoryStore;
///
/// let store = Arc::new(MemoryStore::new());
/// let key: Key<i64> = Key::with_type_default("launchCount");
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let sink = seen.clone();
/// let observer = DefaultsObserver::observe(store.clone(), &key, ObserveOptions::default(), move |update| {
///     sink.lock().unwrap().push((update.old_value, update.new_value));
/// });
///
/// store.set(&key, 5);
/// observer.dispose();
/// store.set(&key, 6);
///
/// assert_eq!(*seen.lock().unwrap(), vec![(Some(0), Some(5))]);
/// ```
pub struct DefaultsObserver<S: DefaultsStore + ?Sized> {
    store: Arc<S>,
    identifier: String,
    token: Mutex<Option<ObserverToken>>,
}

impl<S: DefaultsStore + ?Sized> DefaultsObserver<S> {
    /// Subscribe `handler` to changes of `key` in `store`.
    ///
    /// If the store refuses the registration the failure is logged and the
    /// returned observer is already disposed.
    pub fn observe<K, F>(store: Arc<S>, key: &K, options: ObserveOptions, handler: F) -> Self
    where
        K: TypedKey + Clone + Send + Sync + 'static,
        F: Fn(Update<K::Value>) + Send + Sync + 'static,
    {
        let identifier = key.identifier().to_string();
        let key = key.clone();

        let callback: ChangeCallback = Arc::new(move |change: &Change| {
            handler(typed_update(&key, change));
        });

        let token = match store.add_observer(&identifier, options, callback) {
            Ok(token) => Some(token),
            Err(e) => {
                log::warn!("Failed to observe '{}': {}", identifier, e);
                None
            }
        };

        DefaultsObserver {
            store,
            identifier,
            token: Mutex::new(token),
        }
    }

    /// The identifier this observer watches.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

fn typed_update<K: TypedKey>(key: &K, change: &Change) -> Update<K::Value> {
    let decode = |raw: Option<&typed_defaults_core::RawValue>| {
        key.fallback(raw.and_then(K::Value::deserialize))
    };

    Update {
        identifier: change.identifier.clone(),
        old_value: decode(change.old.as_ref()),
        new_value: decode(change.new.as_ref()),
        is_initial: change.is_initial,
    }
}

impl<S: DefaultsStore + ?Sized> Disposable for DefaultsObserver<S> {
    fn dispose(&self) {
        let token = self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(token) = token {
            log::trace!("disposing observer of '{}'", self.identifier);
            self.store.remove_observer(token);
        }
    }

    fn is_disposed(&self) -> bool {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }
}

impl<S: DefaultsStore + ?Sized> Drop for DefaultsObserver<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<S: DefaultsStore + ?Sized> fmt::Debug for DefaultsObserver<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultsObserver")
            .field("identifier", &self.identifier)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::DefaultsAccess;
    use crate::key::{Key, OptionalKey};
    use typed_defaults_core::RawValue;
    use typed_defaults_json_store::MemoryStore;

    type Seen<T> = Arc<Mutex<Vec<Update<T>>>>;

    fn observe<K>(
        store: &Arc<MemoryStore>,
        key: &K,
        options: ObserveOptions,
    ) -> (DefaultsObserver<MemoryStore>, Seen<K::Value>)
    where
        K: TypedKey + Clone + Send + Sync + 'static,
        K::Value: Send + 'static,
    {
        let seen: Seen<K::Value> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer = DefaultsObserver::observe(store.clone(), key, options, move |update| {
            sink.lock().unwrap().push(update);
        });
        (observer, seen)
    }

    #[test]
    fn old_value_falls_back_to_default() {
        let store = Arc::new(MemoryStore::new());
        let key: Key<i64> = Key::with_type_default("count");
        let (_observer, seen) = observe(&store, &key, ObserveOptions::default());

        store.set(&key, 5);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].old_value, Some(0));
        assert_eq!(seen[0].new_value, Some(5));
        assert!(!seen[0].is_initial);
    }

    #[test]
    fn optional_key_without_default_reports_none() {
        let store = Arc::new(MemoryStore::new());
        let key: OptionalKey<String> = OptionalKey::new("nickname");
        let (_observer, seen) = observe(&store, &key, ObserveOptions::default());

        store.set(&key, Some("frog".to_string()));
        store.set(&key, None);

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].old_value, None);
        assert_eq!(seen[0].new_value, Some("frog".to_string()));
        assert_eq!(seen[1].new_value, None);
    }

    #[test]
    fn undecodable_payload_falls_back() {
        let store = Arc::new(MemoryStore::new());
        let key = Key::new("count", 9i64);
        let (_observer, seen) = observe(&store, &key, ObserveOptions::default());

        store.set_raw("count", Some(RawValue::from("lots"))).unwrap();
        assert_eq!(seen.lock().unwrap()[0].new_value, Some(9));
    }

    #[test]
    fn initial_delivery() {
        let store = Arc::new(MemoryStore::new());
        let key: Key<i64> = Key::with_type_default("count");
        store.set(&key, 3);

        let (_observer, seen) = observe(&store, &key, ObserveOptions::default().with_initial());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].is_initial);
        assert_eq!(seen[0].new_value, Some(3));
    }

    #[test]
    fn dispose_is_idempotent_and_isolated() {
        let store = Arc::new(MemoryStore::new());
        let key: Key<i64> = Key::with_type_default("count");
        let (first, first_seen) = observe(&store, &key, ObserveOptions::default());
        let (_second, second_seen) = observe(&store, &key, ObserveOptions::default());

        first.dispose();
        first.dispose();
        assert!(first.is_disposed());
        drop(first);

        store.set(&key, 1);
        assert!(first_seen.lock().unwrap().is_empty());
        assert_eq!(second_seen.lock().unwrap().len(), 1);
        assert_eq!(store.observer_count("count"), 1);
    }

    #[test]
    fn drop_disposes() {
        let store = Arc::new(MemoryStore::new());
        let key: Key<bool> = Key::with_type_default("flag");
        {
            let (_observer, _seen) = observe(&store, &key, ObserveOptions::default());
            assert_eq!(store.observer_count("flag"), 1);
        }
        assert_eq!(store.observer_count("flag"), 0);
    }

    #[test]
    fn boxed_disposables() {
        let store = Arc::new(MemoryStore::new());
        let a: Key<i64> = Key::with_type_default("a");
        let b: Key<String> = Key::with_type_default("b");
        let (oa, _) = observe(&store, &a, ObserveOptions::default());
        let (ob, _) = observe(&store, &b, ObserveOptions::default());

        let handles: Vec<Box<dyn Disposable>> = vec![Box::new(oa), Box::new(ob)];
        for handle in &handles {
            handle.dispose();
        }
        assert_eq!(store.observer_count("a"), 0);
        assert_eq!(store.observer_count("b"), 0);
    }
}
