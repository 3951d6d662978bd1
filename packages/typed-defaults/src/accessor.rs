//! Typed reads and writes on any [`DefaultsStore`].

use typed_defaults_core::DefaultsStore;

use crate::bridge::DefaultsBridge;
use crate::key::{AnyKey, TypedKey};

/// Typed accessors for every [`DefaultsStore`].
///
/// Reads go through the key's bridge and then its default chain; writes go
/// through the bridge, with `None` removing the entry. Every method is
/// total: store failures are logged and reads resolve to defaults.
///
/// # Example
///
/// ```rust
/// use typed_defaults::{DefaultsAccess, Key, OptionalKey};
/// use typed_defaults_json_store::MemoryStore;
///
/// let store = MemoryStore::new();
/// let launch_count: Key<i64> = Key::with_type_default("launchCount");
/// let nickname: OptionalKey<String> = OptionalKey::new("nickname");
///
/// assert_eq!(store.get(&launch_count), 0);
/// store.set(&launch_count, 3);
/// assert_eq!(store.get(&launch_count), 3);
///
/// store.set(&nickname, Some("frog".to_string()));
/// store.set(&nickname, None);
/// assert!(!store.has_key(&nickname));
/// ```
pub trait DefaultsAccess: DefaultsStore {
    /// Read `key`, falling back to its default.
    fn get<K: TypedKey>(&self, key: &K) -> K::Output {
        key.resolve(K::Value::get(self, key.identifier()))
    }

    /// Write `value` for `key`. For optional keys `None` removes the entry.
    fn set<K: TypedKey>(&self, key: &K, value: K::Output) {
        K::Value::save(self, key.identifier(), K::stored(&value))
    }

    /// Whether the store holds an entry for `key`.
    ///
    /// Registered defaults count; a key's declared default does not.
    fn has_key<K: AnyKey + ?Sized>(&self, key: &K) -> bool {
        match self.get_raw(key.identifier()) {
            Ok(raw) => raw.is_some(),
            Err(e) => {
                log::warn!("Failed to read '{}': {}", key.identifier(), e);
                false
            }
        }
    }

    /// Remove the persisted entry for `key`; reads return its default again.
    fn remove<K: AnyKey + ?Sized>(&self, key: &K) {
        if let Err(e) = self.remove_raw(key.identifier()) {
            log::warn!("Failed to remove '{}': {}", key.identifier(), e);
        }
    }

    /// Remove every persisted entry in the store, including entries no
    /// declared key refers to.
    fn remove_all(&self) {
        let identifiers = match self.identifiers() {
            Ok(identifiers) => identifiers,
            Err(e) => {
                log::warn!("Failed to list identifiers: {}", e);
                return;
            }
        };

        for identifier in identifiers {
            if let Err(e) = self.remove_raw(&identifier) {
                log::warn!("Failed to remove '{}': {}", identifier, e);
            }
        }
    }
}

impl<S: DefaultsStore + ?Sized> DefaultsAccess for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{Key, OptionalKey};
    use std::collections::BTreeMap;
    use typed_defaults_core::RawValue;
    use typed_defaults_json_store::MemoryStore;

    #[test]
    fn reads_fall_back_to_default() {
        let store = MemoryStore::new();
        let key = Key::new("volume", 0.5f64);
        assert_eq!(store.get(&key), 0.5);
        assert!(!store.has_key(&key));
    }

    #[test]
    fn mistyped_value_falls_back() {
        let store = MemoryStore::new();
        store.set_raw("count", Some(RawValue::from("many"))).unwrap();
        assert_eq!(store.get(&Key::new("count", 7i64)), 7);
    }

    #[test]
    fn set_then_remove_resets() {
        let store = MemoryStore::new();
        let key = Key::new("name", "default".to_string());
        store.set(&key, "frog".to_string());
        assert_eq!(store.get(&key), "frog");
        assert!(store.has_key(&key));

        store.remove(&key);
        assert_eq!(store.get(&key), "default");
        assert!(!store.has_key(&key));
    }

    #[test]
    fn optional_none_removes() {
        let store = MemoryStore::new();
        let key: OptionalKey<i64> = OptionalKey::new("n");
        store.set(&key, Some(1));
        assert_eq!(store.get(&key), Some(1));
        store.set(&key, None);
        assert_eq!(store.get(&key), None);
        assert!(store.identifiers().unwrap().is_empty());
    }

    #[test]
    fn registered_defaults_count_for_has_key() {
        let store = MemoryStore::new();
        let mut defaults = BTreeMap::new();
        defaults.insert("seen".to_string(), RawValue::Bool(true));
        store.register_defaults(defaults).unwrap();

        let key: Key<bool> = Key::with_type_default("seen");
        assert!(store.has_key(&key));
        assert!(store.get(&key));
    }

    #[test]
    fn remove_all_clears_undeclared_entries() {
        let store = MemoryStore::new();
        store.set(&Key::new("a", 0i64), 1);
        store.set_raw("stray", Some(RawValue::Integer(2))).unwrap();

        store.remove_all();
        assert!(store.identifiers().unwrap().is_empty());
    }

    #[test]
    fn works_through_trait_objects() {
        let store: Box<dyn DefaultsStore> = Box::new(MemoryStore::new());
        let key = Key::new("k", 1u32);
        store.set(&key, 4);
        assert_eq!(store.get(&key), 4);
    }
}
