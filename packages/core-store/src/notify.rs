//! Change notification primitives shared by every store implementation.
//!
//! A store embeds a [`ChangeHub`] and calls [`ChangeHub::notify`] after each
//! write. Callbacks run synchronously on the writing thread, after the hub's
//! lock has been released, so a callback may freely call back into the store
//! or remove its own registration.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::RawValue;

/// Which parts of a change an observer wants delivered.
///
/// The default delivers both the old and the new value for real changes,
/// without an initial notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObserveOptions {
    /// Fire once immediately on subscribe with the current value.
    pub initial: bool,
    /// Include the value before the change.
    pub old: bool,
    /// Include the value after the change.
    pub new: bool,
}

impl ObserveOptions {
    /// Old and new values, no initial delivery.
    pub const OLD_NEW: ObserveOptions = ObserveOptions {
        initial: false,
        old: true,
        new: true,
    };

    /// Also fire immediately on subscribe.
    pub fn with_initial(mut self) -> Self {
        self.initial = true;
        self
    }
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self::OLD_NEW
    }
}

/// One raw change to one identifier, as delivered to an observer.
#[derive(Clone, Debug, PartialEq)]
pub struct Change {
    pub identifier: String,
    pub old: Option<RawValue>,
    pub new: Option<RawValue>,
    /// True for the synthetic notification fired on subscribe.
    pub is_initial: bool,
}

impl Change {
    /// The synthetic notification delivered on subscribe when
    /// [`ObserveOptions::initial`] is set.
    pub fn initial(identifier: &str, current: Option<RawValue>, options: ObserveOptions) -> Self {
        Change {
            identifier: identifier.to_string(),
            old: None,
            new: if options.new { current } else { None },
            is_initial: true,
        }
    }
}

/// Opaque handle for one registration in a store.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ObserverToken(u64);

impl ObserverToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Callback for changes to a single identifier.
pub type ChangeCallback = Arc<dyn Fn(&Change) + Send + Sync>;

/// Callback for "something in this store changed"; receives the identifier.
pub type ChangeListener = Arc<dyn Fn(&str) + Send + Sync>;

struct KeyObserver {
    identifier: String,
    options: ObserveOptions,
    callback: ChangeCallback,
}

#[derive(Default)]
struct HubState {
    next_token: u64,
    observers: BTreeMap<ObserverToken, KeyObserver>,
    listeners: BTreeMap<ObserverToken, ChangeListener>,
}

impl HubState {
    fn issue_token(&mut self) -> ObserverToken {
        self.next_token += 1;
        ObserverToken(self.next_token)
    }
}

/// Registry of per-key observers and store-wide listeners.
///
/// The token counter and both registries sit behind one mutex.
#[derive(Default)]
pub struct ChangeHub {
    state: Mutex<HubState>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        // Callbacks never run under this lock; the maps stay consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a callback for changes to `identifier`.
    pub fn add_observer(
        &self,
        identifier: &str,
        options: ObserveOptions,
        callback: ChangeCallback,
    ) -> ObserverToken {
        let mut state = self.lock();
        let token = state.issue_token();
        state.observers.insert(
            token,
            KeyObserver {
                identifier: identifier.to_string(),
                options,
                callback,
            },
        );
        token
    }

    /// Register a listener for changes to any identifier.
    pub fn add_listener(&self, listener: ChangeListener) -> ObserverToken {
        let mut state = self.lock();
        let token = state.issue_token();
        state.listeners.insert(token, listener);
        token
    }

    /// Remove a registration. Returns `false` for unknown or already removed
    /// tokens.
    pub fn remove(&self, token: ObserverToken) -> bool {
        let mut state = self.lock();
        state.observers.remove(&token).is_some() || state.listeners.remove(&token).is_some()
    }

    /// Number of per-key observers registered for `identifier`.
    pub fn observer_count(&self, identifier: &str) -> usize {
        self.lock()
            .observers
            .values()
            .filter(|o| o.identifier == identifier)
            .count()
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Fan a change out to the observers of `identifier`, then to every
    /// store-wide listener.
    pub fn notify(&self, identifier: &str, old: Option<&RawValue>, new: Option<&RawValue>) {
        let (observers, listeners) = {
            let state = self.lock();
            let observers: Vec<(ObserveOptions, ChangeCallback)> = state
                .observers
                .values()
                .filter(|o| o.identifier == identifier)
                .map(|o| (o.options, o.callback.clone()))
                .collect();
            let listeners: Vec<ChangeListener> = state.listeners.values().cloned().collect();
            (observers, listeners)
        };

        log::trace!(
            "change to '{}': {} observer(s), {} listener(s)",
            identifier,
            observers.len(),
            listeners.len()
        );

        for (options, callback) in observers {
            let change = Change {
                identifier: identifier.to_string(),
                old: if options.old { old.cloned() } else { None },
                new: if options.new { new.cloned() } else { None },
                is_initial: false,
            };
            callback(&change);
        }

        for listener in listeners {
            listener(identifier);
        }
    }
}
