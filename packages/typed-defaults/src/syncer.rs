//! Mirroring a chosen set of keys between a local and a remote store.
//!
//! - A change pushed from the remote side copies every synced identifier
//!   present remotely into the local store. Local changes seen while a pull
//!   is in progress are not pushed, so those writes are not echoed back.
//! - Any local change copies every synced identifier to the remote store
//!   (absent locally means removed remotely) and asks it to synchronize.
//! - Changing the synced set pulls the current set from the remote store.
//!
//! Failures are logged and never retried.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use typed_defaults_core::{ChangeListener, DefaultsStore, ObserverToken, RemoteStore};

use crate::key::AnyKey;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct SyncState<L: DefaultsStore + ?Sized + 'static, R: RemoteStore + ?Sized + 'static> {
    this: Weak<SyncState<L, R>>,
    local: Arc<L>,
    remote: Arc<R>,
    synced: Mutex<BTreeSet<String>>,
    // Pulls in progress; local changes are not pushed while non-zero.
    pulling: AtomicUsize,
    local_token: Mutex<Option<ObserverToken>>,
    remote_token: Mutex<Option<ObserverToken>>,
}

/// Marks a pull in progress for as long as it is held.
struct PullGuard<'a>(&'a AtomicUsize);

impl<'a> PullGuard<'a> {
    fn enter(pulling: &'a AtomicUsize) -> Self {
        pulling.fetch_add(1, Ordering::SeqCst);
        PullGuard(pulling)
    }
}

impl Drop for PullGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<L, R> SyncState<L, R>
where
    L: DefaultsStore + ?Sized + 'static,
    R: RemoteStore + ?Sized + 'static,
{
    fn synced(&self) -> BTreeSet<String> {
        lock(&self.synced).clone()
    }

    fn attach_local_listener(&self) {
        let weak = self.this.clone();
        let listener: ChangeListener = Arc::new(move |identifier: &str| {
            if let Some(state) = weak.upgrade() {
                state.local_changed(identifier);
            }
        });

        match self.local.add_change_listener(listener) {
            Ok(token) => *lock(&self.local_token) = Some(token),
            Err(e) => log::warn!("Failed to listen for local changes: {}", e),
        }
    }

    fn detach_local_listener(&self) {
        if let Some(token) = lock(&self.local_token).take() {
            self.local.remove_observer(token);
        }
    }

    fn attach_remote_listener(&self) {
        let weak = self.this.clone();
        let listener: ChangeListener = Arc::new(move |identifier: &str| {
            if let Some(state) = weak.upgrade() {
                state.remote_changed(identifier);
            }
        });

        match self.remote.add_external_change_listener(listener) {
            Ok(token) => *lock(&self.remote_token) = Some(token),
            Err(e) => log::warn!("Failed to listen for remote changes: {}", e),
        }
    }

    fn remote_changed(&self, identifier: &str) {
        log::debug!("remote change to '{}'", identifier);
        self.pull_from_remote();
    }

    /// Copy every synced identifier present remotely into the local store.
    fn pull_from_remote(&self) {
        let synced = self.synced();
        if synced.is_empty() {
            return;
        }

        let _guard = PullGuard::enter(&self.pulling);
        for identifier in &synced {
            match self.remote.get_raw(identifier) {
                Ok(Some(value)) => {
                    if let Err(e) = self.local.set_raw(identifier, Some(value)) {
                        log::warn!("Failed to copy '{}' from remote: {}", identifier, e);
                    }
                }
                Ok(None) => {}
                Err(e) => log::warn!("Failed to read '{}' from remote: {}", identifier, e),
            }
        }

        log::debug!("pulled {} synced identifier(s) from remote", synced.len());
    }

    fn local_changed(&self, identifier: &str) {
        if self.pulling.load(Ordering::SeqCst) > 0 {
            log::trace!("not pushing '{}' during a pull", identifier);
            return;
        }
        log::trace!("local change to '{}'", identifier);
        self.push_to_remote();
    }

    /// Copy every synced identifier from the local store to the remote one,
    /// then request a synchronize.
    fn push_to_remote(&self) {
        let synced = self.synced();
        if synced.is_empty() {
            return;
        }

        for identifier in &synced {
            let value = match self.local.get_raw(identifier) {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("Failed to read '{}' locally: {}", identifier, e);
                    continue;
                }
            };
            if let Err(e) = self.remote.set_raw(identifier, value) {
                log::warn!("Failed to copy '{}' to remote: {}", identifier, e);
            }
        }

        match self.remote.synchronize() {
            Ok(true) => log::debug!("pushed {} synced identifier(s)", synced.len()),
            Ok(false) => log::warn!("Remote store declined to synchronize"),
            Err(e) => log::warn!("Remote synchronize failed: {}", e),
        }
    }
}

impl<L, R> Drop for SyncState<L, R>
where
    L: DefaultsStore + ?Sized + 'static,
    R: RemoteStore + ?Sized + 'static,
{
    fn drop(&mut self) {
        self.detach_local_listener();
        if let Some(token) = lock(&self.remote_token).take() {
            self.remote.remove_observer(token);
        }
    }
}

/// Keeps a set of identifiers mirrored between a local and a remote store.
///
/// The syncer starts with an empty set. Dropping it detaches both listeners.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use typed_defaults::{DefaultsAccess, DefaultsSyncer, Key};
/// use typed_defaults_json_store::{MemoryRemoteStore, MemoryStore};
///
/// let local = Arc::new(MemoryStore::new());
/// let remote = Arc::new(MemoryRemoteStore::new());
/// let syncer = DefaultsSyncer::new(local.clone(), remote.clone());
///
/// let high_score: Key<i64> = Key::with_type_default("highScore");
/// syncer.sync(&[&high_score]);
///
/// local.set(&high_score, 1200);
/// assert_eq!(remote.synchronize_count(), 1);
/// ```
pub struct DefaultsSyncer<L: DefaultsStore + ?Sized + 'static, R: RemoteStore + ?Sized + 'static> {
    state: Arc<SyncState<L, R>>,
}

impl<L, R> DefaultsSyncer<L, R>
where
    L: DefaultsStore + ?Sized + 'static,
    R: RemoteStore + ?Sized + 'static,
{
    pub fn new(local: Arc<L>, remote: Arc<R>) -> Self {
        let state = Arc::new_cyclic(|this| SyncState {
            this: this.clone(),
            local,
            remote,
            synced: Mutex::new(BTreeSet::new()),
            pulling: AtomicUsize::new(0),
            local_token: Mutex::new(None),
            remote_token: Mutex::new(None),
        });
        state.attach_local_listener();
        state.attach_remote_listener();
        DefaultsSyncer { state }
    }

    /// Start mirroring `keys`.
    pub fn sync(&self, keys: &[&dyn AnyKey]) {
        self.sync_identifiers(keys.iter().map(|k| k.identifier().to_string()));
    }

    pub fn sync_identifiers<I>(&self, identifiers: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        lock(&self.state.synced).extend(identifiers.into_iter().map(Into::into));
        self.state.pull_from_remote();
    }

    /// Stop mirroring `keys`. Their values stay where they are.
    pub fn unsync(&self, keys: &[&dyn AnyKey]) {
        {
            let mut synced = lock(&self.state.synced);
            for key in keys {
                synced.remove(key.identifier());
            }
        }
        self.state.pull_from_remote();
    }

    pub fn unsync_all(&self) {
        lock(&self.state.synced).clear();
    }

    pub fn synced_identifiers(&self) -> BTreeSet<String> {
        self.state.synced()
    }

    /// Copy synced values from the remote store now.
    pub fn pull(&self) {
        self.state.pull_from_remote();
    }

    /// Copy synced values to the remote store now.
    pub fn push(&self) {
        self.state.push_to_remote();
    }
}

impl<L, R> fmt::Debug for DefaultsSyncer<L, R>
where
    L: DefaultsStore + ?Sized + 'static,
    R: RemoteStore + ?Sized + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultsSyncer")
            .field("synced", &self.synced_identifiers())
            .finish()
    }
}
