//! Observation as a stream of values.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::mpsc::{self, UnboundedReceiver};
use futures::{Stream, StreamExt};
use typed_defaults_core::{DefaultsStore, ObserveOptions};

use crate::key::TypedKey;
use crate::observer::{DefaultsObserver, Disposable};

/// A [`Stream`] of the values a key takes on.
///
/// Every change to the key yields its new value, resolved through the key's
/// defaults the same way a read is. Values are buffered until polled.
///
/// Dropping the publisher ends the underlying observation. After
/// [`dispose`](Disposable::dispose) the stream yields whatever is buffered
/// and then ends.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use futures::executor::block_on_stream;
/// use typed_defaults::{DefaultsAccess, DefaultsPublisher, Key, ObserveOptions};
/// use typed_defaults_json_store::MemoryStore;
///
/// let store = Arc::new(MemoryStore::new());
/// let key: Key<i64> = Key::with_type_default("launchCount");
/// let mut counts = DefaultsPublisher::new(store.clone(), &key, ObserveOptions::default());
///
/// store.set(&key, 1);
/// store.remove(&key);
///
/// let seen: Vec<i64> = block_on_stream(&mut counts).take(2).collect();
/// assert_eq!(seen, vec![1, 0]);
/// ```
pub struct DefaultsPublisher<T, S: DefaultsStore + ?Sized> {
    receiver: UnboundedReceiver<T>,
    observer: DefaultsObserver<S>,
}

impl<T, S> DefaultsPublisher<T, S>
where
    T: Send + 'static,
    S: DefaultsStore + ?Sized,
{
    /// Start publishing the values of `key` in `store`.
    pub fn new<K>(store: Arc<S>, key: &K, options: ObserveOptions) -> Self
    where
        K: TypedKey<Output = T> + Clone + Send + Sync + 'static,
    {
        let (sender, receiver) = mpsc::unbounded();
        let resolver = key.clone();

        let observer = DefaultsObserver::observe(store, key, options, move |update| {
            let value = resolver.resolve(update.new_value);
            if sender.unbounded_send(value).is_err() {
                log::trace!("no receiver for changes to '{}'", update.identifier);
            }
        });

        DefaultsPublisher { receiver, observer }
    }

    /// The identifier whose values are published.
    pub fn identifier(&self) -> &str {
        self.observer.identifier()
    }
}

impl<T, S: DefaultsStore + ?Sized> Stream for DefaultsPublisher<T, S> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.receiver.poll_next_unpin(cx)
    }
}

impl<T, S> Disposable for DefaultsPublisher<T, S>
where
    T: Send,
    S: DefaultsStore + ?Sized,
{
    fn dispose(&self) {
        self.observer.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.observer.is_disposed()
    }
}

impl<T, S: DefaultsStore + ?Sized> fmt::Debug for DefaultsPublisher<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultsPublisher")
            .field("observer", &self.observer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::DefaultsAccess;
    use crate::key::{Key, OptionalKey};
    use futures::executor::block_on_stream;
    use typed_defaults_json_store::MemoryStore;

    #[test]
    fn values_arrive_in_order() {
        let store = Arc::new(MemoryStore::new());
        let key: Key<i64> = Key::with_type_default("count");
        let mut publisher = DefaultsPublisher::new(store.clone(), &key, ObserveOptions::default());

        for n in 1..=3 {
            store.set(&key, n);
        }

        let seen: Vec<i64> = block_on_stream(&mut publisher).take(3).collect();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn initial_value_is_published_first() {
        let store = Arc::new(MemoryStore::new());
        let key: OptionalKey<String> = OptionalKey::new("nickname");
        store.set(&key, Some("frog".to_string()));

        let mut publisher = DefaultsPublisher::new(
            store.clone(),
            &key,
            ObserveOptions::default().with_initial(),
        );
        store.set(&key, None);

        let seen: Vec<Option<String>> = block_on_stream(&mut publisher).take(2).collect();
        assert_eq!(seen, vec![Some("frog".to_string()), None]);
    }

    #[test]
    fn dropping_removes_the_observer() {
        let store = Arc::new(MemoryStore::new());
        let key: Key<bool> = Key::with_type_default("flag");
        let publisher = DefaultsPublisher::new(store.clone(), &key, ObserveOptions::default());
        assert_eq!(publisher.identifier(), "flag");
        assert_eq!(store.observer_count("flag"), 1);

        drop(publisher);
        assert_eq!(store.observer_count("flag"), 0);
        store.set(&key, true);
    }

    #[test]
    fn dispose_drains_then_ends() {
        let store = Arc::new(MemoryStore::new());
        let key: Key<i64> = Key::with_type_default("count");
        let mut publisher = DefaultsPublisher::new(store.clone(), &key, ObserveOptions::default());

        store.set(&key, 1);
        publisher.dispose();
        store.set(&key, 2);

        assert!(publisher.is_disposed());
        let seen: Vec<i64> = block_on_stream(&mut publisher).collect();
        assert_eq!(seen, vec![1]);
    }
}
