//! # Registry
//!
//! A single mutex guards the key → callback-list map. Callbacks run while
//! that mutex is held, which is what makes unsubscription synchronous with
//! dispatch. The flip side: a callback must never call back into the same
//! registry (subscribe, unsubscribe or dispatch), or it deadlocks.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

/// Unique identity of one subscription within a registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Callback<V> = Box<dyn Fn(V) + Send + Sync>;

struct Slot<V> {
    id: SubscriptionId,
    callback: Callback<V>,
}

struct Inner<K, V> {
    subscribers: Mutex<HashMap<K, Vec<Slot<V>>>>,
    next_id: AtomicU64,
}

impl<K: Eq + Hash, V> Inner<K, V> {
    fn remove(&self, key: &K, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let Some(slots) = subscribers.get_mut(key) else {
            return false;
        };
        let Some(pos) = slots.iter().position(|slot| slot.id == id) else {
            return false;
        };

        slots.swap_remove(pos);
        if slots.is_empty() {
            subscribers.remove(key);
        }
        true
    }
}

/// Keyed fan-in of listeners awaiting values.
///
/// Cloning yields another handle to the same registry.
pub struct CorrelationRegistry<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for CorrelationRegistry<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> Default for CorrelationRegistry<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> CorrelationRegistry<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Invoke `callback` for every future dispatch on `key`.
    ///
    /// The subscription lives until the returned handle's
    /// [`Unsubscribe::unsubscribe`] is called; dropping the handle does not
    /// remove it.
    #[must_use = "dropping the handle leaves the subscription registered forever"]
    pub fn subscribe<F>(&self, key: K, callback: F) -> Unsubscribe
    where
        F: Fn(V) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));

        self.inner
            .subscribers
            .lock()
            .entry(key.clone())
            .or_default()
            .push(Slot {
                id,
                callback: Box::new(callback),
            });

        trace!(key = ?key, id = %id, "Subscription registered");

        let registry: Weak<Inner<K, V>> = Arc::downgrade(&self.inner);
        Unsubscribe {
            id,
            done: AtomicBool::new(false),
            remove: Box::new(move || {
                if let Some(inner) = registry.upgrade() {
                    if inner.remove(&key, id) {
                        trace!(key = ?key, id = %id, "Subscription removed");
                    }
                }
            }),
        }
    }

    /// Hand `value` to every callback registered on `key`.
    ///
    /// Returns the number of callbacks invoked. Co-subscribers run in no
    /// guaranteed order.
    pub fn dispatch(&self, key: &K, value: V) -> usize {
        let subscribers = self.inner.subscribers.lock();
        match subscribers.get(key) {
            Some(slots) => {
                for slot in slots {
                    (slot.callback)(value.clone());
                }
                slots.len()
            }
            None => {
                debug!(key = ?key, "No subscribers for key, value dropped");
                0
            }
        }
    }

    /// Number of callbacks registered on `key`.
    pub fn subscriber_count(&self, key: &K) -> usize {
        self.inner.subscribers.lock().get(key).map_or(0, Vec::len)
    }

    /// Number of keys with at least one callback.
    pub fn key_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.subscribers.lock().is_empty()
    }
}

/// Handle that removes exactly one subscription.
pub struct Unsubscribe {
    id: SubscriptionId,
    done: AtomicBool,
    remove: Box<dyn Fn() + Send + Sync>,
}

impl Unsubscribe {
    /// Remove the subscription. Later calls do nothing.
    pub fn unsubscribe(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            (self.remove)();
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether `unsubscribe` has been called.
    pub fn is_unsubscribed(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("id", &self.id)
            .field("done", &self.is_unsubscribed())
            .finish()
    }
}
