use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::Result;

/// Typed cache event kinds dispatched to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventKind {
    /// An incoming update passed the `CacheFlow` policy and was stored
    UpdateAccepted,
    /// An entity's evaluation failed; the stored value was left unchanged
    UpdateFailed,
    /// A supervision entity changed status
    SupervisionChange,
}

/// Synchronous cache listener contract.
///
/// `notify` runs on the thread performing the mutation, after the store has
/// been applied. Listeners are expected to be cheap or to hand work off to
/// their own queue; a slow listener stalls that thread's cache mutation.
pub trait CacheListener<V>: Send + Sync {
    fn notify(
        &self,
        kind: CacheEventKind,
        entity: &V,
    ) -> Result<()>;
}

struct Subscription<V> {
    kinds: Vec<CacheEventKind>,
    listener: Arc<dyn CacheListener<V>>,
}

impl<V> Clone for Subscription<V> {
    fn clone(&self) -> Self {
        Self {
            kinds: self.kinds.clone(),
            listener: self.listener.clone(),
        }
    }
}

/// In-process synchronous pub/sub keyed by event kind.
///
/// Listeners are invoked in registration order. A failing listener is logged
/// and does not prevent the remaining listeners from running, nor does it
/// roll back the store mutation that produced the event.
pub struct ListenerRegistry<V> {
    cache_name: &'static str,
    subscriptions: RwLock<Vec<Subscription<V>>>,
}

impl<V> ListenerRegistry<V> {
    pub(crate) fn new(cache_name: &'static str) -> Self {
        Self {
            cache_name,
            subscriptions: RwLock::new(Vec::new()),
        }
    }

    pub fn register(
        &self,
        listener: Arc<dyn CacheListener<V>>,
        kinds: &[CacheEventKind],
    ) {
        let mut subs = self.subscriptions.write();
        subs.push(Subscription {
            kinds: kinds.to_vec(),
            listener,
        });
    }

    /// Removes every subscription held by `listener` (identity comparison).
    pub fn deregister(
        &self,
        listener: &Arc<dyn CacheListener<V>>,
    ) {
        let mut subs = self.subscriptions.write();
        subs.retain(|s| !Arc::ptr_eq(&s.listener, listener));
    }

    pub fn len(&self) -> usize {
        self.subscriptions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.read().is_empty()
    }

    /// Dispatches `kind` to all subscribed listeners on the calling thread.
    ///
    /// The subscription list is copied out first so listeners may register
    /// or deregister without deadlocking the registry lock.
    pub(crate) fn dispatch(
        &self,
        kind: CacheEventKind,
        entity: &V,
    ) {
        let subs: Vec<Subscription<V>> = self.subscriptions.read().clone();
        for sub in subs {
            if !sub.kinds.contains(&kind) {
                continue;
            }
            if let Err(e) = sub.listener.notify(kind, entity) {
                warn!(
                    "listener on {} cache failed for {:?} event: {:?}",
                    self.cache_name, kind, e
                );
            }
        }
    }
}
