use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use parking_lot::RwLockWriteGuard;
use tracing::debug;
use tracing::trace;

use super::Cacheable;
use super::CacheEventKind;
use super::CacheFlow;
use super::CacheListener;
use super::ListenerRegistry;
use super::TimestampFlow;
use crate::CacheError;
use crate::EntityLoader;
use crate::Result;

/// Generic keyed in-memory store with per-key mutual exclusion, a pluggable
/// update-acceptance policy and synchronous listener dispatch.
///
/// Storage is a fixed shard table; a key maps to its shard by
/// `id % shard_count`, so two keys in different shards never contend. Plain
/// reads take the shard read lock and copy the entity out; `put` holds the
/// shard write lock for the accept-check-and-store only. Listener dispatch
/// happens on the mutating thread after the lock is released, before the
/// mutating call returns.
pub struct EntityCache<V: Cacheable> {
    name: &'static str,
    shards: Box<[RwLock<HashMap<u64, V>>]>,
    flow: Box<dyn CacheFlow<V>>,
    listeners: ListenerRegistry<V>,
    accept_event: CacheEventKind,
}

impl<V: Cacheable> EntityCache<V> {
    /// Creates a cache with the default timestamp-based `CacheFlow`.
    pub fn new(
        name: &'static str,
        shard_count: usize,
    ) -> Self {
        assert!(shard_count > 0, "shard_count must be greater than 0");
        let shards = (0..shard_count)
            .map(|_| RwLock::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            name,
            shards,
            flow: Box::new(TimestampFlow),
            listeners: ListenerRegistry::new(name),
            accept_event: CacheEventKind::UpdateAccepted,
        }
    }

    /// Replaces the update-acceptance policy.
    pub fn with_flow(
        mut self,
        flow: impl CacheFlow<V> + 'static,
    ) -> Self {
        self.flow = Box::new(flow);
        self
    }

    /// Changes the event kind announced for accepted updates.
    ///
    /// Used by the supervision cache, whose accepted updates fire
    /// `SupervisionChange` instead of `UpdateAccepted`.
    pub fn announcing(
        mut self,
        kind: CacheEventKind,
    ) -> Self {
        self.accept_event = kind;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns a copy of the stored entity.
    pub fn get(
        &self,
        id: u64,
    ) -> Result<V> {
        let shard = self.shards[self.shard_index(id)].read();
        shard.get(&id).cloned().ok_or_else(|| {
            CacheError::NotFound {
                cache: self.name,
                id,
            }
            .into()
        })
    }

    /// Best-effort bulk read; missing keys are simply absent from the result.
    pub fn get_all(
        &self,
        ids: &[u64],
    ) -> HashMap<u64, V> {
        let mut result = HashMap::with_capacity(ids.len());
        for &id in ids {
            let shard = self.shards[self.shard_index(id)].read();
            if let Some(v) = shard.get(&id) {
                result.insert(id, v.clone());
            }
        }
        result
    }

    pub fn contains_key(
        &self,
        id: u64,
    ) -> bool {
        self.shards[self.shard_index(id)].read().contains_key(&id)
    }

    /// Applies the `CacheFlow` policy and stores the entity on acceptance,
    /// firing the accept event synchronously on the calling thread.
    ///
    /// Returns `false` if the policy dropped the update (a no-op, not an
    /// error).
    pub fn put(
        &self,
        incoming: V,
    ) -> bool {
        self.store(incoming, true)
    }

    /// Same acceptance logic as `put`, but never notifies listeners.
    ///
    /// Used to record internal bookkeeping changes without triggering
    /// downstream notification fan-out.
    pub fn put_quiet(
        &self,
        incoming: V,
    ) -> bool {
        self.store(incoming, false)
    }

    /// Removes the entity on unconfiguration.
    pub fn remove(
        &self,
        id: u64,
    ) -> Option<V> {
        let removed = self.shards[self.shard_index(id)].write().remove(&id);
        if removed.is_some() {
            debug!("{} cache removed entity {}", self.name, id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.read().is_empty())
    }

    /// Consults the loader collaborator on a cold miss and populates the
    /// cache quietly. A config/startup path, never the hot evaluation path.
    pub fn get_or_load(
        &self,
        id: u64,
        loader: &dyn EntityLoader<V>,
    ) -> Result<V> {
        if let Ok(v) = self.get(id) {
            return Ok(v);
        }
        match loader.load(id)? {
            Some(v) => {
                debug!("{} cache loaded entity {} on miss", self.name, id);
                self.put_quiet(v.clone());
                Ok(v)
            }
            None => Err(CacheError::NotFound {
                cache: self.name,
                id,
            }
            .into()),
        }
    }

    pub fn register_listener(
        &self,
        listener: Arc<dyn CacheListener<V>>,
        kinds: &[CacheEventKind],
    ) {
        self.listeners.register(listener, kinds);
    }

    pub fn deregister_listener(
        &self,
        listener: &Arc<dyn CacheListener<V>>,
    ) {
        self.listeners.deregister(listener);
    }

    /// Announces an event for an entity without mutating the store.
    ///
    /// The evaluation engine uses this to emit `UpdateFailed` for an alarm
    /// whose evaluation threw.
    pub fn notify_listeners(
        &self,
        kind: CacheEventKind,
        entity: &V,
    ) {
        self.listeners.dispatch(kind, entity);
    }

    /// Runs `f` with exclusive access to every declared key.
    ///
    /// The write locks of the distinct shards covering `keys` are acquired
    /// in ascending shard-index order, a fixed, globally-agreed order, so
    /// two transactions spanning overlapping key sets cannot deadlock. No
    /// other thread observes an intermediate state of those keys while `f`
    /// runs. Events accepted inside the transaction are dispatched in order
    /// after the locks are released, still on the calling thread.
    pub fn execute_transaction<R>(
        &self,
        keys: &[u64],
        f: impl FnOnce(&mut CacheTransaction<'_, V>) -> R,
    ) -> R {
        let mut indices: Vec<usize> = keys.iter().map(|k| self.shard_index(*k)).collect();
        indices.sort_unstable();
        indices.dedup();

        let guards: Vec<(usize, RwLockWriteGuard<'_, HashMap<u64, V>>)> = indices
            .into_iter()
            .map(|i| (i, self.shards[i].write()))
            .collect();

        let mut txn = CacheTransaction {
            name: self.name,
            shard_count: self.shards.len(),
            flow: self.flow.as_ref(),
            accept_event: self.accept_event,
            shards: guards,
            pending: Vec::new(),
        };
        let result = f(&mut txn);

        let pending = std::mem::take(&mut txn.pending);
        drop(txn);
        for (kind, entity) in pending {
            self.listeners.dispatch(kind, &entity);
        }
        result
    }

    fn store(
        &self,
        incoming: V,
        notify: bool,
    ) -> bool {
        let id = incoming.id();
        let accepted = {
            let mut shard = self.shards[self.shard_index(id)].write();
            match shard.get(&id) {
                Some(stored) if !self.flow.accept(stored, &incoming) => {
                    trace!("{} cache dropped stale update for entity {}", self.name, id);
                    false
                }
                _ => {
                    shard.insert(id, incoming.clone());
                    true
                }
            }
        };
        if accepted && notify {
            self.listeners.dispatch(self.accept_event, &incoming);
        }
        accepted
    }

    fn shard_index(
        &self,
        id: u64,
    ) -> usize {
        (id % self.shards.len() as u64) as usize
    }
}

/// Exclusive view over the shards covering a transaction's declared keys.
///
/// Touching a key whose shard was not covered by the declared key set is a
/// `KeyOutsideTransaction` error rather than a silent lock-order violation.
pub struct CacheTransaction<'a, V: Cacheable> {
    name: &'static str,
    shard_count: usize,
    flow: &'a dyn CacheFlow<V>,
    accept_event: CacheEventKind,
    // sorted by shard index, ascending
    shards: Vec<(usize, RwLockWriteGuard<'a, HashMap<u64, V>>)>,
    pending: Vec<(CacheEventKind, V)>,
}

impl<V: Cacheable> CacheTransaction<'_, V> {
    pub fn get(
        &self,
        id: u64,
    ) -> Result<V> {
        let shard = self.shard(id)?;
        shard.get(&id).cloned().ok_or_else(|| {
            CacheError::NotFound {
                cache: self.name,
                id,
            }
            .into()
        })
    }

    pub fn contains_key(
        &self,
        id: u64,
    ) -> bool {
        self.shard(id).map(|s| s.contains_key(&id)).unwrap_or(false)
    }

    /// Transactional `put`: the accept event is queued and dispatched after
    /// the transaction's locks are released.
    pub fn put(
        &mut self,
        incoming: V,
    ) -> Result<bool> {
        self.store(incoming, true)
    }

    /// Transactional `put_quiet`: accepted silently, no event queued.
    pub fn put_quiet(
        &mut self,
        incoming: V,
    ) -> Result<bool> {
        self.store(incoming, false)
    }

    fn store(
        &mut self,
        incoming: V,
        notify: bool,
    ) -> Result<bool> {
        let id = incoming.id();
        let accept_event = self.accept_event;
        let accepted = {
            let flow = self.flow;
            let shard = self.shard_mut(id)?;
            match shard.get(&id) {
                Some(stored) if !flow.accept(stored, &incoming) => {
                    trace!("{} cache dropped stale update for entity {}", self.name, id);
                    false
                }
                _ => {
                    shard.insert(id, incoming.clone());
                    true
                }
            }
        };
        if accepted && notify {
            self.pending.push((accept_event, incoming));
        }
        Ok(accepted)
    }

    fn shard(
        &self,
        id: u64,
    ) -> Result<&HashMap<u64, V>> {
        let index = (id % self.shard_count as u64) as usize;
        match self.shards.binary_search_by_key(&index, |(i, _)| *i) {
            Ok(pos) => Ok(&self.shards[pos].1),
            Err(_) => Err(CacheError::KeyOutsideTransaction {
                cache: self.name,
                id,
            }
            .into()),
        }
    }

    fn shard_mut(
        &mut self,
        id: u64,
    ) -> Result<&mut HashMap<u64, V>> {
        let index = (id % self.shard_count as u64) as usize;
        match self.shards.binary_search_by_key(&index, |(i, _)| *i) {
            Ok(pos) => Ok(&mut self.shards[pos].1),
            Err(_) => Err(CacheError::KeyOutsideTransaction {
                cache: self.name,
                id,
            }
            .into()),
        }
    }
}
