use super::Cacheable;

/// Pluggable accept-or-drop policy for incoming cache updates.
///
/// Consulted under the key's write lock on every `put`/`put_quiet`. A
/// rejected update is a silent no-op, not an error.
pub trait CacheFlow<V>: Send + Sync {
    /// Decides whether `incoming` supersedes `stored`.
    fn accept(
        &self,
        stored: &V,
        incoming: &V,
    ) -> bool;
}

/// Default policy: accept iff the incoming timestamp is not older than the
/// stored one. Out-of-order updates are dropped without touching the stored
/// value or its timestamp.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampFlow;

impl<V: Cacheable> CacheFlow<V> for TimestampFlow {
    fn accept(
        &self,
        stored: &V,
        incoming: &V,
    ) -> bool {
        incoming.cache_timestamp() >= stored.cache_timestamp()
    }
}
