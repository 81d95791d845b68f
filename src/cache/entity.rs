/// Contract for everything stored in an [`EntityCache`](super::EntityCache).
///
/// An entity is owned exclusively by its cache; copies cross the cache
/// boundary by value, so implementors are `Clone`.
pub trait Cacheable: Clone + Send + Sync + 'static {
    /// Stable identity, unique within one cache.
    fn id(&self) -> u64;

    /// Logical timestamp (epoch millis) used by the accept/drop policy.
    fn cache_timestamp(&self) -> i64;
}
