//! Bounded key/value store abstraction backing dedup and result reuse.

/// Abstraction for cache backends.
///
/// Implementations are bounded by [`max_count`](Cacher::max_count). Lookups
/// take `&mut self` so time-bounded variants can evict stale entries lazily.
pub trait Cacher<V: Clone>: Send {
    /// Value for `key`, if present and still valid.
    fn get(&mut self, key: &str) -> Option<V>;
    /// Insert or refresh `key`, evicting per the backend's policy when full.
    fn set(&mut self, key: &str, value: V);
    /// Remove `key`, returning its value.
    fn remove(&mut self, key: &str) -> Option<V>;
    /// True if `key` is present and still valid.
    fn contains(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }
    /// Number of valid entries.
    fn len(&self) -> usize;
    /// True when no valid entry remains.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Capacity ceiling.
    fn max_count(&self) -> usize;
    /// Drop every entry.
    fn clear(&mut self);
    /// Evict invalid entries and return how many were removed.
    fn sweep(&mut self) -> usize {
        0
    }
}
