//! Bounded cacher whose entries expire after a fixed time-to-live.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::BoundedCacher;
use crate::core::Cacher;
use crate::util::clock::{Clock, SystemClock};

#[derive(Clone)]
struct Stamped<V> {
    value: V,
    stored_at: Instant,
}

/// Bounded cacher with per-entry TTL.
///
/// An entry older than `timeout` is a miss: it is evicted when read and by
/// [`sweep`](Cacher::sweep). Overflow sweeps expired entries first, then falls
/// back to oldest-inserted eviction.
pub struct TimeoutCacher<V> {
    inner: BoundedCacher<Stamped<V>>,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl<V> TimeoutCacher<V> {
    /// Create a cacher with `max_count` entries living for `timeout`.
    #[must_use]
    pub fn new(max_count: usize, timeout: Duration) -> Self {
        Self::with_clock(max_count, timeout, Arc::new(SystemClock))
    }

    /// Same as [`new`](Self::new) with an explicit time source.
    #[must_use]
    pub fn with_clock(max_count: usize, timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: BoundedCacher::new(max_count),
            timeout,
            clock,
        }
    }

    /// Time-to-live of every entry.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn expired(&self, stamped: &Stamped<V>, now: Instant) -> bool {
        now.saturating_duration_since(stamped.stored_at) > self.timeout
    }
}

impl<V: Clone + Send> Cacher<V> for TimeoutCacher<V> {
    fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let stamped = self.inner.peek(key)?;
        if self.expired(stamped, now) {
            self.inner.remove(key);
            return None;
        }
        Some(stamped.value.clone())
    }

    fn set(&mut self, key: &str, value: V) {
        if self.inner.len() >= self.inner.max_count() {
            self.sweep();
        }
        let stored_at = self.clock.now();
        self.inner.set(key, Stamped { value, stored_at });
    }

    fn remove(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let stamped = self.inner.remove(key)?;
        (!self.expired(&stamped, now)).then_some(stamped.value)
    }

    fn len(&self) -> usize {
        let now = self.clock.now();
        self.inner
            .iter()
            .filter(|(_, stamped)| !self.expired(stamped, now))
            .count()
    }

    fn max_count(&self) -> usize {
        self.inner.max_count()
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn sweep(&mut self) -> usize {
        let now = self.clock.now();
        let stale: Vec<String> = self
            .inner
            .iter()
            .filter(|(_, stamped)| self.expired(stamped, now))
            .map(|(key, _)| key.to_string())
            .collect();
        for key in &stale {
            self.inner.remove(key);
        }
        stale.len()
    }
}
