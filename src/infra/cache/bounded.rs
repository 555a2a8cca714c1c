//! Capacity-bounded cacher with oldest-inserted-first eviction.

use std::collections::{BTreeMap, HashMap};

use crate::core::Cacher;

struct Entry<V> {
    value: V,
    seq: u64,
}

/// Capacity-bounded map.
///
/// When full, inserting a new key evicts the entry that was inserted (or last
/// re-set) longest ago. A `max_count` of zero stores nothing.
pub struct BoundedCacher<V> {
    max_count: usize,
    entries: HashMap<String, Entry<V>>,
    /// Insertion order: sequence number → key. Oldest first.
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl<V> BoundedCacher<V> {
    /// Create a cacher holding at most `max_count` entries.
    #[must_use]
    pub fn new(max_count: usize) -> Self {
        Self {
            max_count,
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Keys from oldest to newest insertion.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.values().map(String::as_str)
    }

    /// Borrow the value for `key` without cloning it.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.entries.get(key).map(|e| &e.value)
    }

    /// Iterate entries from oldest to newest insertion.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.order.values().filter_map(move |key| {
            self.entries
                .get(key)
                .map(|entry| (key.as_str(), &entry.value))
        })
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }

    fn take(&mut self, key: &str) -> Option<V> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.seq);
        Some(entry.value)
    }

    fn insert(&mut self, key: &str, value: V) {
        if self.max_count == 0 {
            return;
        }
        if self.take(key).is_none() {
            while self.entries.len() >= self.max_count {
                if self.evict_oldest().is_none() {
                    break;
                }
            }
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.to_string());
        self.entries.insert(key.to_string(), Entry { value, seq });
    }
}

impl<V: Clone + Send> Cacher<V> for BoundedCacher<V> {
    fn get(&mut self, key: &str) -> Option<V> {
        self.peek(key).cloned()
    }

    fn set(&mut self, key: &str, value: V) {
        self.insert(key, value);
    }

    fn remove(&mut self, key: &str) -> Option<V> {
        self.take(key)
    }

    fn contains(&mut self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn max_count(&self) -> usize {
        self.max_count
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let mut cacher = BoundedCacher::new(4);
        cacher.set("a", 1);
        assert_eq!(cacher.get("a"), Some(1));
        assert!(cacher.contains("a"));
        assert_eq!(cacher.remove("a"), Some(1));
        assert!(cacher.is_empty());
        assert_eq!(cacher.remove("a"), None);
    }

    #[test]
    fn test_evicts_oldest_inserted_first() {
        let mut cacher = BoundedCacher::new(2);
        cacher.set("a", 1);
        cacher.set("b", 2);
        // Reads do not affect eviction order.
        assert_eq!(cacher.get("a"), Some(1));
        cacher.set("c", 3);

        assert_eq!(cacher.len(), 2);
        assert!(!cacher.contains("a"));
        assert_eq!(cacher.keys().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn test_reset_refreshes_position() {
        let mut cacher = BoundedCacher::new(2);
        cacher.set("a", 1);
        cacher.set("b", 2);
        cacher.set("a", 10);
        cacher.set("c", 3);

        assert_eq!(cacher.get("a"), Some(10));
        assert!(!cacher.contains("b"));
        assert_eq!(cacher.len(), 2);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut cacher = BoundedCacher::new(0);
        cacher.set("a", 1);
        assert!(cacher.is_empty());
        assert_eq!(cacher.get("a"), None);
    }

    #[test]
    fn test_clear() {
        let mut cacher = BoundedCacher::new(3);
        cacher.set("a", 1);
        cacher.set("b", 2);
        cacher.clear();
        assert!(cacher.is_empty());
        cacher.set("c", 3);
        assert_eq!(cacher.iter().collect::<Vec<_>>(), vec![("c", &3)]);
    }
}
