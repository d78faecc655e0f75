//! LRU Tracker Module
//!
//! Recency ordering used by the local cache to pick prune victims.

use std::collections::{BTreeMap, HashMap};

// == LRU Tracker ==
/// Tracks access order with a monotonically increasing stamp per key.
///
/// `by_stamp` is ordered oldest first, so evicting a batch is a walk from
/// the front of the map instead of a scan of every key.
#[derive(Debug, Default)]
pub struct LruTracker {
    /// Last access stamp of each key
    stamps: HashMap<String, u64>,
    /// Keys ordered by access stamp
    by_stamp: BTreeMap<u64, String>,
    /// Next stamp to hand out
    clock: u64,
}

impl LruTracker {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used, inserting it if unknown.
    pub fn touch(&mut self, key: &str) {
        self.clock += 1;
        if let Some(old) = self.stamps.insert(key.to_string(), self.clock) {
            self.by_stamp.remove(&old);
        }
        self.by_stamp.insert(self.clock, key.to_string());
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) {
        if let Some(stamp) = self.stamps.remove(key) {
            self.by_stamp.remove(&stamp);
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.by_stamp.pop_first()?;
        self.stamps.remove(&key);
        Some(key)
    }

    // == Evict Batch ==
    /// Removes up to `count` least recently used keys, oldest first.
    pub fn evict_batch(&mut self, count: usize) -> Vec<String> {
        let mut evicted = Vec::with_capacity(count.min(self.len()));
        while evicted.len() < count {
            match self.evict_oldest() {
                Some(key) => evicted.push(key),
                None => break,
            }
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_new() {
        let lru = LruTracker::new();
        assert!(lru.is_empty());
        assert_eq!(lru.len(), 0);
    }

    #[test]
    fn test_lru_touch_existing_key() {
        let mut lru = LruTracker::new();

        lru.touch("key1");
        lru.touch("key2");
        lru.touch("key3");
        lru.touch("key1");

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.evict_oldest(), Some("key2".to_string()));
    }

    #[test]
    fn test_lru_evict_empty() {
        let mut lru = LruTracker::new();
        assert_eq!(lru.evict_oldest(), None);
        assert!(lru.evict_batch(3).is_empty());
    }

    #[test]
    fn test_lru_remove() {
        let mut lru = LruTracker::new();

        lru.touch("key1");
        lru.touch("key2");
        lru.touch("key3");
        lru.remove("key2");
        lru.remove("nonexistent");

        assert_eq!(lru.len(), 2);
        assert_eq!(lru.evict_oldest(), Some("key1".to_string()));
        assert_eq!(lru.evict_oldest(), Some("key3".to_string()));
    }

    #[test]
    fn test_lru_order_after_multiple_touches() {
        let mut lru = LruTracker::new();

        lru.touch("a");
        lru.touch("b");
        lru.touch("c");
        lru.touch("a");
        lru.touch("c");
        lru.touch("b");

        assert_eq!(lru.evict_oldest(), Some("a".to_string()));
        assert_eq!(lru.evict_oldest(), Some("c".to_string()));
        assert_eq!(lru.evict_oldest(), Some("b".to_string()));
    }

    #[test]
    fn test_lru_evict_batch_oldest_first() {
        let mut lru = LruTracker::new();
        for key in ["a", "b", "c", "d", "e"] {
            lru.touch(key);
        }
        lru.touch("a");

        assert_eq!(lru.evict_batch(2), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(lru.len(), 3);
        assert_eq!(lru.evict_batch(10).len(), 3);
        assert!(lru.is_empty());
    }

    #[test]
    fn test_lru_touch_same_key_multiple_times() {
        let mut lru = LruTracker::new();

        lru.touch("key1");
        lru.touch("key1");
        lru.touch("key1");

        assert_eq!(lru.len(), 1);
        assert_eq!(lru.evict_oldest(), Some("key1".to_string()));
        assert!(lru.is_empty());
    }
}
