//! Cache Store Module
//!
//! Bounded map combining TTL expiration with batch LRU pruning. Not synchronized;
//! see [`LocalCache`](super::LocalCache) for the shared wrapper.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::{CacheEntry, CacheStats, LruTracker, MAX_KEY_LENGTH};
use crate::error::{Result, ServiceError};

// == Cache Store ==
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Entries removed per prune pass once the bound is reached
    prune_batch: usize,
    /// TTL applied when `set` is called without one
    default_ttl: Duration,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a new store.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries (at least 1)
    /// * `prune_batch` - Entries evicted at once when full, clamped to `1..=max_entries`
    /// * `default_ttl` - TTL for entries stored without an explicit one
    pub fn new(max_entries: usize, prune_batch: usize, default_ttl: Duration) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries,
            prune_batch: prune_batch.clamp(1, max_entries),
            default_ttl,
        }
    }

    // == Set ==
    /// Stores a value, resetting its TTL if the key already exists.
    ///
    /// Inserting a new key into a full store first drops expired entries, then
    /// evicts `prune_batch` least recently used ones if still full.
    pub fn set(&mut self, key: String, value: V, ttl: Option<Duration>) -> Result<()> {
        if key.is_empty() {
            return Err(ServiceError::Validation("Key cannot be empty".to_string()));
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(ServiceError::Validation(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.prune();
        }

        let entry = CacheEntry::new(value, ttl.unwrap_or(self.default_ttl));
        self.entries.insert(key.clone(), entry);
        self.lru.touch(&key);
        self.stats.set_total_entries(self.entries.len());

        Ok(())
    }

    fn prune(&mut self) {
        self.cleanup_expired();
        if self.entries.len() < self.max_entries {
            return;
        }

        let victims = self.lru.evict_batch(self.prune_batch);
        for key in &victims {
            self.entries.remove(key);
        }
        self.stats.record_prune(victims.len());
        self.stats.set_total_entries(self.entries.len());
    }

    // == Get ==
    /// Retrieves a live value. Reads never extend the TTL.
    ///
    /// Expired entries are removed and reported as `Expired`, absent ones as `NotFound`.
    pub fn get(&mut self, key: &str) -> Result<V> {
        let expired = match self.entries.get(key) {
            None => {
                self.stats.record_miss();
                return Err(ServiceError::NotFound(key.to_string()));
            }
            Some(entry) => entry.is_expired(),
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            return Err(ServiceError::Expired(key.to_string()));
        }

        self.stats.record_hit();
        self.lru.touch(key);
        self.entries
            .get(key)
            .map(|entry| entry.value.clone())
            .ok_or_else(|| ServiceError::NotFound(key.to_string()))
    }

    /// Whether `key` holds an entry that has not expired. Leaves stats and LRU order alone.
    pub fn contains_live(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|entry| !entry.is_expired())
    }

    // == Delete ==
    /// Removes an entry and returns its value, expired or not.
    pub fn delete(&mut self, key: &str) -> Result<V> {
        self.remove_entry(key)
            .map(|entry| entry.value)
            .ok_or_else(|| ServiceError::NotFound(key.to_string()))
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.lru.remove(key);
            self.stats.set_total_entries(self.entries.len());
        }
        removed
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Cleanup Expired ==
    /// Removes all expired entries and returns how many were dropped.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.stats.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
