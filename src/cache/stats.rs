//! Cache Statistics Module
//!
//! Counters kept by a process-local cache.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Reads answered by a live entry
    pub hits: u64,
    /// Reads of an absent or expired key
    pub misses: u64,
    /// Entries dropped by size-based pruning
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
    /// Number of prune passes triggered by the size bound
    pub prunes: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Records one prune pass that removed `evicted` live entries.
    pub fn record_prune(&mut self, evicted: usize) {
        self.prunes += 1;
        self.evictions += evicted as u64;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
