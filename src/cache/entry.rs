//! Cache Entry Module
//!
//! Defines the keyed wrapper stored by a cache tier, with TTL support.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A cached value plus its lifetime metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now.
    pub fn new(value: V, ttl: Duration) -> Self {
        let now = current_timestamp_ms();
        Self {
            value,
            created_at: now,
            expires_at: now.saturating_add(ttl.as_millis() as u64),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches the expiration time,
    /// so a zero TTL produces an entry that is never readable.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
