//! Process-local cache shared by every request task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::cache::{CacheStats, CacheStore};
use crate::error::Result;

/// Thread-safe handle over a [`CacheStore`]. Cloning shares the same store.
///
/// Reads take the write lock as well, since a hit updates LRU order and stats.
#[derive(Debug)]
pub struct LocalCache<V> {
    inner: Arc<RwLock<CacheStore<V>>>,
}

impl<V> Clone for LocalCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Clone + Send + Sync> LocalCache<V> {
    pub fn new(max_entries: usize, prune_batch: usize, default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheStore::new(
                max_entries,
                prune_batch,
                default_ttl,
            ))),
        }
    }

    pub async fn get(&self, key: &str) -> Result<V> {
        self.inner.write().await.get(key)
    }

    pub async fn set(&self, key: String, value: V, ttl: Option<Duration>) -> Result<()> {
        self.inner.write().await.set(key, value, ttl)
    }

    /// Stores `value` unless a live entry already holds `key`. Returns whether it was stored.
    pub async fn set_if_absent(&self, key: String, value: V, ttl: Option<Duration>) -> Result<bool> {
        let mut store = self.inner.write().await;
        if store.contains_live(&key) {
            return Ok(false);
        }
        store.set(key, value, ttl)?;
        Ok(true)
    }

    pub async fn delete(&self, key: &str) -> Result<V> {
        self.inner.write().await.delete(key)
    }

    pub async fn cleanup_expired(&self) -> usize {
        self.inner.write().await.cleanup_expired()
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.read().await.stats()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
