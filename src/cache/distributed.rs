//! Distributed cache backends.
//!
//! L2 stores opaque bytes. A missing key is `Ok(None)`; connectivity problems
//! come back as [`ServiceError::Unavailable`] so callers can tell the two apart.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

use crate::cache::LocalCache;
use crate::error::{Result, ServiceError};

// == Byte Store ==
#[async_trait]
pub trait ByteStore: Send + Sync {
    /// Backend name for logs.
    fn backend(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Returns whether a key was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Sets `key` only if it holds no value. Returns whether it was set.
    async fn claim(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<bool>;
}

// == Redis ==
/// Redis-backed store over a shared, auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        info!(redis_url = %url, "Connected distributed cache");
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl ByteStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        debug!(key = %key, hit = value.is_some(), "redis GET");
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn claim(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        debug!(key = %key, claimed = reply.is_some(), "redis SET NX");
        Ok(reply.is_some())
    }
}

// == In-Process ==
/// Byte store kept in process memory, for single-instance deployments and tests.
#[derive(Clone)]
pub struct MemoryByteStore {
    cache: LocalCache<Vec<u8>>,
}

impl MemoryByteStore {
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            cache: LocalCache::new(max_entries, (max_entries / 10).max(1), default_ttl),
        }
    }
}

#[async_trait]
impl ByteStore for MemoryByteStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.cache.get(key).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.is_miss() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.cache.set(key.to_string(), value, Some(ttl)).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        match self.cache.delete(key).await {
            Ok(_) => Ok(true),
            Err(ServiceError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn claim(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<bool> {
        self.cache.set_if_absent(key.to_string(), value, Some(ttl)).await
    }
}
