//! L1 tier: a typed process-local cache.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::{alias_key, id_key, LocalCache};
use crate::error::{Result, ServiceError};
use crate::models::Record;
use crate::repository::Repository;

/// Caches whole records under `"<entity>:<id>"` and, for entities with a
/// secondary attribute, a second copy under `"<entity>:<field>:<value>"`.
pub struct LocalRepository<R> {
    cache: LocalCache<R>,
    ttl: Duration,
}

impl<R: Record> LocalRepository<R> {
    pub fn new(cache: LocalCache<R>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Shared handle to the underlying cache, for stats and the sweep task.
    pub fn cache(&self) -> &LocalCache<R> {
        &self.cache
    }

    async fn store(&self, record: R) -> Result<R::Id> {
        let id = record.require_id()?;
        if let Some(key) = record.alias().and_then(alias_key::<R>) {
            self.cache.set(key, record.clone(), Some(self.ttl)).await?;
        }
        self.cache.set(id_key::<R>(&id), record, Some(self.ttl)).await?;
        Ok(id)
    }
}

#[async_trait]
impl<R: Record> Repository<R> for LocalRepository<R> {
    fn tier(&self) -> &'static str {
        "local"
    }

    async fn get_by_id(&self, id: &R::Id) -> Result<R> {
        self.cache.get(&id_key::<R>(id)).await
    }

    async fn get_by_alias(&self, alias: &str) -> Result<R> {
        let key = alias_key::<R>(alias)
            .ok_or_else(|| ServiceError::NotFound(format!("{} has no alias", R::ENTITY)))?;
        self.cache.get(&key).await
    }

    async fn create(&self, record: R) -> Result<R::Id> {
        self.store(record).await
    }

    async fn update(&self, record: R) -> Result<R> {
        self.store(record.clone()).await?;
        Ok(record)
    }

    async fn delete(&self, id: &R::Id) -> Result<R> {
        let removed = self.cache.delete(&id_key::<R>(id)).await?;
        if let Some(alias) = removed.alias() {
            if let Err(err) = self.delete_alias(alias).await {
                debug!(alias = %alias, error = %err, "alias entry already gone");
            }
        }
        Ok(removed)
    }

    async fn delete_alias(&self, alias: &str) -> Result<()> {
        match alias_key::<R>(alias) {
            Some(key) => self.cache.delete(&key).await.map(|_| ()),
            None => Ok(()),
        }
    }
}
