//! L2 tier: JSON-encoded records in a shared byte store.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{alias_key, id_key, ByteStore};
use crate::error::{Result, ServiceError};
use crate::models::Record;
use crate::repository::Repository;

pub struct DistributedRepository<R> {
    store: Arc<dyn ByteStore>,
    ttl: Duration,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> DistributedRepository<R> {
    pub fn new(store: Arc<dyn ByteStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            _record: PhantomData,
        }
    }

    async fn load(&self, key: &str) -> Result<R> {
        let bytes = self
            .store
            .get(key)
            .await?
            .ok_or_else(|| ServiceError::NotFound(key.to_string()))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::Conversion(format!("{}: {}", key, e)))
    }

    async fn save(&self, record: &R) -> Result<R::Id> {
        let id = record.require_id()?;
        let bytes = serde_json::to_vec(record)?;
        if let Some(key) = record.alias().and_then(alias_key::<R>) {
            self.store.set(&key, bytes.clone(), self.ttl).await?;
        }
        self.store.set(&id_key::<R>(&id), bytes, self.ttl).await?;
        Ok(id)
    }
}

#[async_trait]
impl<R: Record> Repository<R> for DistributedRepository<R> {
    fn tier(&self) -> &'static str {
        self.store.backend()
    }

    async fn get_by_id(&self, id: &R::Id) -> Result<R> {
        self.load(&id_key::<R>(id)).await
    }

    async fn get_by_alias(&self, alias: &str) -> Result<R> {
        let key = alias_key::<R>(alias)
            .ok_or_else(|| ServiceError::NotFound(format!("{} has no alias", R::ENTITY)))?;
        self.load(&key).await
    }

    async fn create(&self, record: R) -> Result<R::Id> {
        self.save(&record).await
    }

    async fn update(&self, record: R) -> Result<R> {
        self.save(&record).await?;
        Ok(record)
    }

    async fn delete(&self, id: &R::Id) -> Result<R> {
        let key = id_key::<R>(id);
        let removed = self.load(&key).await;
        if let Some(alias) = removed.as_ref().ok().and_then(R::alias) {
            self.delete_alias(alias).await?;
        }
        if !self.store.delete(&key).await? {
            return Err(ServiceError::NotFound(key));
        }
        removed
    }

    async fn delete_alias(&self, alias: &str) -> Result<()> {
        if let Some(key) = alias_key::<R>(alias) {
            self.store.delete(&key).await?;
        }
        Ok(())
    }
}
