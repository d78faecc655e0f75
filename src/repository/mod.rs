//! Repository capability shared by every tier of the chain.
//!
//! The same trait fronts the process-local cache, the distributed cache and
//! the system of record, so the orchestrator treats them uniformly.

mod distributed;
mod http;
mod local;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Result, ServiceError};
use crate::models::Record;

pub use distributed::DistributedRepository;
pub use http::HttpRecordSource;
pub use local::LocalRepository;
pub use memory::MemoryRecordStore;

// == Repository ==
#[async_trait]
pub trait Repository<R: Record>: Send + Sync {
    /// Tier name for logs and statistics.
    fn tier(&self) -> &'static str;

    async fn get_by_id(&self, id: &R::Id) -> Result<R>;

    /// Looks a record up by its unique secondary attribute.
    async fn get_by_alias(&self, alias: &str) -> Result<R> {
        Err(ServiceError::NotFound(format!(
            "{} has no lookup for '{}'",
            R::ENTITY,
            alias
        )))
    }

    /// Stores a record and returns its identifier.
    ///
    /// The system of record assigns the identifier; caches expect it set.
    async fn create(&self, record: R) -> Result<R::Id>;

    /// Applies a record and returns the state now stored.
    async fn update(&self, record: R) -> Result<R>;

    /// Removes a record and returns the state it had.
    async fn delete(&self, id: &R::Id) -> Result<R>;

    /// Drops the entry kept under a secondary attribute value.
    ///
    /// Caches hold that entry apart from the id entry, so it can outlive it.
    /// Tiers that do not key records by alias have nothing to drop.
    async fn delete_alias(&self, _alias: &str) -> Result<()> {
        Ok(())
    }
}

// == Record Source ==
/// Where the index consumer resolves the canonical record behind an event.
#[async_trait]
pub trait RecordSource<R: Record>: Send + Sync {
    async fn fetch(&self, id: &R::Id) -> Result<R>;
}

/// Resolves records straight from an in-process system of record.
pub struct PrimarySource<R: Record> {
    primary: Arc<dyn Repository<R>>,
}

impl<R: Record> PrimarySource<R> {
    pub fn new(primary: Arc<dyn Repository<R>>) -> Self {
        Self { primary }
    }
}

#[async_trait]
impl<R: Record> RecordSource<R> for PrimarySource<R> {
    async fn fetch(&self, id: &R::Id) -> Result<R> {
        self.primary.get_by_id(id).await
    }
}
