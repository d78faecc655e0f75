//! In-memory system of record.
//!
//! Assigns identifiers, enforces unique secondary attributes and applies
//! partial updates. Real storage drivers implement [`Repository`] the same way.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, ServiceError};
use crate::models::{Record, RecordId};
use crate::repository::Repository;

struct Tables<R: Record> {
    records: BTreeMap<R::Id, R>,
    aliases: HashMap<String, R::Id>,
}

pub struct MemoryRecordStore<R: Record> {
    tables: RwLock<Tables<R>>,
    sequence: AtomicU64,
}

impl<R: Record> Default for MemoryRecordStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> MemoryRecordStore<R> {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                records: BTreeMap::new(),
                aliases: HashMap::new(),
            }),
            sequence: AtomicU64::new(0),
        }
    }

    pub async fn len(&self) -> usize {
        self.tables.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn not_found(id: &R::Id) -> ServiceError {
        ServiceError::NotFound(format!("{} {}", R::ENTITY, id))
    }

    fn conflict(alias: &str) -> ServiceError {
        ServiceError::Conflict(format!(
            "{} '{}' already exists",
            R::ALIAS_FIELD.unwrap_or("alias"),
            alias
        ))
    }
}

#[async_trait]
impl<R: Record> Repository<R> for MemoryRecordStore<R> {
    fn tier(&self) -> &'static str {
        "primary"
    }

    async fn get_by_id(&self, id: &R::Id) -> Result<R> {
        self.tables
            .read()
            .await
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found(id))
    }

    async fn get_by_alias(&self, alias: &str) -> Result<R> {
        let tables = self.tables.read().await;
        tables
            .aliases
            .get(alias)
            .and_then(|id| tables.records.get(id))
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("{} '{}'", R::ENTITY, alias)))
    }

    async fn create(&self, mut record: R) -> Result<R::Id> {
        record.validate()?;

        let mut tables = self.tables.write().await;
        let alias = record.alias().map(str::to_string);
        if let Some(alias) = &alias {
            if tables.aliases.contains_key(alias) {
                return Err(Self::conflict(alias));
            }
        }

        let id = R::Id::from_sequence(self.sequence.fetch_add(1, Ordering::SeqCst) + 1);
        record.set_id(id.clone());
        if let Some(alias) = alias {
            tables.aliases.insert(alias, id.clone());
        }
        tables.records.insert(id.clone(), record);

        debug!(entity = R::ENTITY, id = %id, "record created");
        Ok(id)
    }

    async fn update(&self, patch: R) -> Result<R> {
        let id = patch.require_id()?;

        let mut tables = self.tables.write().await;
        let current = tables.records.get(&id).ok_or_else(|| Self::not_found(&id))?;
        let old_alias = current.alias().map(str::to_string);

        let mut merged = current.clone();
        if !merged.merge(patch) {
            return Err(ServiceError::Validation("no fields to update".into()));
        }
        merged.validate()?;

        let new_alias = merged.alias().map(str::to_string);
        if new_alias != old_alias {
            if let Some(alias) = &new_alias {
                if tables.aliases.get(alias).is_some_and(|owner| *owner != id) {
                    return Err(Self::conflict(alias));
                }
            }
            if let Some(alias) = &old_alias {
                tables.aliases.remove(alias);
            }
            if let Some(alias) = new_alias {
                tables.aliases.insert(alias, id.clone());
            }
        }

        tables.records.insert(id, merged.clone());
        Ok(merged)
    }

    async fn delete(&self, id: &R::Id) -> Result<R> {
        let mut tables = self.tables.write().await;
        let removed = tables.records.remove(id).ok_or_else(|| Self::not_found(id))?;
        if let Some(alias) = removed.alias() {
            tables.aliases.remove(alias);
        }
        Ok(removed)
    }
}
