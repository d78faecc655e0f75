//! Secondary search index kept eventually consistent by the event consumer.

mod document;
mod memory;

#[cfg(test)]
mod property_tests;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Record;

pub use document::{tokenize, IndexDocument};
pub use memory::MemoryIndex;

/// Query that matches every document.
pub const MATCH_ALL: &str = "*";

// == Search Index ==
/// Upsert and delete are idempotent, so replayed events converge.
#[async_trait]
pub trait SearchIndex<R: Record>: Send + Sync {
    /// Adds or replaces the document for `record` and returns its id.
    async fn index(&self, record: R) -> Result<R::Id>;

    /// Replaces the document for `record`, adding it if missing.
    async fn update(&self, record: R) -> Result<()>;

    /// Removes a document. Removing an absent document succeeds.
    async fn delete(&self, id: &R::Id) -> Result<()>;

    /// Matching records ordered by relevance, then rank descending, then id.
    async fn search(&self, query: &str, limit: usize, offset: usize) -> Result<Vec<R>>;

    async fn document(&self, id: &R::Id) -> Result<Option<R>>;

    async fn len(&self) -> usize;
}
