//! In-memory search index.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::models::Record;
use crate::search::{tokenize, IndexDocument, SearchIndex, MATCH_ALL};

pub struct MemoryIndex<R: Record> {
    documents: RwLock<HashMap<R::Id, IndexDocument<R>>>,
}

impl<R: Record> Default for MemoryIndex<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> MemoryIndex<R> {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    async fn upsert(&self, record: &R) -> Result<R::Id> {
        let document = IndexDocument::from_record(record)?;
        let id = document.id.clone();
        self.documents.write().await.insert(id.clone(), document);
        debug!(entity = R::ENTITY, id = %id, "document indexed");
        Ok(id)
    }
}

#[async_trait]
impl<R: Record> SearchIndex<R> for MemoryIndex<R> {
    async fn index(&self, record: R) -> Result<R::Id> {
        self.upsert(&record).await
    }

    async fn update(&self, record: R) -> Result<()> {
        self.upsert(&record).await.map(|_| ())
    }

    async fn delete(&self, id: &R::Id) -> Result<()> {
        if self.documents.write().await.remove(id).is_some() {
            debug!(entity = R::ENTITY, id = %id, "document removed");
        }
        Ok(())
    }

    async fn search(&self, query: &str, limit: usize, offset: usize) -> Result<Vec<R>> {
        let query = query.trim();
        let terms = if query.is_empty() || query == MATCH_ALL {
            Vec::new()
        } else {
            tokenize(query)
        };
        // A query made only of separators matches nothing
        if terms.is_empty() && !(query.is_empty() || query == MATCH_ALL) {
            return Ok(Vec::new());
        }

        let documents = self.documents.read().await;
        let mut hits: Vec<(usize, &IndexDocument<R>)> = documents
            .values()
            .map(|doc| (doc.relevance(&terms), doc))
            .filter(|(relevance, _)| terms.is_empty() || *relevance > 0)
            .collect();

        hits.sort_by(|(ra, a), (rb, b)| rb.cmp(ra).then_with(|| a.rank_order(b)));

        Ok(hits
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, doc)| doc.record.clone())
            .collect())
    }

    async fn document(&self, id: &R::Id) -> Result<Option<R>> {
        Ok(self
            .documents
            .read()
            .await
            .get(id)
            .map(|doc| doc.record.clone()))
    }

    async fn len(&self) -> usize {
        self.documents.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Hotel;

    fn hotel(id: &str, name: &str, rating: f64) -> Hotel {
        Hotel {
            id: Some(id.into()),
            name: name.into(),
            city: "Austin".into(),
            rating,
            ..Default::default()
        }
    }

    async fn seeded() -> MemoryIndex<Hotel> {
        let index = MemoryIndex::new();
        index.index(hotel("1", "Sheraton Downtown", 4.0)).await.unwrap();
        index.index(hotel("2", "Hilton Garden", 4.8)).await.unwrap();
        index.index(hotel("3", "Sheraton Airport", 3.5)).await.unwrap();
        index.index(hotel("4", "Motel Downtown", 4.0)).await.unwrap();
        index
    }

    fn ids(hotels: &[Hotel]) -> Vec<&str> {
        hotels.iter().filter_map(|h| h.id.as_deref()).collect()
    }

    #[tokio::test]
    async fn test_relevance_then_rank_then_id() {
        let index = seeded().await;

        let results = index.search("sheraton downtown", 10, 0).await.unwrap();
        // "1" matches both terms; "4" outranks "3" among single matches
        assert_eq!(ids(&results), vec!["1", "4", "3"]);
    }

    #[tokio::test]
    async fn test_match_all_orders_by_rank() {
        let index = seeded().await;
        for query in ["", "*", "  "] {
            let results = index.search(query, 10, 0).await.unwrap();
            assert_eq!(ids(&results), vec!["2", "1", "4", "3"]);
        }
    }

    #[tokio::test]
    async fn test_limit_and_offset() {
        let index = seeded().await;
        let page = index.search("*", 2, 1).await.unwrap();
        assert_eq!(ids(&page), vec!["1", "4"]);
        assert!(index.search("*", 2, 10).await.unwrap().is_empty());
        assert!(index.search("*", 0, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_match() {
        let index = seeded().await;
        assert!(index.search("marriott", 10, 0).await.unwrap().is_empty());
        assert!(index.search("--", 10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_double_index_keeps_one_document() {
        let index = MemoryIndex::new();
        index.index(hotel("1", "Sheraton", 4.0)).await.unwrap();
        index.index(hotel("1", "Sheraton", 4.0)).await.unwrap();

        assert_eq!(index.len().await, 1);
        assert_eq!(index.search("sheraton", 10, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_replaces_and_delete_is_idempotent() {
        let index = seeded().await;
        index.update(hotel("1", "Westin", 4.0)).await.unwrap();
        assert_eq!(ids(&index.search("sheraton", 10, 0).await.unwrap()), vec!["3"]);
        assert_eq!(
            index.document(&"1".to_string()).await.unwrap().unwrap().name,
            "Westin"
        );

        index.delete(&"1".to_string()).await.unwrap();
        index.delete(&"1".to_string()).await.unwrap();
        assert!(index.document(&"1".to_string()).await.unwrap().is_none());
        assert_eq!(index.len().await, 3);
    }
}
