//! Index documents: a record projection plus its searchable terms.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::error::Result;
use crate::models::Record;

/// Lowercased alphanumeric tokens of `text`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDocument<R: Record> {
    pub id: R::Id,
    pub terms: BTreeSet<String>,
    pub rank: f64,
    /// Projection returned by queries
    pub record: R,
}

impl<R: Record> IndexDocument<R> {
    pub fn from_record(record: &R) -> Result<Self> {
        let id = record.require_id()?;
        Ok(Self {
            id,
            terms: tokenize(&record.search_text()).into_iter().collect(),
            rank: record.rank(),
            record: record.index_view(),
        })
    }

    /// Number of query terms matching a document term by prefix.
    pub fn relevance(&self, query_terms: &[String]) -> usize {
        query_terms
            .iter()
            .filter(|q| {
                self.terms
                    .range(q.to_string()..)
                    .next()
                    .is_some_and(|term| term.starts_with(q.as_str()))
            })
            .count()
    }

    /// Result ordering for documents of equal relevance.
    pub fn rank_order(&self, other: &Self) -> Ordering {
        other
            .rank
            .total_cmp(&self.rank)
            .then_with(|| self.id.cmp(&other.id))
    }
}
