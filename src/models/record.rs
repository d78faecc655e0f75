//! Record abstraction shared by every tier, the event pipeline and the index.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Result, ServiceError};

// == Record Id ==
/// Identifier type assigned by the system of record.
pub trait RecordId:
    Clone + Debug + Display + Eq + Hash + Ord + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Builds the identifier for the n-th record created by a store.
    fn from_sequence(seq: u64) -> Self;

    /// Parses an identifier from a path segment or an event field.
    fn parse_id(raw: &str) -> Result<Self>;
}

impl RecordId for String {
    fn from_sequence(seq: u64) -> Self {
        seq.to_string()
    }

    fn parse_id(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ServiceError::Validation("identifier cannot be empty".into()));
        }
        if raw.chars().any(|c| c.is_whitespace() || c == ':') {
            return Err(ServiceError::Validation(format!(
                "identifier '{}' contains forbidden characters",
                raw
            )));
        }
        Ok(raw.to_string())
    }
}

impl RecordId for i64 {
    fn from_sequence(seq: u64) -> Self {
        seq as i64
    }

    fn parse_id(raw: &str) -> Result<Self> {
        match raw.trim().parse::<i64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(ServiceError::Validation(format!(
                "identifier '{}' is not a positive integer",
                raw
            ))),
        }
    }
}

// == Record ==
/// A domain entity stored by the chain.
///
/// Implementors describe how they are keyed, validated, merged on partial
/// updates and projected into the search index.
pub trait Record:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Id: RecordId;

    /// Singular entity name used in cache keys and event fields (`hotel`).
    const ENTITY: &'static str;

    /// Collection segment used by the record service URLs (`hotels`).
    const COLLECTION: &'static str;

    /// Name of the unique secondary attribute, if the entity has one.
    const ALIAS_FIELD: Option<&'static str> = None;

    fn id(&self) -> Option<&Self::Id>;

    fn set_id(&mut self, id: Self::Id);

    /// Value of the unique secondary attribute.
    fn alias(&self) -> Option<&str> {
        None
    }

    /// Checks the invariants of a storable record, on create and after every merge.
    fn validate(&self) -> Result<()>;

    /// Overwrites fields with the non-empty/non-zero fields of `patch`.
    ///
    /// Returns false when the patch carried no field at all.
    fn merge(&mut self, patch: Self) -> bool;

    /// Free text matched by search queries.
    fn search_text(&self) -> String;

    /// Secondary sort key for search results, higher first.
    fn rank(&self) -> f64 {
        0.0
    }

    /// Projection stored in the search index.
    fn index_view(&self) -> Self {
        self.clone()
    }

    /// Identifier or a validation error when the record has none yet.
    fn require_id(&self) -> Result<Self::Id> {
        self.id().cloned().ok_or_else(|| {
            ServiceError::Validation(format!("{} identifier is required", Self::ENTITY))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_id_parsing() {
        assert_eq!(String::parse_id(" 42 ").unwrap(), "42");
        assert!(matches!(
            String::parse_id(""),
            Err(ServiceError::Validation(_))
        ));
        assert!(String::parse_id("a:b").is_err());
    }

    #[test]
    fn test_integer_id_parsing() {
        assert_eq!(i64::parse_id("7").unwrap(), 7);
        assert!(i64::parse_id("0").is_err());
        assert!(i64::parse_id("-3").is_err());
        assert!(i64::parse_id("abc").is_err());
    }

    #[test]
    fn test_ids_from_sequence() {
        assert_eq!(String::from_sequence(42), "42");
        assert_eq!(i64::from_sequence(3), 3);
    }
}
