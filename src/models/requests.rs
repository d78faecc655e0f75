//! Request DTOs for the HTTP surface
//!
//! Defines the structure of incoming query strings.

use serde::Deserialize;

use crate::error::{Result, ServiceError};

/// Default page size when `limit` is omitted.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Query string of `GET /search?q=<text>&limit=<n>&offset=<n>`
///
/// Numbers are kept as strings so malformed values surface as a
/// validation error with a readable message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub offset: Option<String>,
}

/// Validated search page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    pub query: String,
    pub limit: usize,
    pub offset: usize,
}

impl SearchParams {
    /// Validates the parameters against the configured maximum page size.
    pub fn validate(&self, max_limit: usize) -> Result<SearchPage> {
        let limit = parse_count("limit", self.limit.as_deref())?.unwrap_or(DEFAULT_SEARCH_LIMIT);
        if limit == 0 || limit > max_limit {
            return Err(ServiceError::Validation(format!(
                "limit must be between 1 and {}",
                max_limit
            )));
        }
        let offset = parse_count("offset", self.offset.as_deref())?.unwrap_or(0);

        Ok(SearchPage {
            query: self.q.clone().unwrap_or_default(),
            limit,
            offset,
        })
    }
}

fn parse_count(name: &str, raw: Option<&str>) -> Result<Option<usize>> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v.parse::<usize>().map(Some).map_err(|_| {
            ServiceError::Validation(format!("{} must be a non-negative integer, got '{}'", name, v))
        }),
    }
}
