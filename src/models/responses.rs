//! Response DTOs for the HTTP surface
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::chain::ChainStatsSnapshot;

/// Response body for `POST /hotels` and `POST /users`
#[derive(Debug, Clone, Serialize)]
pub struct CreatedResponse<I> {
    /// Identifier assigned by the system of record
    pub id: I,
}

impl<I> CreatedResponse<I> {
    pub fn new(id: I) -> Self {
        Self { id }
    }
}

/// Response body for `DELETE /hotels/:id` and `DELETE /users/:id`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The identifier that was deleted
    pub id: String,
}

impl DeleteResponse {
    pub fn new(entity: &str, id: impl ToString) -> Self {
        let id = id.to_string();
        Self {
            message: format!("{} '{}' deleted successfully", entity, id),
            id,
        }
    }
}

/// Counters for one entity type.
#[derive(Debug, Clone, Serialize)]
pub struct EntityStats {
    /// Process-local cache counters
    pub local_cache: CacheStats,
    /// Hit rate of the process-local cache
    pub local_hit_rate: f64,
    /// Orchestrator counters across all tiers
    pub chain: ChainStatsSnapshot,
    /// Documents currently held by the search index
    pub indexed_documents: usize,
}

impl EntityStats {
    pub fn new(local_cache: CacheStats, chain: ChainStatsSnapshot, indexed_documents: usize) -> Self {
        Self {
            local_hit_rate: local_cache.hit_rate(),
            local_cache,
            chain,
            indexed_documents,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hotels: EntityStats,
    pub users: EntityStats,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_response_keeps_id_type() {
        let json = serde_json::to_value(CreatedResponse::new(7i64)).unwrap();
        assert_eq!(json, serde_json::json!({"id": 7}));

        let json = serde_json::to_value(CreatedResponse::new("42".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({"id": "42"}));
    }

    #[test]
    fn test_delete_response_serialize() {
        let resp = DeleteResponse::new("hotel", "42");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("42"));
        assert!(json.contains("deleted"));
    }

    #[test]
    fn test_entity_stats_hit_rate() {
        let mut local = CacheStats::new();
        for _ in 0..4 {
            local.record_hit();
        }
        local.record_miss();
        let stats = EntityStats::new(local, ChainStatsSnapshot::default(), 3);
        assert!((stats.local_hit_rate - 0.8).abs() < 0.001);
        assert_eq!(stats.indexed_documents, 3);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
