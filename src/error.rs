//! Error types for the cache chain
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Service Error Enum ==
/// Unified error type shared by every tier, the event pipeline and the HTTP layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// Key absent or identifier unresolvable at a tier
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entry present but past its TTL
    #[error("Key expired: {0}")]
    Expired(String),

    /// Stored value does not match the expected record shape
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Network or connection failure (L2, system of record, queue)
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Malformed identifier or missing required field
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Duplicate unique field at creation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Caller abandoned the request or its deadline passed
    #[error("Request cancelled: {0}")]
    Cancelled(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// True for errors a read path treats as "try the next tier".
    pub fn is_miss(&self) -> bool {
        matches!(self, ServiceError::NotFound(_) | ServiceError::Expired(_))
    }

    /// Short label used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Expired(_) => "expired",
            ServiceError::Conversion(_) => "conversion",
            ServiceError::Unavailable(_) => "unavailable",
            ServiceError::Validation(_) => "validation",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Cancelled(_) => "cancelled",
            ServiceError::Internal(_) => "internal",
        }
    }
}

// == Conversions ==
impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Conversion(err.to_string())
    }
}

impl From<redis::RedisError> for ServiceError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_timeout()
        {
            ServiceError::Unavailable(format!("redis: {}", err))
        } else {
            ServiceError::Internal(format!("redis: {}", err))
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::Conversion(err.to_string())
        } else {
            ServiceError::Unavailable(err.to_string())
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::NotFound(_) | ServiceError::Expired(_) => StatusCode::NOT_FOUND,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Cancelled(_) => StatusCode::REQUEST_TIMEOUT,
            ServiceError::Conversion(_)
            | ServiceError::Unavailable(_)
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_kinds() {
        assert!(ServiceError::NotFound("k".into()).is_miss());
        assert!(ServiceError::Expired("k".into()).is_miss());
        assert!(!ServiceError::Unavailable("down".into()).is_miss());
        assert!(!ServiceError::Conversion("bad".into()).is_miss());
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::Cancelled("x".into()), StatusCode::REQUEST_TIMEOUT),
            (
                ServiceError::Unavailable("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_json_error_is_conversion() {
        let err: ServiceError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(err.kind(), "conversion");
    }
}
