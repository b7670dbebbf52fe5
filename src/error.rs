//! Error types for the request shield
//!
//! Provides unified error handling using thiserror.

use std::error::Error as StdError;
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Boxed error as returned by cache producers, shared between coalesced callers.
pub type SharedSource = Arc<dyn StdError + Send + Sync + 'static>;

// == Shield Error Enum ==
/// Unified error type for the cache, the limiter and the HTTP surface.
///
/// `Clone` is required: a single producer failure is handed to every caller
/// awaiting the same in-flight fetch.
#[derive(Error, Debug, Clone)]
pub enum ShieldError {
    /// The producer behind `get_or_set` failed; the failure was not cached
    #[error("Producer for key '{key}' failed: {source}")]
    Producer {
        key: String,
        #[source]
        source: SharedSource,
    },

    /// Rate limit configuration with a zero window or zero ceiling
    #[error("Invalid rate limit config: {0}")]
    InvalidConfig(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalidation pattern that is not a valid regular expression
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Admission refused by the rate limiter
    #[error("Rate limit exceeded for '{key}', retry after {retry_after}s")]
    RateLimited { key: String, retry_after: u64 },
}

impl ShieldError {
    /// Wraps a producer failure for `key`.
    pub fn producer<E>(key: &str, err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        let boxed: Box<dyn StdError + Send + Sync + 'static> = err.into();
        ShieldError::Producer {
            key: key.to_string(),
            source: Arc::from(boxed),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ShieldError::Producer { .. } => StatusCode::BAD_GATEWAY,
            ShieldError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ShieldError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ShieldError::InvalidPattern { .. } => StatusCode::BAD_REQUEST,
            ShieldError::NotFound(_) => StatusCode::NOT_FOUND,
            ShieldError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ShieldError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ShieldError::RateLimited { retry_after, .. } => json!({
                "error": self.to_string(),
                "retry_after": retry_after,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        let mut response = (status, Json(body)).into_response();
        if let ShieldError::RateLimited { retry_after, .. } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }
        response
    }
}

// == Result Type Alias ==
/// Convenience Result type for the request shield.
pub type Result<T> = std::result::Result<T, ShieldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_producer_error_keeps_source_message() {
        let err = ShieldError::producer("story:1", "database unavailable");
        assert!(err.to_string().contains("story:1"));
        assert!(err.to_string().contains("database unavailable"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_producer_error_clones_share_source() {
        let err = ShieldError::producer("k", std::io::Error::other("boom"));
        let copy = err.clone();
        match (err, copy) {
            (
                ShieldError::Producer { source: a, .. },
                ShieldError::Producer { source: b, .. },
            ) => assert!(Arc::ptr_eq(&a, &b)),
            _ => panic!("expected producer errors"),
        }
    }

    #[test]
    fn test_rate_limited_response_has_retry_after() {
        let response = ShieldError::RateLimited {
            key: "auth:1.2.3.4".to_string(),
            retry_after: 42,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response = ShieldError::NotFound("missing".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }
}
