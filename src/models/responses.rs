//! Response DTOs for the shield API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;
use crate::rate_limit::{RateLimitConfig, RateLimitDecision, RateLimitPreset};

/// Response body for `GET /cache/:key`
#[derive(Debug, Clone, Serialize)]
pub struct ValueResponse {
    pub key: String,
    pub value: Value,
}

impl ValueResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for `PUT /cache/:key`
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
    /// Effective TTL in milliseconds
    pub ttl_ms: u64,
}

impl SetResponse {
    pub fn new(key: impl Into<String>, ttl_ms: u64) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' cached for {} ms", key, ttl_ms),
            key,
            ttl_ms,
        }
    }
}

/// Response body for the invalidation and reset endpoints
#[derive(Debug, Clone, Serialize)]
pub struct RemovedResponse {
    /// Number of entries removed
    pub removed: usize,
}

impl RemovedResponse {
    pub fn new(removed: usize) -> Self {
        Self { removed }
    }
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Current number of cache entries
    pub size: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Producer calls currently in flight
    pub in_flight: usize,
    /// Keys currently tracked by the rate limiter
    pub rate_limit_entries: usize,
}

impl StatsResponse {
    pub fn new(stats: &CacheStats, in_flight: usize, rate_limit_entries: usize) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            size: stats.size,
            hit_rate: stats.hit_rate(),
            in_flight,
            rate_limit_entries,
        }
    }
}

/// Response body for `GET /rate-limit/:key`
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatusResponse {
    pub key: String,
    pub preset: String,
    pub window_ms: u64,
    pub max_requests: u32,
    #[serde(flatten)]
    pub decision: RateLimitDecision,
}

impl RateLimitStatusResponse {
    pub fn new(key: impl Into<String>, preset: RateLimitPreset, decision: RateLimitDecision) -> Self {
        let config: RateLimitConfig = preset.config();
        Self {
            key: key.into(),
            preset: preset.to_string(),
            window_ms: config.window_ms(),
            max_requests: config.max_requests(),
            decision,
        }
    }
}

/// Response body for `GET /health`
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
    use serde_json::json;

    #[test]
    fn test_set_response_serialize() {
        let json = serde_json::to_string(&SetResponse::new("story:1", 1500)).unwrap();
        assert!(json.contains("story:1"));
        assert!(json.contains("1500"));
    }

    #[test]
    fn test_stats_response_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            evictions: 5,
            size: 100,
        };
        let resp = StatsResponse::new(&stats, 2, 7);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.rate_limit_entries, 7);
    }

    #[test]
    fn test_stats_response_zero_requests() {
        let resp = StatsResponse::new(&CacheStats::new(), 0, 0);
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_rate_limit_status_flattens_decision() {
        let decision = RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_at: 1_000,
            retry_after: Some(4),
        };
        let value = serde_json::to_value(RateLimitStatusResponse::new(
            "auth:1.2.3.4",
            RateLimitPreset::Auth,
            decision,
        ))
        .unwrap();

        assert_eq!(value["preset"], "auth");
        assert_eq!(value["max_requests"], 5);
        assert_eq!(value["allowed"], false);
        assert_eq!(value["retry_after"], 4);
    }

    #[test]
    fn test_value_response_serialize() {
        let value = serde_json::to_value(ValueResponse::new("k", json!([1, 2]))).unwrap();
        assert_eq!(value["value"], json!([1, 2]));
    }

    #[test]
    fn test_health_response_serialize() {
        let json = serde_json::to_string(&HealthResponse::healthy()).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
