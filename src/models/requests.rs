//! Request DTOs for the shield API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

/// Request body for `PUT /cache/:key`
///
/// # Fields
/// - `value`: Any JSON value to memoize
/// - `ttl_ms`: Optional TTL in milliseconds (uses the default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetValueRequest {
    pub value: Value,
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

/// Request body for `POST /invalidate`
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidatePatternRequest {
    /// Regular expression matched against every key
    pub pattern: String,
}

impl InvalidatePatternRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.pattern.is_empty() {
            return Some("Pattern cannot be empty".to_string());
        }
        None
    }
}

/// Query string for `GET /rate-limit/:key`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeekQuery {
    /// Preset name, `default` when absent
    #[serde(default)]
    pub preset: Option<String>,
}
