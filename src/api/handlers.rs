//! API Handlers
//!
//! HTTP request handlers for the diagnostic and admin endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use regex::Regex;
use serde_json::Value;

use crate::cache::{duration_ms, QueryCache};
use crate::config::Config;
use crate::error::{Result, ShieldError};
use crate::models::{
    HealthResponse, InvalidatePatternRequest, PeekQuery, RateLimitStatusResponse, RemovedResponse,
    SetResponse, SetValueRequest, StatsResponse, ValueResponse,
};
use crate::rate_limit::{RateLimitPreset, RateLimiter};

/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Application state shared across all handlers.
///
/// Both components are explicit instances: tests build their own state
/// instead of sharing process-wide globals.
#[derive(Clone)]
pub struct AppState {
    /// JSON value cache
    pub cache: QueryCache<Value>,
    /// Admission control for every route
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(cache: QueryCache<Value>, limiter: RateLimiter) -> Self {
        Self {
            cache,
            limiter: Arc::new(limiter),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// The limiter starts its background sweep, so this needs a tokio runtime.
    pub fn from_config(config: &Config) -> Self {
        Self::new(QueryCache::from_config(config), RateLimiter::from_config(config))
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ShieldError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(ShieldError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

/// Handler for GET /cache/:key
pub async fn get_value_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ValueResponse>> {
    validate_key(&key)?;

    let value = state
        .cache
        .get(&key)
        .ok_or_else(|| ShieldError::NotFound(key.clone()))?;

    Ok(Json(ValueResponse::new(key, value)))
}

/// Handler for PUT /cache/:key
///
/// Stores a JSON value with an optional TTL in milliseconds.
pub async fn set_value_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetValueRequest>,
) -> Result<Json<SetResponse>> {
    validate_key(&key)?;

    let ttl = match req.ttl_ms {
        Some(0) => {
            return Err(ShieldError::InvalidRequest(
                "ttl_ms must be greater than zero".to_string(),
            ))
        }
        Some(ms) => Duration::from_millis(ms),
        None => state.cache.default_ttl(),
    };

    state.cache.set(key.clone(), req.value, ttl);

    Ok(Json(SetResponse::new(key, duration_ms(ttl))))
}

/// Handler for DELETE /cache/:key
pub async fn delete_value_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RemovedResponse>> {
    validate_key(&key)?;

    let removed = state.cache.invalidate(&key);
    Ok(Json(RemovedResponse::new(usize::from(removed))))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<RemovedResponse> {
    let removed = state.cache.len();
    state.cache.clear();
    Json(RemovedResponse::new(removed))
}

/// Handler for POST /invalidate
pub async fn invalidate_pattern_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidatePatternRequest>,
) -> Result<Json<RemovedResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ShieldError::InvalidRequest(error_msg));
    }

    let pattern = Regex::new(&req.pattern).map_err(|err| ShieldError::InvalidPattern {
        pattern: req.pattern.clone(),
        reason: err.to_string(),
    })?;

    Ok(Json(RemovedResponse::new(
        state.cache.invalidate_pattern(&pattern),
    )))
}

/// Handler for GET /rate-limit/:key
///
/// Reports the standing of a limiter key without consuming a request.
pub async fn peek_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<PeekQuery>,
) -> Result<Json<RateLimitStatusResponse>> {
    let preset = match query.preset.as_deref() {
        Some(name) => name.parse::<RateLimitPreset>()?,
        None => RateLimitPreset::Default,
    };

    let decision = state.limiter.peek(&key, &preset.config());
    Ok(Json(RateLimitStatusResponse::new(key, preset, decision)))
}

/// Handler for DELETE /rate-limit/:key
pub async fn reset_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<RemovedResponse> {
    let removed = state.limiter.reset(&key);
    Json(RemovedResponse::new(usize::from(removed)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        &state.cache.stats(),
        state.cache.in_flight(),
        state.limiter.len(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
