//! Rate Limit Middleware
//!
//! Admission control in front of every route. A refused request never
//! reaches its handler and is answered with 429 and `Retry-After`.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::handlers::AppState;
use crate::error::ShieldError;
use crate::rate_limit::{rate_limit_key, RateLimitPreset};

/// Header naming an authenticated user; preferred over the client address.
pub const USER_ID_HEADER: &str = "x-user-id";

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Identity used in limiter keys: user id, else first forwarded address,
/// else `anonymous`.
///
/// Both headers are taken as-is, so they must be set by a trusted upstream
/// (auth gateway, reverse proxy) that strips client-supplied values. A client
/// that reaches this server directly can pick a fresh identity per request.
pub fn client_identity(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    if let Some(user) = header(USER_ID_HEADER) {
        return format!("user:{}", user);
    }

    header("x-forwarded-for")
        .and_then(|list| list.split(',').next())
        .map(|addr| format!("ip:{}", addr.trim()))
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Reads use the default preset, anything that mutates uses the strict one.
pub fn preset_for(method: &Method) -> RateLimitPreset {
    if *method == Method::GET || *method == Method::HEAD {
        RateLimitPreset::Default
    } else {
        RateLimitPreset::Strict
    }
}

/// Checks the caller against its preset before running the handler.
///
/// Admitted responses carry `x-ratelimit-remaining` and `x-ratelimit-reset`
/// (Unix seconds, rounded up).
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let preset = preset_for(request.method());
    let key = rate_limit_key(preset.tag(), &client_identity(request.headers()));
    let decision = state.limiter.check(&key, &preset.config());

    if !decision.allowed {
        let retry_after = decision.retry_after.unwrap_or(1);
        warn!(key = %key, retry_after, "Request refused by rate limiter");
        return ShieldError::RateLimited { key, retry_after }.into_response();
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    headers.insert(
        RESET_HEADER,
        HeaderValue::from(decision.reset_at.div_ceil(1000)),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_identity_prefers_user_id() {
        let map = headers(&[("x-user-id", "42"), ("x-forwarded-for", "10.0.0.1")]);
        assert_eq!(client_identity(&map), "user:42");
    }

    #[test]
    fn test_identity_uses_first_forwarded_address() {
        let map = headers(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")]);
        assert_eq!(client_identity(&map), "ip:203.0.113.7");
    }

    #[test]
    fn test_identity_falls_back_to_anonymous() {
        assert_eq!(client_identity(&HeaderMap::new()), "anonymous");
        let map = headers(&[("x-user-id", "  ")]);
        assert_eq!(client_identity(&map), "anonymous");
    }

    #[test]
    fn test_identity_follows_headers_verbatim() {
        let first = headers(&[("x-user-id", "a"), ("x-forwarded-for", "10.0.0.1")]);
        let second = headers(&[("x-user-id", "b"), ("x-forwarded-for", "10.0.0.1")]);
        assert_ne!(client_identity(&first), client_identity(&second));
    }

    #[test]
    fn test_preset_for_method() {
        assert_eq!(preset_for(&Method::GET), RateLimitPreset::Default);
        assert_eq!(preset_for(&Method::HEAD), RateLimitPreset::Default);
        assert_eq!(preset_for(&Method::PUT), RateLimitPreset::Strict);
        assert_eq!(preset_for(&Method::DELETE), RateLimitPreset::Strict);
    }
}
