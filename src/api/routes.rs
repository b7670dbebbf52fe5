//! API Routes
//!
//! Configures the Axum router with all shield endpoints.

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_value_handler, get_value_handler, health_handler,
    invalidate_pattern_handler, peek_handler, reset_handler, set_value_handler, stats_handler,
    AppState,
};
use super::middleware::enforce_rate_limit;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check
/// - `GET /stats` - Cache and limiter statistics
/// - `GET|PUT|DELETE /cache/:key` - Read, store or invalidate one entry
/// - `DELETE /cache` - Clear the cache
/// - `POST /invalidate` - Invalidate every key matching a regex
/// - `GET|DELETE /rate-limit/:key` - Peek at or reset a limiter window
///
/// # Middleware
/// - Rate limiting: every route, `default` preset for reads, `strict` otherwise
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
///
/// The admin routes (`DELETE /cache`, `POST /invalidate`, `DELETE /rate-limit/:key`)
/// carry no authentication; expose this router only behind a trusted gateway.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/cache", delete(clear_handler))
        .route(
            "/cache/:key",
            get(get_value_handler)
                .put(set_value_handler)
                .delete(delete_value_handler),
        )
        .route("/invalidate", post(invalidate_pattern_handler))
        .route("/rate-limit/:key", get(peek_handler).delete(reset_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            enforce_rate_limit,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::QueryCache;
    use crate::rate_limit::RateLimiter;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::time::Duration;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let state = AppState::new(
            QueryCache::new(Duration::from_secs(300), 100),
            RateLimiter::new(),
        );
        create_router(state)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = create_test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-ratelimit-remaining"));
    }

    #[tokio::test]
    async fn test_put_endpoint() {
        let response = create_test_app()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/cache/story:1")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"value":{"title":"hello"}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let response = create_test_app()
            .oneshot(
                Request::builder()
                    .uri("/cache/nonexistent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = create_test_app()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
