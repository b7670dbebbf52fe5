//! API Module
//!
//! HTTP surface over the shield: diagnostics, cache administration and the
//! rate-limit middleware that turns refusals into 429 responses.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Cache and limiter statistics
//! - `GET|PUT|DELETE /cache/:key` - Single entry access
//! - `DELETE /cache` - Clear the cache
//! - `POST /invalidate` - Pattern invalidation
//! - `GET|DELETE /rate-limit/:key` - Limiter peek and reset

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use middleware::{client_identity, enforce_rate_limit, preset_for};
pub use routes::create_router;
