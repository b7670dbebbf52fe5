//! Request Shield - in-process protection for expensive endpoints
//!
//! Provides a memoizing TTL cache that coalesces concurrent misses, and a
//! fixed-window rate limiter with named per-endpoint presets. Both are
//! single-process: nothing is shared across instances or persisted.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod tasks;

mod lock;

pub use api::AppState;
pub use cache::{CacheStats, QueryCache};
pub use config::Config;
pub use error::{Result, ShieldError};
pub use rate_limit::{RateLimitConfig, RateLimitDecision, RateLimitPreset, RateLimiter};
