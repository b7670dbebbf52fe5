//! Rate Limit Module
//!
//! Fixed-window admission control with named per-endpoint presets.

mod config;
mod entry;
mod limiter;

pub use config::{rate_limit_key, RateLimitConfig, RateLimitPreset};
pub use entry::{RateLimitDecision, RateLimitEntry};
pub use limiter::RateLimiter;
