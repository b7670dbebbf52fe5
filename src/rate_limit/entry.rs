//! Rate Limit Entry Module
//!
//! Per-key window state and the decision returned by a check.

use serde::Serialize;

use crate::cache::duration_ms;
use crate::rate_limit::RateLimitConfig;

// == Rate Limit Entry ==
/// Requests admitted for one key in its current fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Requests admitted so far in this window
    pub count: u32,
    /// End of the window (Unix milliseconds)
    pub reset_at: u64,
}

impl RateLimitEntry {
    /// Opens a window at `now` with its first request already counted.
    pub fn start(now: u64, config: &RateLimitConfig) -> Self {
        Self {
            count: 1,
            reset_at: now.saturating_add(duration_ms(config.window())),
        }
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.reset_at
    }
}

// == Rate Limit Decision ==
/// Outcome of a check or peek.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// End of the window (Unix milliseconds)
    pub reset_at: u64,
    /// Seconds until the window resets, only set when refused
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl RateLimitDecision {
    pub(crate) fn allowed(remaining: u32, reset_at: u64) -> Self {
        Self {
            allowed: true,
            remaining,
            reset_at,
            retry_after: None,
        }
    }

    /// Refusal, with `retry_after` rounded up to whole seconds.
    pub(crate) fn refused(reset_at: u64, now: u64) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            reset_at,
            retry_after: Some(reset_at.saturating_sub(now).div_ceil(1000)),
        }
    }
}
