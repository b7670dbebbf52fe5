//! Rate Limit Configuration
//!
//! Window/ceiling pairs and the named presets used per endpoint class.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::duration_ms;
use crate::error::{Result, ShieldError};

// == Rate Limit Config ==
/// Fixed window length and the number of requests admitted per window.
///
/// Both values are non-zero by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    window: Duration,
    max_requests: u32,
}

impl RateLimitConfig {
    /// Generic reads: 100 per minute.
    pub const DEFAULT: Self = Self::new(Duration::from_secs(60), 100);
    /// Sign-in, sign-up and password reset attempts: 5 per 15 minutes.
    pub const AUTH: Self = Self::new(Duration::from_secs(15 * 60), 5);
    /// AI completions: 10 per minute.
    pub const AI: Self = Self::new(Duration::from_secs(60), 10);
    /// Payment provider callbacks: 50 per minute.
    pub const WEBHOOK: Self = Self::new(Duration::from_secs(60), 50);
    /// Media uploads: 20 per minute.
    pub const UPLOAD: Self = Self::new(Duration::from_secs(60), 20);
    /// Abusable or administrative actions: 5 per minute.
    pub const STRICT: Self = Self::new(Duration::from_secs(60), 5);

    // == Constructor ==
    /// Creates a config, panicking on a zero window or zero ceiling.
    ///
    /// Used in `const` items the check happens at compile time. For values
    /// read at runtime use [`RateLimitConfig::try_new`].
    pub const fn new(window: Duration, max_requests: u32) -> Self {
        assert!(!window.is_zero(), "rate limit window must be non-zero");
        assert!(max_requests > 0, "rate limit ceiling must be non-zero");
        Self {
            window,
            max_requests,
        }
    }

    /// Creates a config from runtime values.
    pub fn try_new(window_ms: u64, max_requests: u32) -> Result<Self> {
        if window_ms == 0 {
            return Err(ShieldError::InvalidConfig(
                "window must be at least 1 ms".to_string(),
            ));
        }
        if max_requests == 0 {
            return Err(ShieldError::InvalidConfig(
                "max_requests must be at least 1".to_string(),
            ));
        }
        Ok(Self::new(Duration::from_millis(window_ms), max_requests))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn window_ms(&self) -> u64 {
        duration_ms(self.window)
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }
}

// == Presets ==
/// Endpoint classes with their own limits.
///
/// The limiter knows nothing about these; the route layer picks one per
/// endpoint and also uses [`RateLimitPreset::tag`] to namespace keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitPreset {
    Default,
    Auth,
    Ai,
    Webhook,
    Upload,
    Strict,
}

impl RateLimitPreset {
    pub const ALL: [RateLimitPreset; 6] = [
        RateLimitPreset::Default,
        RateLimitPreset::Auth,
        RateLimitPreset::Ai,
        RateLimitPreset::Webhook,
        RateLimitPreset::Upload,
        RateLimitPreset::Strict,
    ];

    pub const fn config(self) -> RateLimitConfig {
        match self {
            RateLimitPreset::Default => RateLimitConfig::DEFAULT,
            RateLimitPreset::Auth => RateLimitConfig::AUTH,
            RateLimitPreset::Ai => RateLimitConfig::AI,
            RateLimitPreset::Webhook => RateLimitConfig::WEBHOOK,
            RateLimitPreset::Upload => RateLimitConfig::UPLOAD,
            RateLimitPreset::Strict => RateLimitConfig::STRICT,
        }
    }

    pub const fn tag(self) -> &'static str {
        match self {
            RateLimitPreset::Default => "default",
            RateLimitPreset::Auth => "auth",
            RateLimitPreset::Ai => "ai",
            RateLimitPreset::Webhook => "webhook",
            RateLimitPreset::Upload => "upload",
            RateLimitPreset::Strict => "strict",
        }
    }
}

impl fmt::Display for RateLimitPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for RateLimitPreset {
    type Err = ShieldError;

    fn from_str(s: &str) -> Result<Self> {
        RateLimitPreset::ALL
            .into_iter()
            .find(|preset| preset.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| ShieldError::InvalidRequest(format!("Unknown rate limit preset '{}'", s)))
    }
}

/// Composes a limiter key from an endpoint tag and a client identity.
pub fn rate_limit_key(endpoint_tag: &str, client_id: &str) -> String {
    format!("{}:{}", endpoint_tag, client_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_new_rejects_zero_values() {
        assert!(matches!(
            RateLimitConfig::try_new(0, 10),
            Err(ShieldError::InvalidConfig(_))
        ));
        assert!(matches!(
            RateLimitConfig::try_new(1000, 0),
            Err(ShieldError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_try_new_accepts_valid_values() {
        let config = RateLimitConfig::try_new(1000, 3).unwrap();
        assert_eq!(config.window_ms(), 1000);
        assert_eq!(config.max_requests(), 3);
    }

    #[test]
    #[should_panic(expected = "ceiling must be non-zero")]
    fn test_new_panics_on_zero_ceiling() {
        RateLimitConfig::new(Duration::from_secs(1), 0);
    }

    #[test]
    fn test_auth_is_stricter_than_default() {
        let auth = RateLimitPreset::Auth.config();
        let default = RateLimitPreset::Default.config();
        assert!(auth.max_requests() < default.max_requests());
        assert!(auth.window() > default.window());
    }

    #[test]
    fn test_preset_parse_and_display() {
        for preset in RateLimitPreset::ALL {
            assert_eq!(preset.to_string().parse::<RateLimitPreset>().unwrap(), preset);
        }
        assert_eq!("AUTH".parse::<RateLimitPreset>().unwrap(), RateLimitPreset::Auth);
        assert!("burst".parse::<RateLimitPreset>().is_err());
    }

    #[test]
    fn test_rate_limit_key() {
        assert_eq!(rate_limit_key("ai", "user-42"), "ai:user-42");
    }
}
