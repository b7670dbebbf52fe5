//! Configuration Module
//!
//! Handles loading and managing shield configuration from environment variables.

use std::env;
use std::time::Duration;

/// Process configuration for the cache, the limiter and the HTTP server.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default cache TTL in milliseconds
    pub cache_default_ttl_ms: u64,
    /// Maximum number of entries the cache can hold
    pub cache_max_entries: usize,
    /// Cache sweep interval in seconds
    pub cache_cleanup_interval: u64,
    /// Rate limiter sweep interval in seconds
    pub rate_limit_cleanup_interval: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DEFAULT_TTL_MS` - Default cache TTL in milliseconds (default: 300000)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10000)
    /// - `CACHE_CLEANUP_INTERVAL` - Cache sweep frequency in seconds (default: 30)
    /// - `RATE_LIMIT_CLEANUP_INTERVAL` - Limiter sweep frequency in seconds (default: 60)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    ///
    /// Missing, unparseable or zero values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_default_ttl_ms: non_zero_var("CACHE_DEFAULT_TTL_MS")
                .unwrap_or(defaults.cache_default_ttl_ms),
            cache_max_entries: non_zero_var("CACHE_MAX_ENTRIES")
                .unwrap_or(defaults.cache_max_entries),
            cache_cleanup_interval: non_zero_var("CACHE_CLEANUP_INTERVAL")
                .unwrap_or(defaults.cache_cleanup_interval),
            rate_limit_cleanup_interval: non_zero_var("RATE_LIMIT_CLEANUP_INTERVAL")
                .unwrap_or(defaults.rate_limit_cleanup_interval),
            server_port: non_zero_var("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }

    pub fn cache_default_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_default_ttl_ms)
    }

    pub fn cache_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cache_cleanup_interval)
    }

    pub fn rate_limit_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cleanup_interval)
    }
}

fn non_zero_var<T>(name: &str) -> Option<T>
where
    T: std::str::FromStr + Default + PartialEq,
{
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .filter(|v: &T| *v != T::default())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_default_ttl_ms: 300_000,
            cache_max_entries: 10_000,
            cache_cleanup_interval: 30,
            rate_limit_cleanup_interval: 60,
            server_port: 3000,
        }
    }
}
