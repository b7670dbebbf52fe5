//! Property-Based Tests for the Cache and Limiter
//!
//! Uses proptest to check invariants over arbitrary operation sequences.

use proptest::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use std::time::Duration;

use crate::cache::QueryCache;
use crate::rate_limit::{RateLimitConfig, RateLimiter};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_TTL: Duration = Duration::from_secs(300);

// == Strategies ==
/// Generates cache keys in the `namespace:id` shape callers use
fn key_strategy() -> impl Strategy<Value = String> {
    ("(story|user|comments)", 0u32..20).prop_map(|(ns, id)| format!("{}:{}", ns, id))
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}"
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Invalidate { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Invalidate { key }),
    ]
}

fn cache(max_entries: usize) -> QueryCache<String> {
    QueryCache::new(TEST_TTL, max_entries)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Statistics reflect exactly the lookups that were made.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let cache = cache(TEST_MAX_ENTRIES);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => cache.set(key, value, TEST_TTL),
                CacheOp::Get { key } => match cache.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Invalidate { key } => {
                    cache.invalidate(&key);
                }
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.size, cache.len(), "Size mismatch");
    }

    // The last set for a key is the one read back.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        values in prop::collection::vec(value_strategy(), 1..8)
    ) {
        let cache = cache(TEST_MAX_ENTRIES);
        for value in &values {
            cache.set(key.clone(), value.clone(), TEST_TTL);
        }

        prop_assert_eq!(cache.get(&key), values.last().cloned());
        prop_assert_eq!(cache.len(), 1);
    }

    // The store never grows beyond its capacity bound.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..120)
    ) {
        let max_entries = 10;
        let cache = cache(max_entries);

        for (key, value) in entries {
            cache.set(key, value, TEST_TTL);
            prop_assert!(cache.len() <= max_entries, "size {} exceeds {}", cache.len(), max_entries);
        }
    }

    // Pattern invalidation removes exactly the matching keys.
    #[test]
    fn prop_pattern_invalidation_scope(
        keys in prop::collection::hash_set(key_strategy(), 1..40)
    ) {
        let cache = cache(TEST_MAX_ENTRIES);
        for key in &keys {
            cache.set(key.clone(), "v".to_string(), TEST_TTL);
        }

        let removed = cache.invalidate_pattern(&Regex::new("^story:").unwrap());

        let expected: HashSet<&String> = keys.iter().filter(|k| k.starts_with("story:")).collect();
        prop_assert_eq!(removed, expected.len());
        for key in &keys {
            prop_assert_eq!(cache.get(key).is_some(), !key.starts_with("story:"));
        }
    }

    // Within one window the limiter admits at most the ceiling and never
    // reports more remaining than it has.
    #[test]
    fn prop_limiter_admits_at_most_ceiling(
        max_requests in 1u32..20,
        attempts in 1usize..60,
        offsets in prop::collection::vec(0u64..999, 60)
    ) {
        let config = RateLimitConfig::new(Duration::from_secs(1), max_requests);
        let limiter = RateLimiter::new();
        let mut admitted = 0u32;

        for offset in offsets.iter().take(attempts) {
            let decision = limiter.check_at("k", &config, 10_000 + offset);
            if decision.allowed {
                admitted += 1;
                prop_assert_eq!(decision.remaining, max_requests - admitted);
            } else {
                prop_assert!(decision.retry_after.unwrap_or(0) > 0);
            }
        }

        prop_assert_eq!(admitted, max_requests.min(attempts as u32));
    }

    // Peeking never changes what a later check sees.
    #[test]
    fn prop_peek_is_non_mutating(checks in 0u32..6, peeks in 1usize..20) {
        let config = RateLimitConfig::new(Duration::from_secs(1), 3);
        let limiter = RateLimiter::new();
        for _ in 0..checks {
            limiter.check_at("k", &config, 0);
        }

        let first = limiter.peek_at("k", &config, 0);
        for _ in 0..peeks {
            prop_assert_eq!(limiter.peek_at("k", &config, 0), first);
        }
        prop_assert_eq!(limiter.check_at("k", &config, 0).allowed, first.allowed);
    }
}
