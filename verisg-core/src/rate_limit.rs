//! Per-client fixed-window rate limiting
//!
//! `FixedWindowLimiter` keeps counters in process memory: state is lost on
//! restart and not shared between instances. Multi-instance deployments need
//! a `RateLimitStore` backed by a shared key-value store with expiry.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::config::RateLimitConfig;

/// Prune expired windows once the map grows past this many keys.
const PRUNE_THRESHOLD: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one request for `key` and decide whether it may proceed.
    async fn check(&self, key: &str) -> RateLimitDecision;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

#[derive(Debug)]
pub struct FixedWindowLimiter {
    window: Duration,
    max_requests: u32,
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            Duration::from_secs(config.window_seconds),
            config.max_requests,
        )
    }

    /// Same as `check`, against an explicit clock.
    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if windows.len() > PRUNE_THRESHOLD {
            windows.retain(|_, w| now <= w.reset_at);
        }

        let fresh = Window {
            count: 1,
            reset_at: now + self.window,
        };

        match windows.get_mut(key) {
            Some(w) if now <= w.reset_at => {
                w.count = w.count.saturating_add(1);
                RateLimitDecision {
                    allowed: w.count <= self.max_requests,
                    remaining: self.max_requests.saturating_sub(w.count),
                }
            }
            _ => {
                windows.insert(key.to_string(), fresh);
                RateLimitDecision {
                    allowed: true,
                    remaining: self.max_requests.saturating_sub(1),
                }
            }
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().map(|w| w.len()).unwrap_or(0)
    }
}

#[async_trait]
impl RateLimitStore for FixedWindowLimiter {
    async fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> FixedWindowLimiter {
        FixedWindowLimiter::new(Duration::from_secs(60), 10)
    }

    #[test]
    fn test_allows_up_to_limit_then_blocks() {
        let l = limiter();
        let now = Instant::now();
        for i in 1..=10 {
            let d = l.check_at("1.2.3.4", now);
            assert!(d.allowed, "request {} should pass", i);
            assert_eq!(d.remaining, 10 - i);
        }
        let d = l.check_at("1.2.3.4", now);
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
    }

    #[test]
    fn test_keys_are_independent() {
        let l = limiter();
        let now = Instant::now();
        for _ in 0..11 {
            l.check_at("a", now);
        }
        assert!(!l.check_at("a", now).allowed);
        assert!(l.check_at("b", now).allowed);
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let l = limiter();
        let start = Instant::now();
        for _ in 0..11 {
            l.check_at("k", start);
        }
        assert!(!l.check_at("k", start + Duration::from_secs(30)).allowed);

        let later = start + Duration::from_secs(61);
        let d = l.check_at("k", later);
        assert!(d.allowed);
        assert_eq!(d.remaining, 9);
    }

    #[test]
    fn test_expired_windows_pruned_when_map_grows() {
        let l = limiter();
        let start = Instant::now();
        for i in 0..=PRUNE_THRESHOLD {
            l.check_at(&format!("k{}", i), start);
        }
        assert_eq!(l.tracked_keys(), PRUNE_THRESHOLD + 1);

        l.check_at("fresh", start + Duration::from_secs(120));
        assert_eq!(l.tracked_keys(), 1);
    }

    #[tokio::test]
    async fn test_store_trait_counts_requests() {
        let l = FixedWindowLimiter::new(Duration::from_secs(60), 2);
        let store: &dyn RateLimitStore = &l;
        assert!(store.check("x").await.allowed);
        assert!(store.check("x").await.allowed);
        assert!(!store.check("x").await.allowed);
    }
}
