//! Request pacing under the offers API quota
//!
//! A harvest interleaves count probes and page fetches; all of them draw
//! from one governor token bucket owned by the [`HttpClient`](super::HttpClient).

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;

/// Calls per second granted to a partner application
pub const API_REQUESTS_PER_SECOND: u32 = 10;

/// Token bucket settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Sustained requests per second
    pub requests_per_second: u32,
    /// Requests allowed back to back after an idle period
    pub burst_size: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: API_REQUESTS_PER_SECOND,
            burst_size: API_REQUESTS_PER_SECOND,
        }
    }
}

impl RateLimiterConfig {
    /// A bucket refilled at `requests_per_second`, holding as many tokens
    ///
    /// Zero means no limit and yields `None`.
    pub fn per_second(requests_per_second: u32) -> Option<Self> {
        (requests_per_second > 0).then_some(Self {
            requests_per_second,
            burst_size: requests_per_second,
        })
    }

    /// Override the bucket size
    #[must_use]
    pub fn with_burst(mut self, burst_size: u32) -> Self {
        self.burst_size = burst_size;
        self
    }

    fn quota(&self) -> Quota {
        let rate = NonZeroU32::new(self.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.burst_size).unwrap_or(NonZeroU32::MIN);
        Quota::per_second(rate).allow_burst(burst)
    }
}

/// Direct (unkeyed) token bucket
pub struct RateLimiter {
    bucket: Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>,
}

impl RateLimiter {
    /// Create a full bucket
    pub fn new(config: &RateLimiterConfig) -> Self {
        Self {
            bucket: Governor::direct(config.quota()),
        }
    }

    /// Wait for a token
    pub async fn acquire(&self) {
        self.bucket.until_ready().await;
    }

    #[cfg(test)]
    fn has_token(&self) -> bool {
        self.bucket.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod rate_limit_tests {
    use super::*;

    #[test]
    fn test_per_second() {
        assert_eq!(RateLimiterConfig::per_second(0), None);
        assert_eq!(
            RateLimiterConfig::per_second(API_REQUESTS_PER_SECOND),
            Some(RateLimiterConfig::default())
        );
    }

    #[test]
    fn test_burst_is_bounded() {
        let limiter = RateLimiter::new(&RateLimiterConfig::default().with_burst(3));
        for _ in 0..3 {
            assert!(limiter.has_token());
        }
        assert!(!limiter.has_token());
    }

    #[test]
    fn test_zero_burst_still_lets_one_through() {
        let limiter = RateLimiter::new(&RateLimiterConfig::default().with_burst(0));
        assert!(limiter.has_token());
        assert!(!limiter.has_token());
    }

    #[tokio::test]
    async fn test_acquire_waits_for_refill() {
        let limiter = RateLimiter::new(&RateLimiterConfig {
            requests_per_second: 100,
            burst_size: 1,
        });
        limiter.acquire().await;
        let started = std::time::Instant::now();
        limiter.acquire().await;
        assert!(started.elapsed() >= std::time::Duration::from_millis(5));
    }
}
