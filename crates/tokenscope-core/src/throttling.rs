//! Token-bucket rate limiting for provider clients.
//!
//! The bucket is backed by `governor`'s GCRA state, which is the
//! continuous-refill formulation of a token bucket: `capacity` is the burst
//! size and one token becomes available every `1 / refill_per_second`
//! seconds. Refill-and-consume is a single atomic compare-and-swap on the
//! shared state, so concurrent callers never over-issue tokens.
//!
//! Waiters are not queued. When several callers are suspended on an empty
//! bucket, the order in which they obtain tokens after the wait may differ
//! from the order in which they called [`RateLimiter::acquire`].

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use governor::clock::{Clock, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::Quota;
use tracing::debug;

type DirectRateLimiter = governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Token-bucket parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateBucket {
    /// Maximum number of tokens (burst size).
    pub capacity: u32,
    /// Continuous refill rate.
    pub refill_per_second: f64,
}

impl RateBucket {
    pub const fn new(capacity: u32, refill_per_second: f64) -> Self {
        Self {
            capacity,
            refill_per_second,
        }
    }

    /// A bucket that admits `limit` requests per `window`, all of them burstable.
    pub fn per_window(limit: u32, window: Duration) -> Self {
        let limit = limit.max(1);
        Self {
            capacity: limit,
            refill_per_second: f64::from(limit) / window.as_secs_f64().max(0.001),
        }
    }

    fn quota(self) -> Quota {
        let capacity = NonZeroU32::new(self.capacity.max(1)).unwrap_or(NonZeroU32::MIN);
        let seconds_per_token = (1.0 / self.refill_per_second.max(1e-6)).max(0.001);

        match Quota::with_period(Duration::from_secs_f64(seconds_per_token)) {
            Some(quota) => quota.allow_burst(capacity),
            None => Quota::per_second(capacity),
        }
    }
}

/// Acquisition did not complete before the caller-supplied deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitTimeout {
    pub waited: Duration,
}

/// Shared token-bucket limiter. Cloning shares the bucket.
#[derive(Clone)]
pub struct RateLimiter {
    bucket: RateBucket,
    limiter: Arc<DirectRateLimiter>,
    clock: DefaultClock,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    pub fn new(bucket: RateBucket) -> Self {
        Self {
            bucket,
            limiter: Arc::new(governor::RateLimiter::direct(bucket.quota())),
            clock: DefaultClock::default(),
        }
    }

    pub fn bucket(&self) -> RateBucket {
        self.bucket
    }

    /// Takes one token, suspending the caller until one has refilled.
    pub async fn acquire(&self) {
        let started = Instant::now();
        self.limiter.until_ready().await;

        let waited = started.elapsed();
        if waited > Duration::from_millis(50) {
            debug!(wait_ms = waited.as_millis() as u64, "rate limiter suspended caller");
        }
    }

    /// Like [`acquire`](Self::acquire) but gives up once `deadline` has elapsed.
    pub async fn acquire_within(&self, deadline: Duration) -> Result<(), RateLimitTimeout> {
        tokio::time::timeout(deadline, self.acquire())
            .await
            .map_err(|_| RateLimitTimeout { waited: deadline })
    }

    /// Takes a token without waiting. On an empty bucket returns the time until
    /// the next token becomes available.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_up_to_capacity_then_reports_wait() {
        let limiter = RateLimiter::new(RateBucket::new(3, 1.0));

        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_ok());

        let wait = limiter.try_acquire().expect_err("bucket should be empty");
        assert!(wait > Duration::from_millis(500), "wait={wait:?}");
        assert!(wait <= Duration::from_secs(1), "wait={wait:?}");
    }

    #[test]
    fn per_window_spreads_refill_across_window() {
        let bucket = RateBucket::per_window(30, Duration::from_secs(60));
        assert_eq!(bucket.capacity, 30);
        assert!((bucket.refill_per_second - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn acquire_within_times_out_on_empty_bucket() {
        let limiter = RateLimiter::new(RateBucket::new(1, 0.1));
        limiter.acquire().await;

        let result = limiter.acquire_within(Duration::from_millis(20)).await;
        assert_eq!(
            result,
            Err(RateLimitTimeout {
                waited: Duration::from_millis(20)
            })
        );
    }

    #[tokio::test]
    async fn clones_share_the_same_bucket() {
        let limiter = RateLimiter::new(RateBucket::new(1, 0.5));
        let clone = limiter.clone();

        assert!(limiter.try_acquire().is_ok());
        assert!(clone.try_acquire().is_err());
    }
}
