//! Retry logic with exponential backoff and jitter.

use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Backoff strategy for retrying failed requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed {
        /// Delay between retries.
        delay: Duration,
    },
    /// Uses an exponential delay between retries.
    ///
    /// The delay is calculated as `min(max, base * factor ^ attempt)`.
    Exponential {
        /// The initial backoff duration.
        base: Duration,
        /// The multiplicative factor for each subsequent retry.
        factor: f64,
        /// The maximum duration to wait between retries.
        max: Duration,
        /// Whether to add a random amount of up to 50% of the delay.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(500),
            factor: 2.0,
            max: Duration::from_secs(8),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Calculate the delay for a given retry attempt.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The retry attempt number (0-based)
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.max(1.0).powi(attempt.min(i32::MAX as u32) as i32);
                let seconds = base.as_secs_f64() * scale;
                let capped = Duration::from_secs_f64(seconds.min(max.as_secs_f64()));

                if jitter {
                    let extra_ms = (capped.as_millis() as f64 * 0.5) as u64;
                    capped + Duration::from_millis(fastrand::u64(0..=extra_ms))
                } else {
                    capped
                }
            }
        }
    }
}

/// Retryability predicate applied to a failed attempt.
pub type RetryPredicate<E> = fn(&E) -> bool;

/// Immutable retry configuration for one call.
pub struct RetryPolicy<E> {
    /// Total attempts including the first one. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub is_retryable: RetryPredicate<E>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for RetryPolicy<E> {}

impl<E> Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

/// Predicates are not compared.
impl<E> PartialEq for RetryPolicy<E> {
    fn eq(&self, other: &Self) -> bool {
        self.max_attempts == other.max_attempts && self.backoff == other.backoff
    }
}

impl<E> RetryPolicy<E> {
    pub fn new(max_attempts: u32, backoff: Backoff, is_retryable: RetryPredicate<E>) -> Self {
        Self {
            max_attempts,
            backoff,
            is_retryable,
        }
    }

    /// Exponential policy from the four classic knobs.
    pub fn exponential(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
        jitter: bool,
        is_retryable: RetryPredicate<E>,
    ) -> Self {
        Self::new(
            max_attempts,
            Backoff::Exponential {
                base: initial_delay,
                factor: multiplier,
                max: max_delay,
                jitter,
            },
            is_retryable,
        )
    }

    /// Single attempt, never retries.
    pub fn no_retry(is_retryable: RetryPredicate<E>) -> Self {
        Self::new(1, Backoff::default(), is_retryable)
    }

    pub fn with_predicate(self, is_retryable: RetryPredicate<E>) -> Self {
        Self {
            is_retryable,
            ..self
        }
    }

    /// Calculate the delay that follows the given failed attempt (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

/// The whole retry loop ran past its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded {
    pub deadline: Duration,
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` is reached. The final error is returned unchanged.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy<E>, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0_u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                let last_attempt = attempt + 1 >= max_attempts;
                if last_attempt || !(policy.is_retryable)(&error) {
                    return Err(error);
                }

                let delay = policy.delay_for_attempt(attempt);
                debug!(
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// [`with_retry`] bounded by a deadline covering every attempt and backoff
/// sleep. Expiry is terminal: no further attempts are made and `on_deadline`
/// builds the error returned to the caller.
pub async fn with_retry_within<T, E, F, Fut, D>(
    policy: &RetryPolicy<E>,
    deadline: Duration,
    operation: F,
    on_deadline: D,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    D: FnOnce(DeadlineExceeded) -> E,
{
    match tokio::time::timeout(deadline, with_retry(policy, operation)).await {
        Ok(result) => result,
        Err(_) => Err(on_deadline(DeadlineExceeded { deadline })),
    }
}
