use std::time::Duration;

use crate::data_source::ProviderError;
use crate::retry::{Backoff, RetryPolicy};
use crate::throttling::RateBucket;
use crate::ProviderId;

/// Freshness windows for one provider's caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub price: Duration,
    pub history: Duration,
    pub holders: Duration,
    /// Static metadata changes rarely and is kept far longer than market data.
    pub info: Duration,
}

/// Per-provider limits, retry behavior and cache freshness.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    pub rate: RateBucket,
    /// Longest a single attempt may wait for a rate-limit token.
    pub limiter_wait: Duration,
    /// Budget for all attempts of one request, backoff sleeps included.
    pub request_deadline: Duration,
    pub request_timeout: Duration,
    pub retry: RetryPolicy<ProviderError>,
    pub ttls: CacheTtls,
}

fn default_retry() -> RetryPolicy<ProviderError> {
    RetryPolicy::exponential(
        3,
        Duration::from_millis(500),
        Duration::from_secs(8),
        2.0,
        true,
        ProviderError::is_retryable,
    )
}

impl ProviderPolicy {
    /// GraphQL primary: generous quota, short-lived market data.
    pub fn codex_default() -> Self {
        Self {
            provider_id: ProviderId::Codex,
            rate: RateBucket::new(5, 5.0),
            limiter_wait: Duration::from_secs(3),
            request_deadline: Duration::from_secs(6),
            request_timeout: Duration::from_secs(5),
            retry: default_retry(),
            ttls: CacheTtls {
                price: Duration::from_secs(30),
                history: Duration::from_secs(300),
                holders: Duration::from_secs(60),
                info: Duration::from_secs(86_400),
            },
        }
    }

    /// Public-tier REST API, roughly one request per second.
    pub fn birdeye_default() -> Self {
        Self {
            provider_id: ProviderId::Birdeye,
            rate: RateBucket::new(5, 1.0),
            limiter_wait: Duration::from_secs(3),
            request_deadline: Duration::from_secs(6),
            request_timeout: Duration::from_secs(5),
            retry: default_retry(),
            ttls: CacheTtls {
                price: Duration::from_secs(60),
                history: Duration::from_secs(600),
                holders: Duration::from_secs(300),
                info: Duration::from_secs(86_400),
            },
        }
    }

    /// Free tier allows about 30 calls per minute.
    pub fn coingecko_default() -> Self {
        Self {
            provider_id: ProviderId::Coingecko,
            rate: RateBucket::per_window(30, Duration::from_secs(60)),
            limiter_wait: Duration::from_secs(2),
            request_deadline: Duration::from_secs(6),
            request_timeout: Duration::from_secs(5),
            retry: RetryPolicy::exponential(
                2,
                Duration::from_secs(1),
                Duration::from_secs(10),
                2.0,
                true,
                ProviderError::is_retryable,
            ),
            ttls: CacheTtls {
                price: Duration::from_secs(120),
                history: Duration::from_secs(900),
                holders: Duration::from_secs(300),
                info: Duration::from_secs(86_400),
            },
        }
    }

    pub fn default_for(provider_id: ProviderId) -> Self {
        match provider_id {
            ProviderId::Codex => Self::codex_default(),
            ProviderId::Birdeye => Self::birdeye_default(),
            ProviderId::Coingecko => Self::coingecko_default(),
        }
    }

    pub fn with_retry(self, retry: RetryPolicy<ProviderError>) -> Self {
        Self { retry, ..self }
    }

    pub fn with_rate(self, rate: RateBucket) -> Self {
        Self { rate, ..self }
    }

    pub fn with_request_deadline(self, request_deadline: Duration) -> Self {
        Self {
            request_deadline,
            ..self
        }
    }

    /// Policy without backoff delays, for driving adapters in tests.
    pub fn without_backoff(self) -> Self {
        let retry = RetryPolicy::new(
            self.retry.max_attempts,
            Backoff::Fixed {
                delay: Duration::from_millis(1),
            },
            self.retry.is_retryable,
        );
        Self { retry, ..self }
    }
}
