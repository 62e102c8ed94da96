//! Provider client implementations.
//!
//! | Adapter | Transport | Operations |
//! |---------|-----------|------------|
//! | [`CodexAdapter`] | GraphQL | price, price history, holders, token info |
//! | [`BirdeyeAdapter`] | REST | price (with liquidity), price history, holders |
//! | [`CoingeckoAdapter`] | REST | price, batch price |
//!
//! All three send requests through [`ProviderTransport`], which takes a
//! rate-limit token per attempt, retries transient failures within the
//! request deadline and hands back the decoded JSON body.

mod birdeye;
mod codex;
mod coingecko;

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::data_source::ProviderError;
use crate::http_client::{host_of, HttpAuth, HttpClient, HttpRequest};
use crate::provider_policy::ProviderPolicy;
use crate::retry::with_retry_within;
use crate::throttling::RateLimiter;
use crate::validation::ValidationErrors;
use crate::{HolderBalance, ProviderId, ValidationError};

pub use birdeye::BirdeyeAdapter;
pub use codex::CodexAdapter;
pub use coingecko::CoingeckoAdapter;

const ERROR_BODY_SNIPPET: usize = 160;

/// Rate-limited, retrying JSON transport shared by the adapters.
#[derive(Clone)]
pub struct ProviderTransport {
    provider: ProviderId,
    http: Arc<dyn HttpClient>,
    auth: HttpAuth,
    limiter: RateLimiter,
    policy: ProviderPolicy,
}

impl std::fmt::Debug for ProviderTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTransport")
            .field("provider", &self.provider)
            .field("auth", &self.auth)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

impl ProviderTransport {
    pub fn new(http: Arc<dyn HttpClient>, auth: HttpAuth, policy: ProviderPolicy) -> Self {
        Self {
            provider: policy.provider_id,
            http,
            auth,
            limiter: RateLimiter::new(policy.rate),
            policy,
        }
    }

    pub fn policy(&self) -> &ProviderPolicy {
        &self.policy
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Sends `request` under the provider's retry policy and request deadline.
    pub async fn send_json(&self, request: HttpRequest) -> Result<Value, ProviderError> {
        let request = request
            .with_auth(&self.auth)
            .with_timeout_ms(self.policy.request_timeout.as_millis() as u64);

        with_retry_within(
            &self.policy.retry,
            self.policy.request_deadline,
            || self.attempt(request.clone()),
            |exceeded| ProviderError::timeout(self.provider, exceeded.deadline),
        )
        .await
    }

    async fn attempt(&self, request: HttpRequest) -> Result<Value, ProviderError> {
        self.limiter
            .acquire_within(self.policy.limiter_wait)
            .await
            .map_err(|timeout| ProviderError::rate_limit_timeout(self.provider, timeout.waited))?;

        debug!(provider = %self.provider, host = host_of(&request.url), "sending provider request");
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|error| ProviderError::transport(self.provider, &error))?;

        if !response.is_success() {
            return Err(ProviderError::http_status(
                self.provider,
                response.status,
                snippet(&response.body),
            ));
        }

        response.json().map_err(|error| {
            ProviderError::validation_message(
                self.provider,
                format!("{} returned malformed JSON: {error}", self.provider),
            )
        })
    }
}

fn snippet(body: &str) -> &str {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(ERROR_BODY_SNIPPET) {
        Some((end, _)) => &trimmed[..end],
        None => trimmed,
    }
}

/// Percent of supply held by `balance`, clamped into `[0, 100]`.
pub(crate) fn percent_of_supply(balance: f64, supply: Option<f64>) -> f64 {
    match supply {
        Some(supply) if supply > 0.0 => (balance / supply * 100.0).clamp(0.0, 100.0),
        _ => 0.0,
    }
}

/// Builds holder balances, rescaling percentages when rounding in the
/// provider's supply figure would push the page above 100%.
pub(crate) fn normalize_holders(
    rows: Vec<(String, f64)>,
    supply: Option<f64>,
) -> Result<Vec<HolderBalance>, ValidationError> {
    let mut percents: Vec<f64> = rows
        .iter()
        .map(|(_, balance)| percent_of_supply(*balance, supply))
        .collect();

    let sum: f64 = percents.iter().sum();
    if sum > 100.0 {
        let scale = 100.0 / sum;
        percents.iter_mut().for_each(|percent| *percent *= scale);
    }

    let mut holders = rows
        .into_iter()
        .zip(percents)
        .map(|((address, balance), percent)| HolderBalance::new(address, balance, percent))
        .collect::<Result<Vec<_>, _>>()?;

    holders.sort_by(|a, b| b.balance.total_cmp(&a.balance));
    Ok(holders)
}

pub(crate) fn domain_error(provider: ProviderId, context: &str, error: ValidationError) -> ProviderError {
    ProviderError::validation(provider, &ValidationErrors::single(context, error.to_string()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};

    /// Replays canned responses in order and records every request.
    /// The last response repeats once the script is exhausted.
    #[derive(Debug)]
    pub struct ScriptedHttpClient {
        responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        pub fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn json(body: serde_json::Value) -> Self {
            Self::new(vec![Ok(HttpResponse::ok_json(body.to_string()))])
        }

        pub fn recorded_requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .clone()
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);

            let mut responses = self
                .responses
                .lock()
                .expect("response script should not be poisoned");
            let next = if responses.len() > 1 {
                responses.pop_front()
            } else {
                responses.front().cloned()
            };
            let response = next.unwrap_or_else(|| Err(HttpError::new("no scripted response")));
            drop(responses);

            Box::pin(async move { response })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::test_support::ScriptedHttpClient;
    use super::*;
    use crate::data_source::ProviderErrorKind;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::retry::{Backoff, RetryPolicy};
    use crate::throttling::RateBucket;

    fn transport(client: Arc<ScriptedHttpClient>) -> ProviderTransport {
        ProviderTransport::new(
            client,
            HttpAuth::Header {
                name: String::from("x-api-key"),
                value: String::from("key"),
            },
            ProviderPolicy::birdeye_default().without_backoff(),
        )
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let client = Arc::new(ScriptedHttpClient::new(vec![
            Ok(HttpResponse::with_status(503, "busy")),
            Ok(HttpResponse::ok_json(r#"{"ok":true}"#)),
        ]));

        let body = transport(Arc::clone(&client))
            .send_json(HttpRequest::get("https://api.test/price"))
            .await
            .expect("second attempt succeeds");

        assert_eq!(body["ok"], true);
        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].headers.get("x-api-key").map(String::as_str), Some("key"));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let client = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::with_status(
            404, "not found",
        ))]));

        let error = transport(Arc::clone(&client))
            .send_json(HttpRequest::get("https://api.test/price"))
            .await
            .expect_err("404 is terminal");

        assert_eq!(error.status(), Some(404));
        assert_eq!(client.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let client = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(
            "<html>",
        ))]));

        let error = transport(Arc::clone(&client))
            .send_json(HttpRequest::get("https://api.test/price"))
            .await
            .expect_err("html is not json");

        assert_eq!(error.kind(), ProviderErrorKind::Validation);
        assert_eq!(client.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn empty_bucket_surfaces_rate_limit_timeout() {
        let client = Arc::new(ScriptedHttpClient::new(vec![Err(HttpError::new("reset"))]));
        let mut policy = ProviderPolicy::birdeye_default()
            .with_rate(RateBucket::new(1, 0.01))
            .with_retry(RetryPolicy::new(
                3,
                Backoff::Fixed {
                    delay: Duration::from_millis(1),
                },
                ProviderError::is_retryable,
            ));
        policy.limiter_wait = Duration::from_millis(20);
        let transport = ProviderTransport::new(client.clone(), HttpAuth::None, policy);

        let error = transport
            .send_json(HttpRequest::get("https://api.test/price"))
            .await
            .expect_err("second attempt cannot get a token");

        assert_eq!(error.kind(), ProviderErrorKind::RateLimitTimeout);
        assert_eq!(client.recorded_requests().len(), 1);
    }

    #[test]
    fn normalize_holders_sorts_and_caps_percentages() {
        let holders = normalize_holders(
            vec![(String::from("a"), 30.0), (String::from("b"), 80.0)],
            Some(100.0),
        )
        .expect("valid rows");

        assert_eq!(holders[0].address, "b");
        let sum: f64 = holders.iter().map(|h| h.percent_of_supply).sum();
        assert!(sum <= 100.0 + 1e-9, "sum={sum}");
    }
}
