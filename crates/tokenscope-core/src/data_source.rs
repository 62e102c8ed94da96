//! Provider client contract and request/response types.
//!
//! This module defines the adapter contract (`TokenDataSource`) that every
//! external provider implements, the structured [`ProviderError`] the
//! orchestrator uses to drive fallback, and the per-client cache set.
//!
//! # Operations
//!
//! | Operation | Request | Response |
//! |-----------|---------|----------|
//! | Price | [`TokenId`] | [`PriceSnapshot`] |
//! | Batch price | `&[TokenId]` | map of [`PriceSnapshot`] |
//! | Price history | [`HistoryRequest`] | `Vec<PricePoint>` |
//! | Holders | [`HoldersRequest`] | [`HolderPage`] |
//! | Token info | [`TokenId`] | [`TokenInfo`] |

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheStats, TtlCache};
use crate::http_client::HttpError;
use crate::provider_policy::CacheTtls;
use crate::validation::ValidationErrors;
use crate::{
    HolderPage, PricePoint, PriceSnapshot, ProviderId, TokenId, TokenInfo, ValidationError,
};

/// Boxed future returned by provider operations.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Operation type used for capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Price,
    BatchPrice,
    PriceHistory,
    Holders,
    TokenInfo,
}

impl Capability {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::BatchPrice => "batch_price",
            Self::PriceHistory => "price_history",
            Self::Holders => "holders",
            Self::TokenInfo => "token_info",
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported operation matrix for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub price: bool,
    pub batch_price: bool,
    pub price_history: bool,
    pub holders: bool,
    pub token_info: bool,
}

impl CapabilitySet {
    pub const fn new(
        price: bool,
        batch_price: bool,
        price_history: bool,
        holders: bool,
        token_info: bool,
    ) -> Self {
        Self {
            price,
            batch_price,
            price_history,
            holders,
            token_info,
        }
    }

    pub const fn supports(self, capability: Capability) -> bool {
        match capability {
            Capability::Price => self.price,
            Capability::BatchPrice => self.batch_price,
            Capability::PriceHistory => self.price_history,
            Capability::Holders => self.holders,
            Capability::TokenInfo => self.token_info,
        }
    }

    pub fn supported(self) -> Vec<&'static str> {
        [
            Capability::Price,
            Capability::BatchPrice,
            Capability::PriceHistory,
            Capability::Holders,
            Capability::TokenInfo,
        ]
        .into_iter()
        .filter(|capability| self.supports(*capability))
        .map(Capability::as_str)
        .collect()
    }
}

/// Provider-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Network failure or non-2xx status.
    Transport,
    /// Response did not match the expected shape or value ranges.
    Validation,
    /// No rate-limit token became available in time.
    RateLimitTimeout,
    /// The call ran past its deadline.
    Timeout,
    Unsupported,
    Configuration,
}

/// Structured provider error used by orchestrator fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    provider: ProviderId,
    status: Option<u16>,
    message: String,
    retryable: bool,
}

impl ProviderError {
    /// Non-2xx response. 5xx and 429 are retryable, every other status is not.
    pub fn http_status(provider: ProviderId, status: u16, detail: impl AsRef<str>) -> Self {
        let detail = detail.as_ref();
        let message = if detail.is_empty() {
            format!("{provider} returned status {status}")
        } else {
            format!("{provider} returned status {status}: {detail}")
        };

        Self {
            kind: ProviderErrorKind::Transport,
            provider,
            status: Some(status),
            message,
            retryable: status == 429 || (500..600).contains(&status),
        }
    }

    /// Failure before any response arrived.
    pub fn transport(provider: ProviderId, error: &HttpError) -> Self {
        Self {
            kind: ProviderErrorKind::Transport,
            provider,
            status: None,
            message: format!("{provider} transport error: {}", error.message()),
            retryable: error.retryable(),
        }
    }

    pub fn validation(provider: ProviderId, errors: &ValidationErrors) -> Self {
        Self::validation_message(provider, errors.to_string())
    }

    pub fn validation_message(provider: ProviderId, message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Validation,
            provider,
            status: None,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn rate_limit_timeout(provider: ProviderId, waited: Duration) -> Self {
        Self {
            kind: ProviderErrorKind::RateLimitTimeout,
            provider,
            status: None,
            message: format!(
                "{provider} rate limiter had no token within {}ms",
                waited.as_millis()
            ),
            retryable: false,
        }
    }

    pub fn timeout(provider: ProviderId, deadline: Duration) -> Self {
        Self {
            kind: ProviderErrorKind::Timeout,
            provider,
            status: None,
            message: format!("{provider} call exceeded {}ms deadline", deadline.as_millis()),
            retryable: false,
        }
    }

    pub fn unsupported(provider: ProviderId, capability: Capability) -> Self {
        Self {
            kind: ProviderErrorKind::Unsupported,
            provider,
            status: None,
            message: format!("{provider} does not support '{capability}'"),
            retryable: false,
        }
    }

    /// The provider has no listing for this token (e.g. no CoinGecko id).
    pub fn unknown_token(provider: ProviderId, token: &TokenId) -> Self {
        Self {
            kind: ProviderErrorKind::Unsupported,
            provider,
            status: None,
            message: format!("{provider} has no listing for token '{token}'"),
            retryable: false,
        }
    }

    pub fn configuration(provider: ProviderId, message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Configuration,
            provider,
            status: None,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub const fn provider(&self) -> ProviderId {
        self.provider
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Default retry predicate for provider calls.
    pub const fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::Transport => "provider.transport",
            ProviderErrorKind::Validation => "provider.validation",
            ProviderErrorKind::RateLimitTimeout => "provider.rate_limit_timeout",
            ProviderErrorKind::Timeout => "provider.timeout",
            ProviderErrorKind::Unsupported => "provider.unsupported",
            ProviderErrorKind::Configuration => "provider.configuration",
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ProviderError {}

/// Request payload for holder snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldersRequest {
    pub token: TokenId,
    pub limit: usize,
    pub cursor: Option<String>,
}

impl HoldersRequest {
    pub const MAX_LIMIT: usize = 1_000;

    pub fn new(token: TokenId, limit: usize, cursor: Option<String>) -> Result<Self, ValidationError> {
        if limit == 0 || limit > Self::MAX_LIMIT {
            return Err(ValidationError::OutOfRange {
                field: "limit",
                min: 1.0,
                max: Self::MAX_LIMIT as f64,
            });
        }

        Ok(Self {
            token,
            limit,
            cursor: cursor.filter(|cursor| !cursor.trim().is_empty()),
        })
    }

    pub fn cache_key(&self) -> String {
        format!(
            "holders:{}:{}:{}",
            self.token,
            self.limit,
            self.cursor.as_deref().unwrap_or("-")
        )
    }
}

/// Request payload for daily price history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub token: TokenId,
    pub days: u32,
}

impl HistoryRequest {
    pub const MAX_DAYS: u32 = 365;

    pub fn new(token: TokenId, days: u32) -> Result<Self, ValidationError> {
        if days == 0 || days > Self::MAX_DAYS {
            return Err(ValidationError::OutOfRange {
                field: "days",
                min: 1.0,
                max: f64::from(Self::MAX_DAYS),
            });
        }
        Ok(Self { token, days })
    }

    pub fn cache_key(&self) -> String {
        format!("history:{}:{}", self.token, self.days)
    }
}

pub fn price_cache_key(token: &TokenId) -> String {
    format!("price:{token}")
}

pub fn info_cache_key(token: &TokenId) -> String {
    format!("info:{token}")
}

/// The caches owned by one provider client, each defaulting to that
/// provider's freshness window for its data type.
#[derive(Debug, Clone)]
pub struct ProviderCaches {
    pub prices: TtlCache<PriceSnapshot>,
    pub history: TtlCache<Vec<PricePoint>>,
    pub holders: TtlCache<HolderPage>,
    pub info: TtlCache<TokenInfo>,
}

impl ProviderCaches {
    pub fn new(ttls: CacheTtls, max_entries: usize) -> Self {
        Self {
            prices: TtlCache::new("prices", max_entries, ttls.price),
            history: TtlCache::new("history", max_entries, ttls.history),
            holders: TtlCache::new("holders", max_entries, ttls.holders),
            info: TtlCache::new("info", max_entries, ttls.info),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.prices
            .stats()
            .merge(self.history.stats())
            .merge(self.holders.stats())
            .merge(self.info.stats())
    }

    pub fn prune_expired(&self) -> usize {
        self.prices.prune_expired()
            + self.history.prune_expired()
            + self.holders.prune_expired()
            + self.info.prune_expired()
    }

    pub fn clear(&self) {
        self.prices.clear();
        self.history.clear();
        self.holders.clear();
        self.info.clear();
    }
}

/// Provider client contract.
///
/// Each implementation composes its own rate limiter, retry policy, response
/// validation and caches. Validation failures are returned, never swallowed,
/// so the orchestrator can fall back.
///
/// | Method | Description |
/// |--------|-------------|
/// | [`id`](TokenDataSource::id) | Provider identifier |
/// | [`capabilities`](TokenDataSource::capabilities) | Supported operations |
/// | [`caches`](TokenDataSource::caches) | Caches owned by this client |
/// | [`price`](TokenDataSource::price) | Latest price snapshot |
/// | [`batch_prices`](TokenDataSource::batch_prices) | Prices for many tokens in one call |
/// | [`price_history`](TokenDataSource::price_history) | Daily price points |
/// | [`holders`](TokenDataSource::holders) | Largest holders |
/// | [`token_info`](TokenDataSource::token_info) | Static metadata |
///
/// Operations a provider does not offer keep the default implementation,
/// which fails with [`ProviderErrorKind::Unsupported`].
pub trait TokenDataSource: Send + Sync {
    fn id(&self) -> ProviderId;

    fn capabilities(&self) -> CapabilitySet;

    fn caches(&self) -> &ProviderCaches;

    fn price<'a>(&'a self, token: &'a TokenId) -> ProviderFuture<'a, PriceSnapshot>;

    fn batch_prices<'a>(
        &'a self,
        tokens: &'a [TokenId],
    ) -> ProviderFuture<'a, BTreeMap<TokenId, PriceSnapshot>> {
        let _ = tokens;
        let provider = self.id();
        Box::pin(async move { Err(ProviderError::unsupported(provider, Capability::BatchPrice)) })
    }

    fn price_history<'a>(&'a self, req: &'a HistoryRequest) -> ProviderFuture<'a, Vec<PricePoint>> {
        let _ = req;
        let provider = self.id();
        Box::pin(async move { Err(ProviderError::unsupported(provider, Capability::PriceHistory)) })
    }

    fn holders<'a>(&'a self, req: &'a HoldersRequest) -> ProviderFuture<'a, HolderPage> {
        let _ = req;
        let provider = self.id();
        Box::pin(async move { Err(ProviderError::unsupported(provider, Capability::Holders)) })
    }

    fn token_info<'a>(&'a self, token: &'a TokenId) -> ProviderFuture<'a, TokenInfo> {
        let _ = token;
        let provider = self.id();
        Box::pin(async move { Err(ProviderError::unsupported(provider, Capability::TokenInfo)) })
    }
}
