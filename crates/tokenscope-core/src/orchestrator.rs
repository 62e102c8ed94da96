//! Tiered fallback across providers, with synthetic data as the last tier.
//!
//! Each logical request runs the same state machine:
//!
//! ```text
//! CacheSweep ──hit──▶ Done(cached)
//!     │miss
//!     ▼
//! TryPrimary ──ok──▶ Done
//!     │err
//!     ▼
//! TryFallback₁ … TryFallbackₙ ──ok──▶ Done
//!     │err
//!     ▼
//! Mock (allow_mocks) ──▶ Done(mock)
//! Error (mocks disabled) ──▶ CoreError::ProviderExhausted
//! ```
//!
//! Providers are tried strictly one after another in priority order. Every
//! failed attempt is logged and kept in [`ProviderResult::attempts`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::adapters::{BirdeyeAdapter, CodexAdapter, CoingeckoAdapter};
use crate::cache::{spawn_pruner, CacheStats, TtlCache};
use crate::config::CoreConfig;
use crate::data_source::{
    info_cache_key, price_cache_key, Capability, HistoryRequest, HoldersRequest,
    ProviderCaches, ProviderError, ProviderFuture, TokenDataSource,
};
use crate::http_client::{HttpClient, OfflineHttpClient, ReqwestHttpClient};
use crate::metrics::{
    decentralization_score, lorenz_curve, sample_lorenz, DecentralizationScore,
    DistributionMetrics, HolderBuckets, LorenzPoint, ScoreSignals,
};
use crate::mock::DeterministicMockGenerator;
use crate::provider_policy::ProviderPolicy;
use crate::{
    AssetCatalog, CoreError, HolderPage, PricePoint, PriceSnapshot, ProviderId, SourceLabel,
    TokenId, TokenInfo, ValidationError,
};

/// Holders fetched for a metrics computation.
pub const METRICS_HOLDER_LIMIT: usize = 1_000;
pub const MAX_LORENZ_POINTS: usize = 101;

/// One failed provider attempt preceding the final answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackAttempt {
    pub provider: ProviderId,
    pub code: &'static str,
    pub message: String,
}

impl FallbackAttempt {
    fn from_error(error: &ProviderError) -> Self {
        Self {
            provider: error.provider(),
            code: error.code(),
            message: error.message().to_owned(),
        }
    }
}

/// Value plus provenance. `source == SourceLabel::Mock` is never authoritative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderResult<T> {
    pub data: T,
    pub source: SourceLabel,
    pub cached: bool,
    pub attempts: Vec<FallbackAttempt>,
}

impl<T> ProviderResult<T> {
    fn map<U>(self, f: impl FnOnce(T) -> U) -> ProviderResult<U> {
        ProviderResult {
            data: f(self.data),
            source: self.source,
            cached: self.cached,
            attempts: self.attempts,
        }
    }
}

/// Outcome of a batch price lookup. A token lands in exactly one of the maps.
#[derive(Debug, Default)]
pub struct BatchPrices {
    pub prices: BTreeMap<TokenId, ProviderResult<PriceSnapshot>>,
    /// Tokens no provider or mock could price.
    pub failed: BTreeMap<TokenId, CoreError>,
}

impl BatchPrices {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Distribution metrics for one token's holder snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenMetrics {
    pub token: TokenId,
    pub holder_count: u64,
    #[serde(flatten)]
    pub metrics: DistributionMetrics,
    pub holder_buckets: HolderBuckets,
    pub lorenz: Vec<LorenzPoint>,
    pub score: DecentralizationScore,
}

/// Provider snapshot used by the `sources` CLI command.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSnapshot {
    pub id: ProviderId,
    pub capabilities: Vec<&'static str>,
    pub cache: CacheStats,
}

type Invoke<R, T> = for<'a> fn(&'a dyn TokenDataSource, &'a R) -> ProviderFuture<'a, T>;
type CacheSelect<T> = for<'c> fn(&'c ProviderCaches) -> &'c TtlCache<T>;

/// One routed operation: which capability, how to call it, where to cache it.
struct Route<R, T> {
    operation: &'static str,
    capability: Capability,
    cache_key: String,
    cache: CacheSelect<T>,
    invoke: Invoke<R, T>,
}

/// Fallback orchestrator over the configured provider clients.
///
/// Holds no mutable state of its own; rate limiters and caches live inside
/// each client. Safe to share behind an `Arc` across concurrent callers.
pub struct Orchestrator {
    sources: Vec<Arc<dyn TokenDataSource>>,
    mock: DeterministicMockGenerator,
    catalog: Arc<AssetCatalog>,
    allow_mocks: bool,
    provider_timeout: Duration,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("sources", &self.source_ids())
            .field("allow_mocks", &self.allow_mocks)
            .field("provider_timeout", &self.provider_timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for an [`Orchestrator`].
///
/// # Example
///
/// ```rust,ignore
/// use tokenscope_core::{CoreConfig, OrchestratorBuilder};
///
/// let config = CoreConfig::from_env()?;
/// let orchestrator = OrchestratorBuilder::from_config(&config)?.build();
/// let price = orchestrator.get_token_price(&"bonk".parse()?).await?;
/// ```
pub struct OrchestratorBuilder {
    sources: Vec<Arc<dyn TokenDataSource>>,
    catalog: Arc<AssetCatalog>,
    allow_mocks: bool,
    provider_timeout: Duration,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorBuilder {
    /// Empty builder: no providers, mocks disabled.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            catalog: Arc::new(AssetCatalog::builtin()),
            allow_mocks: false,
            provider_timeout: crate::config::DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    /// Assembles the three real clients from configuration.
    ///
    /// The Codex key is required unless `config.offline` is set. Birdeye is
    /// skipped without a key; CoinGecko falls back to the public tier.
    pub fn from_config(config: &CoreConfig) -> Result<Self, CoreError> {
        let catalog = Arc::new(AssetCatalog::builtin());
        let entries = config.cache_max_entries;

        let (http, codex_key): (Arc<dyn HttpClient>, String) = if config.offline {
            info!("offline mode: provider requests are not sent");
            (
                Arc::new(OfflineHttpClient),
                config.codex_api_key.clone().unwrap_or_default(),
            )
        } else {
            (
                Arc::new(ReqwestHttpClient::new()),
                config.require_codex_key()?.to_owned(),
            )
        };

        let mut builder = Self::new()
            .with_catalog(Arc::clone(&catalog))
            .with_allow_mocks(config.allow_mocks)
            .with_provider_timeout(config.provider_timeout)
            .with_source(Arc::new(CodexAdapter::new(
                Arc::clone(&http),
                codex_key,
                Arc::clone(&catalog),
                ProviderPolicy::codex_default(),
                entries,
            )));

        // Offline runs keep Birdeye in the chain; its requests never leave the process.
        let birdeye_key = config
            .birdeye_api_key
            .clone()
            .or_else(|| config.offline.then(String::new));
        match birdeye_key {
            Some(key) => {
                builder = builder.with_source(Arc::new(BirdeyeAdapter::new(
                    Arc::clone(&http),
                    key,
                    Arc::clone(&catalog),
                    ProviderPolicy::birdeye_default(),
                    entries,
                )));
            }
            None => warn!("no Birdeye API key configured; birdeye provider skipped"),
        }

        Ok(builder.with_source(Arc::new(CoingeckoAdapter::new(
            http,
            config.coingecko_api_key.clone(),
            Arc::clone(&catalog),
            ProviderPolicy::coingecko_default(),
            entries,
        ))))
    }

    /// Registers a provider. A later source with the same id replaces the earlier one.
    pub fn with_source(mut self, source: Arc<dyn TokenDataSource>) -> Self {
        self.sources.retain(|existing| existing.id() != source.id());
        self.sources.push(source);
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<AssetCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_allow_mocks(mut self, allow_mocks: bool) -> Self {
        self.allow_mocks = allow_mocks;
        self
    }

    pub fn with_provider_timeout(mut self, provider_timeout: Duration) -> Self {
        self.provider_timeout = provider_timeout;
        self
    }

    pub fn build(mut self) -> Orchestrator {
        // Priority order is the declaration order of `ProviderId`.
        self.sources.sort_by_key(|source| source.id());

        Orchestrator {
            mock: DeterministicMockGenerator::new(Arc::clone(&self.catalog)),
            sources: self.sources,
            catalog: self.catalog,
            allow_mocks: self.allow_mocks,
            provider_timeout: self.provider_timeout,
        }
    }
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn allow_mocks(&self) -> bool {
        self.allow_mocks
    }

    pub fn source_ids(&self) -> Vec<ProviderId> {
        self.sources.iter().map(|source| source.id()).collect()
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    /// Maps symbols and addresses of catalog assets onto their slug, so
    /// `BONK`, `bonk` and the mint address share cache entries.
    pub fn canonical_token(&self, token: &TokenId) -> TokenId {
        self.catalog
            .resolve(token)
            .map(|asset| asset.id.clone())
            .unwrap_or_else(|| token.clone())
    }

    pub fn sources(&self) -> Vec<SourceSnapshot> {
        self.sources
            .iter()
            .map(|source| SourceSnapshot {
                id: source.id(),
                capabilities: source.capabilities().supported(),
                cache: source.caches().stats(),
            })
            .collect()
    }

    pub fn cache_stats(&self) -> Vec<(ProviderId, CacheStats)> {
        self.sources
            .iter()
            .map(|source| (source.id(), source.caches().stats()))
            .collect()
    }

    /// Periodically drops expired entries from every provider cache until
    /// `token` is cancelled. Never blocks request paths beyond one cache lock.
    pub fn spawn_cache_pruner(&self, every: Duration, token: CancellationToken) -> JoinHandle<()> {
        let sources = self.sources.clone();
        spawn_pruner(every, token, move || {
            sources
                .iter()
                .map(|source| source.caches().prune_expired())
                .sum()
        })
    }

    #[instrument(skip(self), fields(token = %token))]
    pub async fn get_token_price(
        &self,
        token: &TokenId,
    ) -> Result<ProviderResult<PriceSnapshot>, CoreError> {
        let token = self.canonical_token(token);
        let route = Route {
            operation: "price",
            capability: Capability::Price,
            cache_key: price_cache_key(&token),
            cache: price_cache,
            invoke: invoke_price,
        };
        self.route(route, &token, &self.chain(Capability::Price), Vec::new(), || {
            self.mock.price(&token)
        })
        .await
    }

    #[instrument(skip(self), fields(token = %token))]
    pub async fn get_price_history(
        &self,
        token: &TokenId,
        days: u32,
    ) -> Result<ProviderResult<Vec<PricePoint>>, CoreError> {
        let req = HistoryRequest::new(self.canonical_token(token), days).map_err(invalid_request)?;
        let route = Route {
            operation: "price_history",
            capability: Capability::PriceHistory,
            cache_key: req.cache_key(),
            cache: history_cache,
            invoke: invoke_history,
        };
        self.route(route, &req, &self.chain(Capability::PriceHistory), Vec::new(), || {
            self.mock.price_history(&req)
        })
        .await
    }

    #[instrument(skip(self), fields(token = %token))]
    pub async fn get_token_holders(
        &self,
        token: &TokenId,
        limit: usize,
        cursor: Option<String>,
    ) -> Result<ProviderResult<HolderPage>, CoreError> {
        let req = HoldersRequest::new(self.canonical_token(token), limit, cursor)
            .map_err(invalid_request)?;
        self.holders(&req).await
    }

    async fn holders(&self, req: &HoldersRequest) -> Result<ProviderResult<HolderPage>, CoreError> {
        let route = Route {
            operation: "holders",
            capability: Capability::Holders,
            cache_key: req.cache_key(),
            cache: holders_cache,
            invoke: invoke_holders,
        };
        self.route(route, req, &self.chain(Capability::Holders), Vec::new(), || {
            self.mock.holders(req)
        })
        .await
    }

    /// Holder snapshot turned into distribution metrics, buckets, a sampled
    /// Lorenz curve and the composite score. The source label is the one of
    /// the holder data the metrics were derived from.
    #[instrument(skip(self), fields(token = %token))]
    pub async fn get_token_metrics(
        &self,
        token: &TokenId,
    ) -> Result<ProviderResult<TokenMetrics>, CoreError> {
        let req = HoldersRequest::new(self.canonical_token(token), METRICS_HOLDER_LIMIT, None)
            .map_err(invalid_request)?;
        let holders = self.holders(&req).await?;

        // Real providers carry no growth history here; only mock data has
        // category-consistent signals.
        let signals = if holders.source.is_mock() {
            self.mock.score_signals(&req.token)
        } else {
            ScoreSignals::NEUTRAL
        };

        Ok(holders.map(|page| {
            let balances = page.balances();
            let metrics = DistributionMetrics::compute(&balances);
            let score = decentralization_score(&metrics, signals);
            TokenMetrics {
                holder_count: page.count,
                holder_buckets: HolderBuckets::from_holders(&page.holders),
                lorenz: sample_lorenz(&lorenz_curve(&balances), MAX_LORENZ_POINTS),
                token: page.token,
                metrics,
                score,
            }
        }))
    }

    #[instrument(skip(self), fields(token = %token))]
    pub async fn get_token_info(&self, token: &TokenId) -> Result<ProviderResult<TokenInfo>, CoreError> {
        let token = self.canonical_token(token);
        let route = Route {
            operation: "token_info",
            capability: Capability::TokenInfo,
            cache_key: info_cache_key(&token),
            cache: info_cache,
            invoke: invoke_info,
        };
        self.route(route, &token, &self.chain(Capability::TokenInfo), Vec::new(), || {
            self.mock.token_info(&token)
        })
        .await
    }

    /// Prices for many tokens. Batch-capable providers are asked first in a
    /// single call; tokens they do not cover fall back one by one through the
    /// remaining single-price providers.
    ///
    /// A token that cannot be priced is reported in [`BatchPrices::failed`]
    /// without discarding the others. The call itself fails only when nothing
    /// was priced because no provider or mock is configured.
    #[instrument(skip(self, tokens), fields(count = tokens.len()))]
    pub async fn get_batch_prices(&self, tokens: &[TokenId]) -> Result<BatchPrices, CoreError> {
        let mut pending: Vec<TokenId> = tokens.iter().map(|t| self.canonical_token(t)).collect();
        pending.sort();
        pending.dedup();

        let price_chain = self.chain(Capability::Price);
        let mut results = BTreeMap::new();
        pending.retain(|token| match self.cached(&price_chain, &price_cache_key(token), price_cache) {
            Some(hit) => {
                results.insert(token.clone(), hit);
                false
            }
            None => true,
        });

        let batch_sources = self.chain(Capability::BatchPrice);
        let mut batch_attempts = Vec::new();
        let mut failed = BTreeMap::new();
        for source in &batch_sources {
            if pending.is_empty() {
                break;
            }
            let outcome = self.call(source.as_ref(), source.batch_prices(&pending)).await;
            match outcome {
                Ok(mut prices) => {
                    debug!(provider = %source.id(), returned = prices.len(), "batch price call succeeded");
                    pending.retain(|token| match prices.remove(token) {
                        Some(snapshot) => {
                            source.caches().prices.set(price_cache_key(token), snapshot.clone(), None);
                            results.insert(
                                token.clone(),
                                ProviderResult {
                                    data: snapshot,
                                    source: source.id().into(),
                                    cached: false,
                                    attempts: batch_attempts.clone(),
                                },
                            );
                            false
                        }
                        None => true,
                    });
                }
                Err(error) => {
                    warn!(
                        provider = %error.provider(),
                        code = error.code(),
                        error = %error.message(),
                        "batch price call failed; falling back to per-token chain"
                    );
                    batch_attempts.push(FallbackAttempt::from_error(&error));
                }
            }
        }

        let batch_ids: Vec<ProviderId> = batch_sources.iter().map(|source| source.id()).collect();
        let chain: Vec<Arc<dyn TokenDataSource>> = price_chain
            .into_iter()
            .filter(|source| !batch_ids.contains(&source.id()))
            .collect();

        for token in pending {
            let route = Route {
                operation: "price",
                capability: Capability::Price,
                cache_key: price_cache_key(&token),
                cache: price_cache,
                invoke: invoke_price,
            };
            match self
                .route(route, &token, &chain, batch_attempts.clone(), || self.mock.price(&token))
                .await
            {
                Ok(result) => {
                    results.insert(token, result);
                }
                Err(error) => {
                    warn!(token = %token, code = error.code(), "token left unpriced in batch");
                    failed.insert(token, error);
                }
            }
        }

        if results.is_empty() {
            let unconfigured = failed
                .iter()
                .find(|(_, error)| matches!(error, CoreError::Configuration(_)))
                .map(|(token, _)| token.clone());
            if let Some(error) = unconfigured.and_then(|token| failed.remove(&token)) {
                return Err(error);
            }
        }

        Ok(BatchPrices {
            prices: results,
            failed,
        })
    }

    /// Registered providers offering `capability`, in priority order.
    fn chain(&self, capability: Capability) -> Vec<Arc<dyn TokenDataSource>> {
        self.sources
            .iter()
            .filter(|source| source.capabilities().supports(capability))
            .cloned()
            .collect()
    }

    fn cached<T: Clone>(
        &self,
        chain: &[Arc<dyn TokenDataSource>],
        key: &str,
        cache: CacheSelect<T>,
    ) -> Option<ProviderResult<T>> {
        chain.iter().find_map(|source| {
            cache(source.caches()).get(key).map(|data| {
                debug!(provider = %source.id(), key, "cache hit");
                ProviderResult {
                    data,
                    source: source.id().into(),
                    cached: true,
                    attempts: Vec::new(),
                }
            })
        })
    }

    /// Runs one provider call under the per-call deadline.
    async fn call<T>(
        &self,
        source: &dyn TokenDataSource,
        future: ProviderFuture<'_, T>,
    ) -> Result<T, ProviderError> {
        match tokio::time::timeout(self.provider_timeout, future).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout(source.id(), self.provider_timeout)),
        }
    }

    async fn route<R, T, M>(
        &self,
        route: Route<R, T>,
        request: &R,
        chain: &[Arc<dyn TokenDataSource>],
        mut attempts: Vec<FallbackAttempt>,
        mock: M,
    ) -> Result<ProviderResult<T>, CoreError>
    where
        R: Sync,
        T: Clone + Send,
        M: FnOnce() -> Result<T, ValidationError>,
    {
        if let Some(mut hit) = self.cached(chain, &route.cache_key, route.cache) {
            hit.attempts = attempts;
            return Ok(hit);
        }

        let mut last_error = None;
        for (position, source) in chain.iter().enumerate() {
            let provider = source.id();
            match self.call(source.as_ref(), (route.invoke)(source.as_ref(), request)).await {
                Ok(data) => {
                    (route.cache)(source.caches()).set(route.cache_key.clone(), data.clone(), None);
                    if !attempts.is_empty() {
                        info!(
                            operation = route.operation,
                            provider = %provider,
                            failed_attempts = attempts.len(),
                            "fallback succeeded"
                        );
                    }
                    return Ok(ProviderResult {
                        data,
                        source: provider.into(),
                        cached: false,
                        attempts,
                    });
                }
                Err(error) => {
                    let next = chain
                        .get(position + 1)
                        .map(|next| next.id().as_str())
                        .unwrap_or(if self.allow_mocks { "mock" } else { "error" });
                    warn!(
                        operation = route.operation,
                        provider = %provider,
                        code = error.code(),
                        error = %error.message(),
                        next,
                        "provider failed"
                    );
                    attempts.push(FallbackAttempt::from_error(&error));
                    last_error = Some(error);
                }
            }
        }

        if self.allow_mocks {
            warn!(operation = route.operation, "all providers failed; serving synthetic data");
            let data = mock().map_err(CoreError::Validation)?;
            return Ok(ProviderResult {
                data,
                source: SourceLabel::Mock,
                cached: false,
                attempts,
            });
        }

        match last_error {
            Some(last_error) => Err(CoreError::ProviderExhausted {
                operation: route.operation.to_owned(),
                last_error,
            }),
            None => Err(CoreError::Configuration(format!(
                "no provider configured for {} and synthetic fallback is disabled",
                route.capability
            ))),
        }
    }
}

fn invalid_request(error: ValidationError) -> CoreError {
    CoreError::InvalidRequest(error.to_string())
}

fn invoke_price<'a>(source: &'a dyn TokenDataSource, token: &'a TokenId) -> ProviderFuture<'a, PriceSnapshot> {
    source.price(token)
}

fn invoke_history<'a>(
    source: &'a dyn TokenDataSource,
    req: &'a HistoryRequest,
) -> ProviderFuture<'a, Vec<PricePoint>> {
    source.price_history(req)
}

fn invoke_holders<'a>(source: &'a dyn TokenDataSource, req: &'a HoldersRequest) -> ProviderFuture<'a, HolderPage> {
    source.holders(req)
}

fn invoke_info<'a>(source: &'a dyn TokenDataSource, token: &'a TokenId) -> ProviderFuture<'a, TokenInfo> {
    source.token_info(token)
}

fn price_cache(caches: &ProviderCaches) -> &TtlCache<PriceSnapshot> {
    &caches.prices
}

fn history_cache(caches: &ProviderCaches) -> &TtlCache<Vec<PricePoint>> {
    &caches.history
}

fn holders_cache(caches: &ProviderCaches) -> &TtlCache<HolderPage> {
    &caches.holders
}

fn info_cache(caches: &ProviderCaches) -> &TtlCache<TokenInfo> {
    &caches.info
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::data_source::CapabilitySet;
    use crate::provider_policy::CacheTtls;

    /// In-memory provider with a fixed outcome per call.
    struct StubSource {
        id: ProviderId,
        capabilities: CapabilitySet,
        caches: ProviderCaches,
        fail: Option<ProviderError>,
        stall: bool,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn new(id: ProviderId) -> Self {
            Self {
                id,
                capabilities: CapabilitySet::new(true, false, true, true, true),
                caches: ProviderCaches::new(ProviderPolicy::default_for(id).ttls, 16),
                fail: None,
                stall: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(id: ProviderId, status: u16) -> Self {
            Self {
                fail: Some(ProviderError::http_status(id, status, "stub")),
                ..Self::new(id)
            }
        }

        fn stalled(id: ProviderId) -> Self {
            Self {
                stall: true,
                ..Self::new(id)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn outcome<T>(&self, data: T) -> ProviderFuture<'_, T>
        where
            T: Send + 'static,
        {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail.clone();
            let stall = self.stall;
            Box::pin(async move {
                if stall {
                    tokio::time::sleep(Duration::from_secs(3_600)).await;
                }
                match fail {
                    Some(error) => Err(error),
                    None => Ok(data),
                }
            })
        }
    }

    impl TokenDataSource for StubSource {
        fn id(&self) -> ProviderId {
            self.id
        }

        fn capabilities(&self) -> CapabilitySet {
            self.capabilities
        }

        fn caches(&self) -> &ProviderCaches {
            &self.caches
        }

        fn price<'a>(&'a self, token: &'a TokenId) -> ProviderFuture<'a, PriceSnapshot> {
            let snapshot = PriceSnapshot::new(token.clone(), 2.0, None, None, None, None);
            match snapshot {
                Ok(snapshot) => self.outcome(snapshot),
                Err(error) => Box::pin(async move {
                    Err(ProviderError::validation_message(ProviderId::Codex, error.to_string()))
                }),
            }
        }

        fn holders<'a>(&'a self, req: &'a HoldersRequest) -> ProviderFuture<'a, HolderPage> {
            let page = HolderPage::new(req.token.clone(), 0, Vec::new(), None);
            match page {
                Ok(page) => self.outcome(page),
                Err(error) => Box::pin(async move {
                    Err(ProviderError::validation_message(ProviderId::Codex, error.to_string()))
                }),
            }
        }
    }

    fn token(raw: &str) -> TokenId {
        TokenId::parse(raw).expect("valid token")
    }

    fn orchestrator(sources: Vec<Arc<StubSource>>, allow_mocks: bool) -> Orchestrator {
        sources
            .into_iter()
            .fold(OrchestratorBuilder::new(), |builder, source| builder.with_source(source))
            .with_allow_mocks(allow_mocks)
            .with_provider_timeout(Duration::from_millis(50))
            .build()
    }

    #[tokio::test]
    async fn primary_success_short_circuits_the_chain() {
        let codex = Arc::new(StubSource::new(ProviderId::Codex));
        let birdeye = Arc::new(StubSource::new(ProviderId::Birdeye));
        let orchestrator = orchestrator(vec![Arc::clone(&birdeye), Arc::clone(&codex)], false);

        let result = orchestrator.get_token_price(&token("bonk")).await.expect("price");

        assert_eq!(result.source, SourceLabel::Codex);
        assert!(!result.cached);
        assert_eq!(codex.calls(), 1);
        assert_eq!(birdeye.calls(), 0);
    }

    #[tokio::test]
    async fn second_call_is_served_from_the_producing_cache() {
        let codex = Arc::new(StubSource::failing(ProviderId::Codex, 503));
        let birdeye = Arc::new(StubSource::new(ProviderId::Birdeye));
        let orchestrator = orchestrator(vec![Arc::clone(&codex), Arc::clone(&birdeye)], false);

        let first = orchestrator.get_token_price(&token("BONK")).await.expect("price");
        let second = orchestrator.get_token_price(&token("bonk")).await.expect("price");

        assert_eq!(first.source, SourceLabel::Birdeye);
        assert_eq!(first.attempts.len(), 1);
        assert_eq!(first.attempts[0].code, "provider.transport");
        assert_eq!(second.source, SourceLabel::Birdeye);
        assert!(second.cached);
        assert_eq!(codex.calls(), 1);
        assert_eq!(birdeye.calls(), 1);
        assert!(birdeye.caches().prices.has("price:bonk"));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_provider_is_abandoned_at_the_deadline() {
        let codex = Arc::new(StubSource::stalled(ProviderId::Codex));
        let birdeye = Arc::new(StubSource::new(ProviderId::Birdeye));
        let orchestrator = orchestrator(vec![codex, birdeye], false);

        let result = orchestrator
            .get_token_holders(&token("jup"), 10, None)
            .await
            .expect("holders");

        assert_eq!(result.source, SourceLabel::Birdeye);
        assert_eq!(result.attempts[0].code, "provider.timeout");
    }

    #[tokio::test]
    async fn exhausted_chain_without_mocks_surfaces_last_error() {
        let codex = Arc::new(StubSource::failing(ProviderId::Codex, 500));
        let birdeye = Arc::new(StubSource::failing(ProviderId::Birdeye, 404));
        let orchestrator = orchestrator(vec![codex, birdeye], false);

        let error = orchestrator
            .get_token_price(&token("wif"))
            .await
            .expect_err("all providers fail");

        assert_eq!(error.code(), "MOCKS_DISABLED");
        match error {
            CoreError::ProviderExhausted { last_error, .. } => {
                assert_eq!(last_error.provider(), ProviderId::Birdeye);
                assert_eq!(last_error.status(), Some(404));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn exhausted_chain_with_mocks_is_labelled_mock_and_not_cached() {
        let codex = Arc::new(StubSource::failing(ProviderId::Codex, 500));
        let orchestrator = orchestrator(vec![Arc::clone(&codex)], true);

        let first = orchestrator.get_token_price(&token("sol")).await.expect("mock price");
        let second = orchestrator.get_token_price(&token("sol")).await.expect("mock price");

        assert_eq!(first.source, SourceLabel::Mock);
        assert_eq!(first.data, second.data);
        assert_eq!(codex.calls(), 2);
    }

    #[tokio::test]
    async fn unsupported_operation_skips_provider() {
        let mut coingecko = StubSource::new(ProviderId::Coingecko);
        coingecko.capabilities = CapabilitySet::new(true, true, false, false, false);
        let coingecko = Arc::new(coingecko);
        let orchestrator = orchestrator(vec![Arc::clone(&coingecko)], true);

        let info = orchestrator.get_token_info(&token("jto")).await.expect("mock info");

        assert_eq!(info.source, SourceLabel::Mock);
        assert!(info.attempts.is_empty());
        assert_eq!(coingecko.calls(), 0);
    }

    #[tokio::test]
    async fn no_provider_and_no_mocks_is_a_configuration_error() {
        let orchestrator = orchestrator(Vec::new(), false);

        let error = orchestrator
            .get_token_info(&token("jto"))
            .await
            .expect_err("nothing can answer");

        assert_eq!(error.code(), "CONFIGURATION");
    }

    #[tokio::test]
    async fn synthetic_holders_reject_a_foreign_cursor() {
        let orchestrator = orchestrator(Vec::new(), true);

        let error = orchestrator
            .get_token_holders(&token("bonk"), 10, Some(String::from("c2")))
            .await
            .expect_err("mock pages are addressed by offset");

        assert_eq!(error.code(), "VALIDATION");
    }

    #[tokio::test]
    async fn metrics_carry_holder_source_and_sampled_lorenz() {
        let orchestrator = orchestrator(Vec::new(), true);

        let result = orchestrator.get_token_metrics(&token("bonk")).await.expect("metrics");

        assert_eq!(result.source, SourceLabel::Mock);
        assert!(result.data.lorenz.len() <= MAX_LORENZ_POINTS);
        assert_eq!(result.data.metrics.sampled_holders, METRICS_HOLDER_LIMIT);
        assert!(result.data.holder_count >= result.data.metrics.sampled_holders as u64);
        assert!((0.0..=1.0).contains(&result.data.metrics.gini));
    }

    #[tokio::test]
    async fn invalid_limit_is_rejected_before_any_call() {
        let codex = Arc::new(StubSource::new(ProviderId::Codex));
        let orchestrator = orchestrator(vec![Arc::clone(&codex)], true);

        let error = orchestrator
            .get_token_holders(&token("bonk"), 0, None)
            .await
            .expect_err("limit must be positive");

        assert_eq!(error.code(), "INVALID_REQUEST");
        assert_eq!(codex.calls(), 0);
    }

    #[test]
    fn cache_ttls_follow_the_producing_provider() {
        let codex = StubSource::new(ProviderId::Codex);
        let coingecko = StubSource::new(ProviderId::Coingecko);
        let expected: CacheTtls = ProviderPolicy::coingecko_default().ttls;

        assert_eq!(coingecko.caches().prices.default_ttl(), expected.price);
        assert!(codex.caches().prices.default_ttl() < coingecko.caches().prices.default_ttl());
    }
}
