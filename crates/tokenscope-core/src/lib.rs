//! # Tokenscope Core
//!
//! Resilient access to token market and holder data, and the statistics
//! that turn holder balances into decentralization metrics.
//!
//! ## Overview
//!
//! - **Provider clients** for Codex (GraphQL), Birdeye and CoinGecko (REST)
//! - **Rate limiting** per provider with a token bucket
//! - **Retry with backoff** and a per-request deadline
//! - **TTL/LRU caches** owned by each provider client
//! - **Response validation** at the provider boundary
//! - **Fallback orchestration** across providers, with deterministic
//!   synthetic data as an opt-in last resort
//! - **Distribution metrics**: Gini, HHI, Nakamoto, Shannon entropy, Palma,
//!   Lorenz curve and a composite decentralization score
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider clients (Codex, Birdeye, CoinGecko) |
//! | [`cache`] | TTL cache with LRU eviction |
//! | [`config`] | Environment configuration |
//! | [`data_source`] | Provider contract and request types |
//! | [`domain`] | Domain models (token ids, prices, holders, asset catalog) |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`metrics`] | Distribution metrics and scoring |
//! | [`mock`] | Deterministic synthetic data |
//! | [`orchestrator`] | Fallback chain across providers |
//! | [`provider_policy`] | Per-provider rate, retry and cache defaults |
//! | [`retry`] | Retry with exponential backoff |
//! | [`source`] | Provider identifiers and source labels |
//! | [`throttling`] | Token-bucket rate limiting |
//! | [`validation`] | Field-by-field JSON validation |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tokenscope_core::{CoreConfig, OrchestratorBuilder, TokenId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CoreConfig::from_env()?;
//!     let orchestrator = OrchestratorBuilder::from_config(&config)?.build();
//!
//!     let holders = orchestrator
//!         .get_token_holders(&TokenId::parse("bonk")?, 100, None)
//!         .await?;
//!     println!("{} holders via {}", holders.data.count, holders.source);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / Caller   │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Orchestrator   │────▶│ Mock Generator   │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Provider Client │────▶│ Limiter / Retry  │
//! │ (+ own caches)  │     │ HTTP Client      │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Metrics Engine  │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Provider failures are absorbed by the fallback chain. Only
//! [`CoreError::ProviderExhausted`], [`CoreError::Configuration`] and
//! [`CoreError::InvalidRequest`] reach callers:
//!
//! ```rust
//! use tokenscope_core::CoreError;
//!
//! fn exit_code(error: &CoreError) -> i32 {
//!     match error {
//!         CoreError::InvalidRequest(_) | CoreError::Validation(_) => 2,
//!         CoreError::ProviderExhausted { .. } => 3,
//!         CoreError::Configuration(_) => 4,
//!         CoreError::Serialization(_) => 5,
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - API keys are read from the environment only and never logged
//! - Transport errors report the host, never the full URL or headers

pub mod adapters;
pub mod cache;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod metrics;
pub mod mock;
pub mod orchestrator;
pub mod provider_policy;
pub mod retry;
pub mod source;
pub mod throttling;
pub mod validation;

// Adapter implementations
pub use adapters::{BirdeyeAdapter, CodexAdapter, CoingeckoAdapter};

// Caching
pub use cache::{CacheStats, TtlCache};

// Configuration
pub use config::CoreConfig;

// Provider contract
pub use data_source::{
    Capability, CapabilitySet, HistoryRequest, HoldersRequest, ProviderCaches, ProviderError,
    ProviderErrorKind, ProviderFuture, TokenDataSource,
};

// Domain models
pub use domain::{
    Asset, AssetCatalog, AssetCategory, HolderBalance, HolderPage, PricePoint, PriceSnapshot,
    TokenId, TokenInfo, UtcDateTime, PERCENT_SUM_TOLERANCE,
};

// Error types
pub use error::{CoreError, ValidationError};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, OfflineHttpClient,
    ReqwestHttpClient,
};

// Metrics
pub use metrics::{
    DecentralizationScore, DistributionMetrics, Grade, HolderBuckets, LorenzPoint, ScoreSignals,
};

// Synthetic data
pub use mock::DeterministicMockGenerator;

// Orchestration
pub use orchestrator::{
    BatchPrices, FallbackAttempt, Orchestrator, OrchestratorBuilder, ProviderResult, SourceSnapshot,
    TokenMetrics,
};

// Provider policies
pub use provider_policy::{CacheTtls, ProviderPolicy};

// Retry logic
pub use retry::{Backoff, RetryPolicy};

// Source identifiers
pub use source::{ProviderId, SourceLabel};

// Throttling
pub use throttling::{RateBucket, RateLimiter};
