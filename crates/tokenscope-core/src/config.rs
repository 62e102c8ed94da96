//! Process configuration read from the environment.
//!
//! # Environment Variables
//!
//! | Setting | Primary Env Var | Fallback Env Var | Default |
//! |---------|-----------------|------------------|---------|
//! | Codex key | `TOKENSCOPE_CODEX_API_KEY` | `CODEX_API_KEY` | required |
//! | Birdeye key | `TOKENSCOPE_BIRDEYE_API_KEY` | `BIRDEYE_API_KEY` | provider skipped |
//! | CoinGecko key | `TOKENSCOPE_COINGECKO_API_KEY` | `COINGECKO_API_KEY` | public tier |
//! | Synthetic fallback | `TOKENSCOPE_ALLOW_MOCKS` | `ALLOW_MOCKS` | `false` |
//! | Provider call deadline | `TOKENSCOPE_PROVIDER_TIMEOUT_MS` | - | `8000` |
//! | Cache capacity | `TOKENSCOPE_CACHE_MAX_ENTRIES` | - | `1000` |
//!
//! A `.env` file in the working directory is loaded first when present;
//! variables already set in the process take precedence over it.

use std::env;
use std::fmt::{Debug, Formatter};
use std::time::Duration;

use crate::CoreError;

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_millis(8_000);
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1_000;

#[derive(Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub codex_api_key: Option<String>,
    pub birdeye_api_key: Option<String>,
    pub coingecko_api_key: Option<String>,
    /// Read once; the orchestrator never re-reads it per request.
    pub allow_mocks: bool,
    pub provider_timeout: Duration,
    pub cache_max_entries: usize,
    /// Route every call through the offline transport.
    pub offline: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            codex_api_key: None,
            birdeye_api_key: None,
            coingecko_api_key: None,
            allow_mocks: false,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            offline: false,
        }
    }
}

impl Debug for CoreConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("CoreConfig")
            .field("codex_api_key", &redact(&self.codex_api_key))
            .field("birdeye_api_key", &redact(&self.birdeye_api_key))
            .field("coingecko_api_key", &redact(&self.coingecko_api_key))
            .field("allow_mocks", &self.allow_mocks)
            .field("provider_timeout", &self.provider_timeout)
            .field("cache_max_entries", &self.cache_max_entries)
            .field("offline", &self.offline)
            .finish()
    }
}

impl CoreConfig {
    /// Loads `.env` (best effort) and reads the process environment.
    ///
    /// Missing keys are not an error here; [`CoreConfig::require_codex_key`]
    /// is checked when real clients are assembled.
    pub fn from_env() -> Result<Self, CoreError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefixed = |name: &str| {
            lookup(&format!("TOKENSCOPE_{name}"))
                .or_else(|| lookup(name))
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let allow_mocks = match prefixed("ALLOW_MOCKS") {
            Some(raw) => parse_bool("ALLOW_MOCKS", &raw)?,
            None => false,
        };

        let provider_timeout = match lookup("TOKENSCOPE_PROVIDER_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(parse_positive("TOKENSCOPE_PROVIDER_TIMEOUT_MS", &raw)?),
            None => DEFAULT_PROVIDER_TIMEOUT,
        };

        let cache_max_entries = match lookup("TOKENSCOPE_CACHE_MAX_ENTRIES") {
            Some(raw) => parse_positive("TOKENSCOPE_CACHE_MAX_ENTRIES", &raw)? as usize,
            None => DEFAULT_CACHE_MAX_ENTRIES,
        };

        Ok(Self {
            codex_api_key: prefixed("CODEX_API_KEY"),
            birdeye_api_key: prefixed("BIRDEYE_API_KEY"),
            coingecko_api_key: prefixed("COINGECKO_API_KEY"),
            allow_mocks,
            provider_timeout,
            cache_max_entries,
            offline: false,
        })
    }

    pub fn with_allow_mocks(mut self, allow_mocks: bool) -> Self {
        self.allow_mocks = allow_mocks;
        self
    }

    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn with_provider_timeout(mut self, provider_timeout: Duration) -> Self {
        self.provider_timeout = provider_timeout;
        self
    }

    pub fn with_codex_key(mut self, key: impl Into<String>) -> Self {
        self.codex_api_key = Some(key.into());
        self
    }

    pub fn require_codex_key(&self) -> Result<&str, CoreError> {
        self.codex_api_key.as_deref().ok_or_else(|| {
            CoreError::Configuration(String::from(
                "missing Codex API key (set TOKENSCOPE_CODEX_API_KEY or CODEX_API_KEY)",
            ))
        })
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, CoreError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CoreError::Configuration(format!(
            "{name} must be a boolean, got '{raw}'"
        ))),
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<u64, CoreError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(CoreError::Configuration(format!(
            "{name} must be a positive integer, got '{raw}'"
        ))),
    }
}
