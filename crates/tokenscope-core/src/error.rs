use thiserror::Error;

use crate::data_source::ProviderError;

/// Validation and contract errors exposed by `tokenscope-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("token id cannot be empty")]
    EmptyTokenId,
    #[error("token id length {len} exceeds max {max}")]
    TokenIdTooLong { len: usize, max: usize },
    #[error("token id contains invalid character '{ch}' at index {index}")]
    TokenIdInvalidChar { ch: char, index: usize },

    #[error("invalid source '{value}', expected one of codex, birdeye, coingecko")]
    InvalidSource { value: String },
    #[error("invalid asset category '{value}', expected one of egalitarian, community, concentrated")]
    InvalidCategory { value: String },

    #[error("holders cursor must be a numeric offset, got '{value}'")]
    InvalidCursor { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("field '{field}' must be within [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
}

/// Errors that escape the orchestrator to its callers.
///
/// Transport and validation failures of individual providers never appear here
/// directly; they are absorbed into the fallback chain and only surface as the
/// `last_error` of [`CoreError::ProviderExhausted`].
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("all providers failed for {operation} and synthetic fallback is disabled (MOCKS_DISABLED): {last_error}")]
    ProviderExhausted {
        operation: String,
        last_error: ProviderError,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ProviderExhausted { .. } => "MOCKS_DISABLED",
            Self::Configuration(_) => "CONFIGURATION",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Validation(_) => "VALIDATION",
            Self::Serialization(_) => "SERIALIZATION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderId;

    #[test]
    fn exhausted_error_keeps_last_provider_error() {
        let last = ProviderError::timeout(ProviderId::Birdeye, std::time::Duration::from_secs(2));
        let error = CoreError::ProviderExhausted {
            operation: String::from("holders(bonk)"),
            last_error: last.clone(),
        };

        assert_eq!(error.code(), "MOCKS_DISABLED");
        assert!(error.to_string().contains("MOCKS_DISABLED"));
        match error {
            CoreError::ProviderExhausted { last_error, .. } => assert_eq!(last_error, last),
            other => panic!("unexpected error: {other}"),
        }
    }
}
