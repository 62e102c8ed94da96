use thiserror::Error;
use tokenscope_core::CoreError;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] tokenscope_core::ValidationError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Core(error) => match error {
                CoreError::InvalidRequest(_) | CoreError::Validation(_) => 2,
                CoreError::ProviderExhausted { .. } => 3,
                CoreError::Configuration(_) => 4,
                CoreError::Serialization(_) => 5,
            },
            Self::Serialization(_) => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_exit_with_four() {
        let error = CliError::from(CoreError::Configuration(String::from("missing key")));
        assert_eq!(error.exit_code(), 4);
    }

    #[test]
    fn bad_token_exits_with_two() {
        let error = CliError::from(tokenscope_core::ValidationError::EmptyTokenId);
        assert_eq!(error.exit_code(), 2);
    }
}
