use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical identifiers of the external providers, in default priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Codex,
    Birdeye,
    Coingecko,
}

impl ProviderId {
    pub const ALL: [Self; 3] = [Self::Codex, Self::Birdeye, Self::Coingecko];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Codex => "codex",
            Self::Birdeye => "birdeye",
            Self::Coingecko => "coingecko",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "codex" => Ok(Self::Codex),
            "birdeye" => Ok(Self::Birdeye),
            "coingecko" => Ok(Self::Coingecko),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}

/// Provenance of a result handed to callers.
///
/// `Mock` marks deterministic synthetic data. It is never authoritative and
/// consumers must not present it as if a real provider had produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLabel {
    Codex,
    Birdeye,
    Coingecko,
    Mock,
}

impl SourceLabel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Codex => "codex",
            Self::Birdeye => "birdeye",
            Self::Coingecko => "coingecko",
            Self::Mock => "mock",
        }
    }

    pub const fn is_mock(self) -> bool {
        matches!(self, Self::Mock)
    }

    pub const fn provider(self) -> Option<ProviderId> {
        match self {
            Self::Codex => Some(ProviderId::Codex),
            Self::Birdeye => Some(ProviderId::Birdeye),
            Self::Coingecko => Some(ProviderId::Coingecko),
            Self::Mock => None,
        }
    }
}

impl From<ProviderId> for SourceLabel {
    fn from(value: ProviderId) -> Self {
        match value {
            ProviderId::Codex => Self::Codex,
            ProviderId::Birdeye => Self::Birdeye,
            ProviderId::Coingecko => Self::Coingecko,
        }
    }
}

impl Display for SourceLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
