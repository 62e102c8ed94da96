use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{TokenId, ValidationError};

/// Codex network id for Solana mainnet.
pub const SOLANA_NETWORK_ID: u64 = 1_399_811_149;

/// Distribution profile used to shape synthetic data for an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    /// Low concentration, broad ownership (L1 gas tokens).
    Egalitarian,
    /// Community/meme tokens with a fat retail tail.
    Community,
    /// Team, treasury or institutional heavy supply.
    Concentrated,
}

impl AssetCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Egalitarian => "egalitarian",
            Self::Community => "community",
            Self::Concentrated => "concentrated",
        }
    }
}

impl Display for AssetCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetCategory {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "egalitarian" => Ok(Self::Egalitarian),
            "community" => Ok(Self::Community),
            "concentrated" | "institutional" => Ok(Self::Concentrated),
            other => Err(ValidationError::InvalidCategory {
                value: other.to_owned(),
            }),
        }
    }
}

/// Static description of a tracked asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: TokenId,
    pub symbol: String,
    pub name: String,
    pub network: String,
    pub network_id: u64,
    pub address: String,
    pub coingecko_id: Option<String>,
    pub category: AssetCategory,
    pub total_supply: Option<f64>,
}

impl Asset {
    #[allow(clippy::too_many_arguments)]
    fn solana(
        slug: &str,
        symbol: &str,
        name: &str,
        address: &str,
        coingecko_id: &str,
        category: AssetCategory,
        total_supply: f64,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: TokenId::parse(slug)?,
            symbol: symbol.to_owned(),
            name: name.to_owned(),
            network: String::from("solana"),
            network_id: SOLANA_NETWORK_ID,
            address: address.to_owned(),
            coingecko_id: Some(coingecko_id.to_owned()),
            category,
            total_supply: Some(total_supply),
        })
    }
}

/// Lookup table from token ids (slug, symbol or address) to assets.
#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    assets: Vec<Asset>,
}

impl AssetCatalog {
    pub fn empty() -> Self {
        Self { assets: Vec::new() }
    }

    /// The Solana assets tracked out of the box.
    pub fn builtin() -> Self {
        let entries = [
            Asset::solana(
                "sol",
                "SOL",
                "Wrapped SOL",
                "So11111111111111111111111111111111111111112",
                "solana",
                AssetCategory::Egalitarian,
                590_000_000.0,
            ),
            Asset::solana(
                "jup",
                "JUP",
                "Jupiter",
                "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN",
                "jupiter-exchange-solana",
                AssetCategory::Concentrated,
                10_000_000_000.0,
            ),
            Asset::solana(
                "bonk",
                "BONK",
                "Bonk",
                "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263",
                "bonk",
                AssetCategory::Community,
                88_870_000_000_000.0,
            ),
            Asset::solana(
                "wif",
                "WIF",
                "dogwifhat",
                "EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm",
                "dogwifcoin",
                AssetCategory::Community,
                998_840_000.0,
            ),
            Asset::solana(
                "jto",
                "JTO",
                "Jito",
                "jtojtomepa8beP8AuQc6eXt5FriJwfFMwQx2v2f9mCL",
                "jito-governance-token",
                AssetCategory::Concentrated,
                1_000_000_000.0,
            ),
            Asset::solana(
                "pyth",
                "PYTH",
                "Pyth Network",
                "HZ1JovNiVvGrGNiiYvEozEVgZ58xaU3RKwX8eACQBCt3",
                "pyth-network",
                AssetCategory::Concentrated,
                10_000_000_000.0,
            ),
        ];

        // Built-in slugs and addresses are constants that always parse.
        Self {
            assets: entries.into_iter().filter_map(Result::ok).collect(),
        }
    }

    pub fn with_asset(mut self, asset: Asset) -> Self {
        self.assets.retain(|existing| existing.id != asset.id);
        self.assets.push(asset);
        self
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn resolve(&self, token: &TokenId) -> Option<&Asset> {
        let raw = token.as_str();
        self.assets.iter().find(|asset| {
            asset.address == raw
                || asset.id.as_str().eq_ignore_ascii_case(raw)
                || asset.symbol.eq_ignore_ascii_case(raw)
        })
    }

    /// Unknown tokens are treated as community tokens.
    pub fn category_for(&self, token: &TokenId) -> AssetCategory {
        self.resolve(token)
            .map(|asset| asset.category)
            .unwrap_or(AssetCategory::Community)
    }

    /// On-chain address used in provider calls; raw ids pass through unchanged.
    pub fn address_for(&self, token: &TokenId) -> String {
        self.resolve(token)
            .map(|asset| asset.address.clone())
            .unwrap_or_else(|| token.as_str().to_owned())
    }

    pub fn network_id_for(&self, token: &TokenId) -> u64 {
        self.resolve(token)
            .map(|asset| asset.network_id)
            .unwrap_or(SOLANA_NETWORK_ID)
    }

    pub fn coingecko_id_for(&self, token: &TokenId) -> Option<String> {
        self.resolve(token)
            .and_then(|asset| asset.coingecko_id.clone())
    }
}
