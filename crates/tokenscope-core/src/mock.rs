//! Deterministic synthetic data, the last resort of the fallback chain.
//!
//! Every value is drawn from a `fastrand::Rng` seeded with the FNV-1a hash of
//! `token + purpose suffix`, so the same token and purpose always yield the
//! same numbers. Shapes depend on the asset's [`AssetCategory`]: holder
//! balances follow a Pareto rank law whose tail exponent, holder base and
//! growth rate are set per category.
//!
//! Results built here are always labelled `SourceLabel::Mock` by the
//! orchestrator and must never be presented as real data.

use std::sync::Arc;

use crate::data_source::{HistoryRequest, HoldersRequest};
use crate::metrics::ScoreSignals;
use crate::{
    AssetCatalog, AssetCategory, HolderBalance, HolderPage, PricePoint, PriceSnapshot, TokenId,
    TokenInfo, UtcDateTime, ValidationError,
};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

const SECONDS_PER_DAY: i64 = 86_400;
const DEFAULT_SUPPLY: f64 = 1_000_000_000.0;

/// Seed purposes. Distinct suffixes keep the streams independent.
const PRICE_PURPOSE: &str = "_price";
const HISTORY_PURPOSE: &str = "_history";
const HOLDERS_PURPOSE: &str = "_holders";
const METRICS_PURPOSE: &str = "_metrics";
const INFO_PURPOSE: &str = "_info";

/// Distribution shape used for one asset category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryProfile {
    /// Pareto tail exponent; larger means a thinner tail and flatter ranks.
    pub tail_alpha: f64,
    pub baseline_gini: f64,
    /// Monthly holder-count growth rate.
    pub holder_growth_rate: f64,
    pub base_holders: u64,
    pub daily_volatility: f64,
}

impl CategoryProfile {
    pub const fn for_category(category: AssetCategory) -> Self {
        match category {
            AssetCategory::Egalitarian => Self {
                tail_alpha: 2.2,
                baseline_gini: 0.55,
                holder_growth_rate: 0.008,
                base_holders: 200_000,
                daily_volatility: 0.03,
            },
            AssetCategory::Community => Self {
                tail_alpha: 1.6,
                baseline_gini: 0.72,
                holder_growth_rate: 0.015,
                base_holders: 50_000,
                daily_volatility: 0.08,
            },
            AssetCategory::Concentrated => Self {
                tail_alpha: 1.1,
                baseline_gini: 0.88,
                holder_growth_rate: 0.003,
                base_holders: 5_000,
                daily_volatility: 0.05,
            },
        }
    }
}

/// 64-bit FNV-1a over the UTF-8 bytes of `token` followed by `purpose`.
pub fn seed_for(token: &TokenId, purpose: &str) -> u64 {
    token
        .as_str()
        .bytes()
        .chain(purpose.bytes())
        .fold(FNV_OFFSET_BASIS, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
        })
}

#[derive(Debug, Clone)]
pub struct DeterministicMockGenerator {
    catalog: Arc<AssetCatalog>,
}

impl DeterministicMockGenerator {
    pub fn new(catalog: Arc<AssetCatalog>) -> Self {
        Self { catalog }
    }

    fn rng(&self, token: &TokenId, purpose: &str) -> fastrand::Rng {
        fastrand::Rng::with_seed(seed_for(token, purpose))
    }

    pub fn profile(&self, token: &TokenId) -> CategoryProfile {
        CategoryProfile::for_category(self.catalog.category_for(token))
    }

    fn supply(&self, token: &TokenId) -> f64 {
        self.catalog
            .resolve(token)
            .and_then(|asset| asset.total_supply)
            .unwrap_or(DEFAULT_SUPPLY)
    }

    pub fn price(&self, token: &TokenId) -> Result<PriceSnapshot, ValidationError> {
        let mut rng = self.rng(token, PRICE_PURPOSE);
        let profile = self.profile(token);

        // Log-uniform between 1e-5 and 1e2 USD.
        let price = 10_f64.powf(rng.f64() * 7.0 - 5.0);
        let change_24h = (rng.f64() * 2.0 - 1.0) * profile.daily_volatility * 100.0;
        let market_cap = price * self.supply(token) * (0.5 + rng.f64() * 0.45);
        let volume_24h = market_cap * (0.01 + rng.f64() * 0.09);

        PriceSnapshot::new(
            token.clone(),
            price,
            Some(change_24h),
            Some(volume_24h),
            Some(market_cap),
            None,
        )
    }

    /// Daily series ending at today's UTC midnight, walking backwards from
    /// the mock spot price so both views agree.
    pub fn price_history(&self, req: &HistoryRequest) -> Result<Vec<PricePoint>, ValidationError> {
        let spot = self.price(&req.token)?;
        let profile = self.profile(&req.token);
        let mut rng = self.rng(&req.token, HISTORY_PURPOSE);
        let today = UtcDateTime::now().start_of_day().unix_seconds();

        let days = req.days as usize;
        let mut prices = Vec::with_capacity(days);
        let mut price = spot.price;
        for _ in 0..days {
            prices.push(price);
            let daily_return = (rng.f64() * 2.0 - 1.0) * profile.daily_volatility;
            price = (price / (1.0 + daily_return)).max(f64::MIN_POSITIVE);
        }
        prices.reverse();

        prices
            .into_iter()
            .enumerate()
            .map(|(index, price)| {
                let offset = (days - 1 - index) as i64 * SECONDS_PER_DAY;
                let ts = UtcDateTime::from_unix_seconds(today - offset)?;
                let volume = spot.volume_24h.map(|volume| volume * (0.5 + rng.f64()));
                PricePoint::new(ts, price, volume)
            })
            .collect()
    }

    /// Pareto rank-law page: the holder at rank `r` owns a share proportional
    /// to `r^(-1/alpha)`, normalized over the whole holder population so the
    /// page never claims more than 100% of supply.
    pub fn holders(&self, req: &HoldersRequest) -> Result<HolderPage, ValidationError> {
        let profile = self.profile(&req.token);
        let mut rng = self.rng(&req.token, HOLDERS_PURPOSE);
        let supply = self.supply(&req.token);

        let count = (profile.base_holders as f64 * (0.75 + rng.f64() * 0.5)).round() as u64;
        let count = count.max(1);
        let offset = match req.cursor.as_deref() {
            None => 0,
            Some(cursor) => cursor.trim().parse::<u64>().map_err(|_| {
                ValidationError::InvalidCursor {
                    value: cursor.to_owned(),
                }
            })?,
        }
        .min(count);
        let end = (offset + req.limit as u64).min(count);

        let exponent = 1.0 / profile.tail_alpha;
        let normalizer: f64 = (1..=count).map(|rank| (rank as f64).powf(-exponent)).sum();

        let mut percents: Vec<f64> = (offset + 1..=end)
            .map(|rank| {
                let jitter = 0.95 + rng.f64() * 0.1;
                (rank as f64).powf(-exponent) / normalizer * 100.0 * jitter
            })
            .collect();

        let page_sum: f64 = percents.iter().sum();
        if page_sum > 100.0 {
            percents.iter_mut().for_each(|p| *p *= 100.0 / page_sum);
        }
        percents.sort_by(|a, b| b.total_cmp(a));

        let holders = percents
            .into_iter()
            .enumerate()
            .map(|(index, percent)| {
                let percent = percent.clamp(0.0, 100.0);
                HolderBalance::new(
                    mock_address(&mut rng, offset as usize + index),
                    supply * percent / 100.0,
                    percent,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let cursor = (end < count).then(|| end.to_string());
        HolderPage::new(req.token.clone(), count, holders, cursor)
    }

    pub fn token_info(&self, token: &TokenId) -> Result<TokenInfo, ValidationError> {
        let mut rng = self.rng(token, INFO_PURPOSE);
        let supply = self.supply(token);
        let circulating = supply * (0.6 + rng.f64() * 0.35);

        match self.catalog.resolve(token) {
            Some(asset) => TokenInfo::new(
                token.clone(),
                asset.name.clone(),
                asset.symbol.clone(),
                Some(asset.address.clone()),
                Some(asset.network.clone()),
                None,
                Some(supply),
                Some(circulating),
            ),
            None => {
                let symbol: String = token
                    .as_str()
                    .chars()
                    .take(6)
                    .collect::<String>()
                    .to_ascii_uppercase();
                TokenInfo::new(
                    token.clone(),
                    format!("Unknown token {symbol}"),
                    symbol,
                    token.is_address().then(|| token.as_str().to_owned()),
                    None,
                    None,
                    Some(supply),
                    Some(circulating),
                )
            }
        }
    }

    /// Growth and stability signals consistent with the category profile.
    pub fn score_signals(&self, token: &TokenId) -> ScoreSignals {
        let profile = self.profile(token);
        let mut rng = self.rng(token, METRICS_PURPOSE);

        let growth = profile.holder_growth_rate / 0.02 * (0.9 + rng.f64() * 0.2);
        let stability = (1.0 - profile.baseline_gini) + profile.daily_volatility * (rng.f64() - 0.5);
        ScoreSignals::new(growth, stability)
    }
}

/// Base58-looking address; only needs to be stable and unique per rank.
fn mock_address(rng: &mut fastrand::Rng, rank: usize) -> String {
    const ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
    let body: String = (0..36)
        .map(|_| char::from(ALPHABET[rng.usize(..ALPHABET.len())]))
        .collect();
    format!("mock{rank:04}{body}")
}
