use serde::{Deserialize, Serialize};

use crate::{TokenId, UtcDateTime, ValidationError};

/// Tolerance applied to the per-snapshot percent-of-supply sum.
pub const PERCENT_SUM_TOLERANCE: f64 = 1e-6;

/// Latest market snapshot for a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub token: TokenId,
    pub price: f64,
    pub change_24h: Option<f64>,
    pub volume_24h: Option<f64>,
    pub market_cap: Option<f64>,
    /// Pool liquidity / TVL in USD, only reported by some providers.
    pub liquidity_usd: Option<f64>,
}

impl PriceSnapshot {
    pub fn new(
        token: TokenId,
        price: f64,
        change_24h: Option<f64>,
        volume_24h: Option<f64>,
        market_cap: Option<f64>,
        liquidity_usd: Option<f64>,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("price", price)?;
        validate_optional_finite("change_24h", change_24h)?;
        validate_optional_non_negative("volume_24h", volume_24h)?;
        validate_optional_non_negative("market_cap", market_cap)?;
        validate_optional_non_negative("liquidity_usd", liquidity_usd)?;

        Ok(Self {
            token,
            price,
            change_24h,
            volume_24h,
            market_cap,
            liquidity_usd,
        })
    }
}

/// One point of a daily price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub ts: UtcDateTime,
    pub price: f64,
    pub volume: Option<f64>,
}

impl PricePoint {
    pub fn new(ts: UtcDateTime, price: f64, volume: Option<f64>) -> Result<Self, ValidationError> {
        validate_non_negative("price", price)?;
        validate_optional_non_negative("volume", volume)?;
        Ok(Self { ts, price, volume })
    }
}

/// Balance of one holder within a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderBalance {
    pub address: String,
    pub balance: f64,
    pub percent_of_supply: f64,
}

impl HolderBalance {
    pub fn new(
        address: impl Into<String>,
        balance: f64,
        percent_of_supply: f64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("balance", balance)?;
        validate_range("percent_of_supply", percent_of_supply, 0.0, 100.0)?;

        Ok(Self {
            address: address.into(),
            balance,
            percent_of_supply,
        })
    }
}

/// One page of holders, largest first, as returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderPage {
    pub token: TokenId,
    /// Total holder count reported by the provider, not the page length.
    pub count: u64,
    pub holders: Vec<HolderBalance>,
    pub cursor: Option<String>,
}

impl HolderPage {
    /// Builds a page and enforces that the snapshot never claims more than
    /// the whole supply.
    pub fn new(
        token: TokenId,
        count: u64,
        holders: Vec<HolderBalance>,
        cursor: Option<String>,
    ) -> Result<Self, ValidationError> {
        let percent_sum: f64 = holders.iter().map(|h| h.percent_of_supply).sum();
        if percent_sum > 100.0 + PERCENT_SUM_TOLERANCE {
            return Err(ValidationError::OutOfRange {
                field: "percent_of_supply_sum",
                min: 0.0,
                max: 100.0,
            });
        }

        Ok(Self {
            token,
            count: count.max(holders.len() as u64),
            holders,
            cursor,
        })
    }

    pub fn balances(&self) -> Vec<f64> {
        self.holders.iter().map(|h| h.balance).collect()
    }

    pub fn percent_sum(&self) -> f64 {
        self.holders.iter().map(|h| h.percent_of_supply).sum()
    }
}

/// Slow-changing token metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub token: TokenId,
    pub name: String,
    pub symbol: String,
    pub address: Option<String>,
    pub network: Option<String>,
    pub decimals: Option<u8>,
    pub total_supply: Option<f64>,
    pub circulating_supply: Option<f64>,
}

impl TokenInfo {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        token: TokenId,
        name: impl Into<String>,
        symbol: impl Into<String>,
        address: Option<String>,
        network: Option<String>,
        decimals: Option<u8>,
        total_supply: Option<f64>,
        circulating_supply: Option<f64>,
    ) -> Result<Self, ValidationError> {
        validate_optional_non_negative("total_supply", total_supply)?;
        validate_optional_non_negative("circulating_supply", circulating_supply)?;

        Ok(Self {
            token,
            name: name.into(),
            symbol: symbol.into(),
            address,
            network,
            decimals,
            total_supply,
            circulating_supply,
        })
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

fn validate_optional_non_negative(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        validate_non_negative(field, value)?;
    }
    Ok(())
}

fn validate_optional_finite(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteValue { field });
        }
    }
    Ok(())
}

fn validate_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange { field, min, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> TokenId {
        TokenId::parse("bonk").expect("valid token")
    }

    #[test]
    fn rejects_negative_price() {
        let err = PriceSnapshot::new(token(), -1.0, None, None, None, None).expect_err("must fail");
        assert_eq!(err, ValidationError::NegativeValue { field: "price" });
    }

    #[test]
    fn rejects_percent_above_hundred() {
        let err = HolderBalance::new("addr", 10.0, 100.5).expect_err("must fail");
        assert!(matches!(
            err,
            ValidationError::OutOfRange {
                field: "percent_of_supply",
                ..
            }
        ));
    }

    #[test]
    fn holder_page_rejects_oversubscribed_supply() {
        let holders = vec![
            HolderBalance::new("a", 60.0, 60.0).expect("valid"),
            HolderBalance::new("b", 50.0, 50.0).expect("valid"),
        ];
        let err = HolderPage::new(token(), 2, holders, None).expect_err("must fail");
        assert!(matches!(
            err,
            ValidationError::OutOfRange {
                field: "percent_of_supply_sum",
                ..
            }
        ));
    }

    #[test]
    fn holder_page_count_is_at_least_page_length() {
        let holders = vec![
            HolderBalance::new("a", 6.0, 6.0).expect("valid"),
            HolderBalance::new("b", 5.0, 5.0).expect("valid"),
        ];
        let page = HolderPage::new(token(), 0, holders, None).expect("valid page");
        assert_eq!(page.count, 2);
        assert_eq!(page.balances(), vec![6.0, 5.0]);
    }
}
