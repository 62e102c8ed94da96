use serde::Serialize;
use serde_json::Value;
use tokenscope_core::{BatchPrices, Orchestrator, PriceSnapshot, ProviderResult, TokenId};

use crate::cli::PricesArgs;
use crate::error::CliError;

use super::parse_token;

#[derive(Debug, Serialize)]
struct PricesResponseData {
    prices: Vec<ProviderResult<PriceSnapshot>>,
    failed: Vec<UnpricedToken>,
    /// Tokens answered with synthetic data.
    mock_count: usize,
}

#[derive(Debug, Serialize)]
struct UnpricedToken {
    token: TokenId,
    code: &'static str,
    message: String,
}

pub async fn run(args: &PricesArgs, orchestrator: &Orchestrator) -> Result<Value, CliError> {
    let tokens = args
        .tokens
        .iter()
        .map(|raw| parse_token(raw))
        .collect::<Result<Vec<TokenId>, _>>()?;

    let BatchPrices { prices, mut failed } = orchestrator.get_batch_prices(&tokens).await?;

    // Nothing priced: exit with the first token's error code.
    if prices.is_empty() {
        if let Some((_, error)) = failed.pop_first() {
            return Err(error.into());
        }
    }

    let prices: Vec<_> = prices.into_values().collect();
    let mock_count = prices.iter().filter(|result| result.source.is_mock()).count();
    let failed = failed
        .into_iter()
        .map(|(token, error)| UnpricedToken {
            token,
            code: error.code(),
            message: error.to_string(),
        })
        .collect();

    Ok(serde_json::to_value(PricesResponseData {
        prices,
        failed,
        mock_count,
    })?)
}
