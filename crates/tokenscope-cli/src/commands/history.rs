use serde_json::Value;
use tokenscope_core::Orchestrator;

use crate::cli::HistoryArgs;
use crate::error::CliError;

use super::parse_token;

pub async fn run(args: &HistoryArgs, orchestrator: &Orchestrator) -> Result<Value, CliError> {
    let token = parse_token(&args.token)?;
    let result = orchestrator.get_price_history(&token, args.days).await?;
    Ok(serde_json::to_value(result)?)
}
