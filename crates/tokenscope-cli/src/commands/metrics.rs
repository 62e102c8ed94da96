use serde_json::Value;
use tokenscope_core::Orchestrator;

use crate::cli::TokenArgs;
use crate::error::CliError;

use super::parse_token;

pub async fn run(args: &TokenArgs, orchestrator: &Orchestrator) -> Result<Value, CliError> {
    let token = parse_token(&args.token)?;
    let result = orchestrator.get_token_metrics(&token).await?;
    Ok(serde_json::to_value(result)?)
}
