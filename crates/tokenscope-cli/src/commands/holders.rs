use serde_json::Value;
use tokenscope_core::Orchestrator;

use crate::cli::HoldersArgs;
use crate::error::CliError;

use super::parse_token;

pub async fn run(args: &HoldersArgs, orchestrator: &Orchestrator) -> Result<Value, CliError> {
    let token = parse_token(&args.token)?;
    let result = orchestrator
        .get_token_holders(&token, args.limit, args.cursor.clone())
        .await?;
    Ok(serde_json::to_value(result)?)
}
