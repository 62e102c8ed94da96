mod history;
mod holders;
mod info;
mod metrics;
mod price;
mod prices;
mod sources;

use std::time::Duration;

use serde_json::Value;
use tokenscope_core::{CoreConfig, Orchestrator, OrchestratorBuilder, TokenId};
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    let orchestrator = build_orchestrator(cli)?;

    match &cli.command {
        Command::Price(args) => price::run(args, &orchestrator).await,
        Command::Prices(args) => prices::run(args, &orchestrator).await,
        Command::History(args) => history::run(args, &orchestrator).await,
        Command::Holders(args) => holders::run(args, &orchestrator).await,
        Command::Metrics(args) => metrics::run(args, &orchestrator).await,
        Command::Info(args) => info::run(args, &orchestrator).await,
        Command::Sources => sources::run(&orchestrator),
    }
}

/// Command-line flags override the environment.
fn resolve_config(cli: &Cli, base: CoreConfig) -> CoreConfig {
    let allow_mocks = base.allow_mocks || cli.allow_mocks;
    let mut config = base.with_allow_mocks(allow_mocks).with_offline(cli.offline);
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_provider_timeout(Duration::from_millis(timeout_ms.max(1)));
    }
    config
}

fn build_orchestrator(cli: &Cli) -> Result<Orchestrator, CliError> {
    let config = resolve_config(cli, CoreConfig::from_env()?);
    debug!(?config, "resolved configuration");
    Ok(OrchestratorBuilder::from_config(&config)?.build())
}

fn parse_token(raw: &str) -> Result<TokenId, CliError> {
    TokenId::parse(raw).map_err(CliError::from)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn flags_override_environment_settings() {
        let cli = Cli::try_parse_from([
            "tokenscope",
            "price",
            "bonk",
            "--allow-mocks",
            "--offline",
            "--timeout-ms",
            "250",
        ])
        .expect("arguments should parse");

        let config = resolve_config(&cli, CoreConfig::default());

        assert!(config.allow_mocks);
        assert!(config.offline);
        assert_eq!(config.provider_timeout, Duration::from_millis(250));
    }

    #[test]
    fn environment_allow_mocks_survives_without_flag() {
        let cli = Cli::try_parse_from(["tokenscope", "sources"]).expect("arguments should parse");

        let config = resolve_config(&cli, CoreConfig::default().with_allow_mocks(true));

        assert!(config.allow_mocks);
        assert!(!config.offline);
    }

    #[tokio::test]
    async fn offline_metrics_run_without_credentials() {
        let cli = Cli::try_parse_from(["tokenscope", "metrics", "jup", "--offline", "--allow-mocks"])
            .expect("arguments should parse");
        let config = resolve_config(&cli, CoreConfig::default());
        let orchestrator = OrchestratorBuilder::from_config(&config)
            .expect("offline mode needs no key")
            .build();

        let Command::Metrics(args) = &cli.command else {
            panic!("expected metrics command");
        };
        let value = metrics::run(args, &orchestrator).await.expect("mock metrics");

        assert_eq!(value["source"], "mock");
        assert!(value["data"]["gini"].as_f64().is_some());
    }
}
