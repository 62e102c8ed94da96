//! CLI argument definitions for tokenscope.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `price` | Latest price snapshot for one token |
//! | `prices` | Prices for several tokens (batch first, then per token) |
//! | `history` | Daily price history |
//! | `holders` | Largest holders, paged |
//! | `metrics` | Distribution metrics and decentralization score |
//! | `info` | Token metadata |
//! | `sources` | Configured providers, capabilities and cache stats |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--allow-mocks` | from env | Serve synthetic data when every provider fails |
//! | `--offline` | `false` | Never send provider requests |
//! | `--timeout-ms` | from env | Deadline for each provider call |
//!
//! # Examples
//!
//! ```bash
//! tokenscope price bonk
//! tokenscope holders jup --limit 50 --pretty
//! tokenscope metrics wif --offline --allow-mocks
//! tokenscope prices sol jup bonk
//! ```

use clap::{Args, Parser, Subcommand};

/// Token distribution and market data CLI
///
/// Queries Codex, Birdeye and CoinGecko in priority order and reports every
/// answer with the source that produced it.
#[derive(Debug, Parser)]
#[command(name = "tokenscope", author, version, about = "Token distribution and market data CLI")]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Serve deterministic synthetic data when every provider fails.
    ///
    /// Overrides TOKENSCOPE_ALLOW_MOCKS. Synthetic results are labelled
    /// with source "mock".
    #[arg(long, global = true, default_value_t = false)]
    pub allow_mocks: bool,

    /// Do not send any provider request; answers come from mocks only.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Deadline for each provider call in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the latest price snapshot for a token.
    ///
    /// # Examples
    ///
    ///   tokenscope price bonk
    ///   tokenscope price DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263
    Price(TokenArgs),

    /// Fetch prices for several tokens.
    Prices(PricesArgs),

    /// Fetch daily price history.
    History(HistoryArgs),

    /// Fetch the largest holders of a token.
    Holders(HoldersArgs),

    /// Compute distribution metrics over the largest holders.
    Metrics(TokenArgs),

    /// Fetch token metadata.
    Info(TokenArgs),

    /// List configured providers with capabilities and cache stats.
    Sources,
}

/// Arguments for single-token commands.
#[derive(Debug, Args)]
pub struct TokenArgs {
    /// Catalog slug, symbol or chain address (e.g., bonk, JUP).
    pub token: String,
}

/// Arguments for the `prices` command.
#[derive(Debug, Args)]
pub struct PricesArgs {
    /// One or more tokens.
    #[arg(required = true, num_args = 1..)]
    pub tokens: Vec<String>,
}

/// Arguments for the `history` command.
#[derive(Debug, Args)]
pub struct HistoryArgs {
    pub token: String,

    /// Number of daily points (1-365).
    #[arg(long, default_value_t = 30)]
    pub days: u32,
}

/// Arguments for the `holders` command.
#[derive(Debug, Args)]
pub struct HoldersArgs {
    pub token: String,

    /// Page size (1-1000).
    #[arg(long, default_value_t = 100)]
    pub limit: usize,

    /// Cursor returned by a previous page.
    #[arg(long)]
    pub cursor: Option<String>,
}
