//! # Domain Models
//!
//! Canonical domain types for tokenscope.
//!
//! ## Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TokenId`] | Validated token slug or chain address |
//! | [`Asset`] / [`AssetCatalog`] | Static asset registry with distribution category |
//! | [`PriceSnapshot`] | Latest price, 24h change, volume, market cap, liquidity |
//! | [`PricePoint`] | One point of a daily price series |
//! | [`HolderBalance`] / [`HolderPage`] | Holder snapshot, largest first |
//! | [`TokenInfo`] | Slow-changing token metadata |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! ## Validation
//!
//! Constructors enforce numeric invariants (finite, non-negative, percent in
//! `[0, 100]`, page percent sum `<= 100`) and return [`crate::ValidationError`].

mod catalog;
mod models;
mod timestamp;
mod token;

pub use catalog::{Asset, AssetCatalog, AssetCategory, SOLANA_NETWORK_ID};
pub use models::{
    HolderBalance, HolderPage, PricePoint, PriceSnapshot, TokenInfo, PERCENT_SUM_TOLERANCE,
};
pub use timestamp::UtcDateTime;
pub use token::TokenId;
