//! Collaborator layer for the synthvault engine.
//!
//! This crate provides:
//! - The price feed seam ([`PriceFeed`]) and an in-memory round-based aggregator
//! - The collateral transfer seam ([`CollateralTransfer`]) and an ERC20-style token
//! - The synthetic asset seam ([`SyntheticAssetIssuer`]) and an ownership-gated token
//!
//! The engine depends only on the traits; the concrete types back tests and
//! the scenario runner.

pub mod oracle;
pub mod token;

pub use oracle::{ManualAggregator, PriceFeed, RoundData, PRICE_DECIMALS};
pub use token::{
    CollateralTransfer, Erc20Token, SyntheticAssetIssuer, SyntheticToken, TokenBook, TokenError,
    COLLATERAL_DECIMALS,
};
