//! Engine error kinds.

use alloy::primitives::{Address, I256, U256};
use thiserror::Error;

/// Result alias used across the engine.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Failure of an engine operation. Any failure aborts the whole operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("asset {0} is not accepted as collateral")]
    UnsupportedAsset(Address),

    #[error("{tokens} collateral tokens but {feeds} price feeds")]
    LengthMismatch { tokens: usize, feeds: usize },

    #[error("asset {0} registered more than once")]
    DuplicateAsset(Address),

    #[error("collateral token {asset} has {decimals} decimals, expected {expected}")]
    UnsupportedTokenDecimals {
        asset: Address,
        decimals: u8,
        expected: u8,
    },

    #[error("price feed {feed} has {decimals} decimals, expected {expected}")]
    UnsupportedFeedDecimals {
        feed: Address,
        decimals: u8,
        expected: u8,
    },

    #[error("{account} holds {balance} of {asset}, cannot remove {requested}")]
    InsufficientCollateral {
        account: Address,
        asset: Address,
        balance: U256,
        requested: U256,
    },

    #[error("{account} owes {debt}, cannot repay {requested}")]
    InsufficientDebt {
        account: Address,
        debt: U256,
        requested: U256,
    },

    #[error("token transfer failed")]
    TransferFailed,

    #[error("synthetic asset mint failed")]
    MintFailed,

    #[error("health factor {0} is below the minimum")]
    HealthFactorBroken(U256),

    #[error("health factor is not below the minimum")]
    HealthFactorOk,

    #[error("liquidation did not improve the health factor")]
    HealthFactorNotImproved,

    #[error("engine is already executing an operation")]
    ReentrancyBlocked,

    #[error("price feed for {asset} returned unusable answer {price}")]
    InvalidPrice { asset: Address, price: I256 },

    #[error("arithmetic overflow")]
    ArithmeticOverflow,
}

impl EngineError {
    /// Stable variant name, used by scenario expectations and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ZeroAmount => "ZeroAmount",
            Self::UnsupportedAsset(_) => "UnsupportedAsset",
            Self::LengthMismatch { .. } => "LengthMismatch",
            Self::DuplicateAsset(_) => "DuplicateAsset",
            Self::UnsupportedTokenDecimals { .. } => "UnsupportedTokenDecimals",
            Self::UnsupportedFeedDecimals { .. } => "UnsupportedFeedDecimals",
            Self::InsufficientCollateral { .. } => "InsufficientCollateral",
            Self::InsufficientDebt { .. } => "InsufficientDebt",
            Self::TransferFailed => "TransferFailed",
            Self::MintFailed => "MintFailed",
            Self::HealthFactorBroken(_) => "HealthFactorBroken",
            Self::HealthFactorOk => "HealthFactorOk",
            Self::HealthFactorNotImproved => "HealthFactorNotImproved",
            Self::ReentrancyBlocked => "ReentrancyBlocked",
            Self::InvalidPrice { .. } => "InvalidPrice",
            Self::ArithmeticOverflow => "ArithmeticOverflow",
        }
    }
}

/// Reject zero amounts.
pub(crate) fn ensure_nonzero(amount: U256) -> Result<()> {
    if amount.is_zero() {
        return Err(EngineError::ZeroAmount);
    }
    Ok(())
}
