//! Token seams consumed by the engine and their in-memory implementations.
//!
//! Calls take the acting identity explicitly (`caller`, `spender`, `sender`)
//! since the engine runs in-process and has no ambient transaction sender.
//! Every seam call reports success as a plain `bool`; the typed
//! [`TokenError`] stays inside the token implementations and their logs.

mod book;
mod erc20;
mod synthetic;

pub use book::{TokenBook, TokenError};
pub use erc20::Erc20Token;
pub use synthetic::SyntheticToken;

use alloy::primitives::{Address, U256};
use std::fmt::Debug;

/// Collateral token decimals expected by the engine.
pub const COLLATERAL_DECIMALS: u8 = 18;

/// Collateral asset transfers.
pub trait CollateralTransfer: Send + Sync + Debug {
    /// Token address (the asset identifier in the engine).
    fn address(&self) -> Address;

    /// Token symbol for logging.
    fn symbol(&self) -> &str;

    /// Token decimals.
    fn decimals(&self) -> u8;

    /// Move `amount` from `from` to `to` using `spender`'s allowance.
    fn transfer_from(&self, spender: Address, from: Address, to: Address, amount: U256) -> bool;

    /// Move `amount` from `sender`'s own balance to `to`.
    fn transfer(&self, sender: Address, to: Address, amount: U256) -> bool;

    /// Current balance of `owner`.
    fn balance_of(&self, owner: Address) -> U256;
}

/// Ownership-gated issuer of the synthetic asset.
pub trait SyntheticAssetIssuer: Send + Sync + Debug {
    /// Token address.
    fn address(&self) -> Address;

    /// Mint `amount` to `to`. Only the owner may mint.
    fn mint(&self, caller: Address, to: Address, amount: U256) -> bool;

    /// Destroy `amount` from `caller`'s own balance. Only the owner may burn.
    fn burn(&self, caller: Address, amount: U256) -> bool;

    /// Move `amount` from `from` to `to` using `spender`'s allowance.
    fn transfer_from(&self, spender: Address, from: Address, to: Address, amount: U256) -> bool;

    /// Move `amount` from `sender`'s own balance to `to`.
    fn transfer(&self, sender: Address, to: Address, amount: U256) -> bool;

    /// Current balance of `owner`.
    fn balance_of(&self, owner: Address) -> U256;
}
