//! Collateral token.

use super::{CollateralTransfer, TokenBook, TokenError};
use alloy::primitives::{Address, U256};
use tracing::debug;

/// In-memory ERC20-style collateral token.
#[derive(Debug)]
pub struct Erc20Token {
    address: Address,
    symbol: String,
    decimals: u8,
    book: TokenBook,
}

impl Erc20Token {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
            book: TokenBook::new(),
        }
    }

    /// Faucet mint used to fund accounts during setup.
    pub fn mint(&self, to: Address, amount: U256) -> Result<(), TokenError> {
        self.book.mint(to, amount)
    }

    pub fn approve(&self, owner: Address, spender: Address, amount: U256) {
        self.book.approve(owner, spender, amount);
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.book.allowance(owner, spender)
    }

    pub fn total_supply(&self) -> U256 {
        self.book.total_supply()
    }

    fn report(&self, op: &'static str, result: Result<(), TokenError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                debug!(token = %self.symbol, op, error = %e, "Token call rejected");
                false
            }
        }
    }
}

impl CollateralTransfer for Erc20Token {
    fn address(&self) -> Address {
        self.address
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn transfer_from(&self, spender: Address, from: Address, to: Address, amount: U256) -> bool {
        self.report("transfer_from", self.book.transfer_from(spender, from, to, amount))
    }

    fn transfer(&self, sender: Address, to: Address, amount: U256) -> bool {
        self.report("transfer", self.book.transfer(sender, to, amount))
    }

    fn balance_of(&self, owner: Address) -> U256 {
        self.book.balance_of(owner)
    }
}
