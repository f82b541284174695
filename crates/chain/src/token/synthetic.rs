//! Synthetic asset token.

use super::{SyntheticAssetIssuer, TokenBook, TokenError};
use alloy::primitives::{Address, U256};
use parking_lot::RwLock;
use tracing::{debug, info};

/// Ownership-gated mintable/burnable token.
///
/// The owner (the engine, once deployed) is the only identity allowed to
/// create or destroy supply, and it can only burn from its own balance.
#[derive(Debug)]
pub struct SyntheticToken {
    address: Address,
    symbol: String,
    owner: RwLock<Address>,
    book: TokenBook,
}

impl SyntheticToken {
    pub fn new(address: Address, symbol: impl Into<String>, owner: Address) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            owner: RwLock::new(owner),
            book: TokenBook::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn owner(&self) -> Address {
        *self.owner.read()
    }

    pub fn transfer_ownership(&self, caller: Address, new_owner: Address) -> Result<(), TokenError> {
        self.only_owner(caller)?;
        if new_owner.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        *self.owner.write() = new_owner;
        info!(token = %self.symbol, owner = %new_owner, "Ownership transferred");
        Ok(())
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

    pub fn try_mint(&self, caller: Address, to: Address, amount: U256) -> Result<(), TokenError> {
        self.only_owner(caller)?;
        if amount.is_zero() {
            return Err(TokenError::ZeroAmount);
        }
        self.book.mint(to, amount)
    }

    pub fn try_burn(&self, caller: Address, amount: U256) -> Result<(), TokenError> {
        self.only_owner(caller)?;
        if amount.is_zero() {
            return Err(TokenError::ZeroAmount);
        }
        self.book.burn(caller, amount)
    }

    fn only_owner(&self, caller: Address) -> Result<(), TokenError> {
        let owner = self.owner();
        if caller != owner {
            return Err(TokenError::NotOwner { caller, owner });
        }
        Ok(())
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

impl SyntheticAssetIssuer for SyntheticToken {
    fn address(&self) -> Address {
        self.address
    }

    fn mint(&self, caller: Address, to: Address, amount: U256) -> bool {
        self.report("mint", self.try_mint(caller, to, amount))
    }

    fn burn(&self, caller: Address, amount: U256) -> bool {
        self.report("burn", self.try_burn(caller, amount))
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
