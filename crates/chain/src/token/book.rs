//! Balance and allowance bookkeeping shared by the in-memory tokens.

use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

/// Token-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("insufficient balance: {owner} holds {balance}, needs {needed}")]
    InsufficientBalance {
        owner: Address,
        balance: U256,
        needed: U256,
    },
    #[error("insufficient allowance: {spender} may spend {allowance} of {owner}, needs {needed}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        allowance: U256,
        needed: U256,
    },
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("zero address not allowed")]
    ZeroAddress,
    #[error("caller {caller} is not the owner {owner}")]
    NotOwner { caller: Address, owner: Address },
    #[error("supply overflow")]
    Overflow,
}

#[derive(Debug, Default)]
struct Balances {
    accounts: HashMap<Address, U256>,
    total_supply: U256,
}

/// Balances plus allowances.
///
/// Balance moves happen under a single lock so a transfer is never observed
/// half-applied. Allowances are independent entries.
#[derive(Debug, Default)]
pub struct TokenBook {
    balances: Mutex<Balances>,
    /// (owner, spender) -> remaining allowance
    allowances: DashMap<(Address, Address), U256>,
}

impl TokenBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, owner: Address) -> U256 {
        self.balances
            .lock()
            .accounts
            .get(&owner)
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn total_supply(&self) -> U256 {
        self.balances.lock().total_supply
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(owner, spender))
            .map(|a| *a)
            .unwrap_or(U256::ZERO)
    }

    pub fn approve(&self, owner: Address, spender: Address, amount: U256) {
        self.allowances.insert((owner, spender), amount);
    }

    pub fn transfer(&self, from: Address, to: Address, amount: U256) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let mut balances = self.balances.lock();
        Self::move_balance(&mut balances, from, to, amount)
    }

    /// Spend `spender`'s allowance over `from` and move the funds.
    ///
    /// An owner moving its own funds needs no allowance; an allowance of
    /// `U256::MAX` is never decremented.
    pub fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let mut balances = self.balances.lock();

        if spender != from {
            let allowance = self.allowance(from, spender);
            if allowance < amount {
                return Err(TokenError::InsufficientAllowance {
                    owner: from,
                    spender,
                    allowance,
                    needed: amount,
                });
            }
            Self::ensure_balance(&balances, from, amount)?;
            if allowance != U256::MAX {
                self.allowances.insert((from, spender), allowance - amount);
            }
        }

        Self::move_balance(&mut balances, from, to, amount)
    }

    pub fn mint(&self, to: Address, amount: U256) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let mut balances = self.balances.lock();
        let supply = balances
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        balances.total_supply = supply;
        *balances.accounts.entry(to).or_default() += amount;
        Ok(())
    }

    pub fn burn(&self, from: Address, amount: U256) -> Result<(), TokenError> {
        let mut balances = self.balances.lock();
        Self::ensure_balance(&balances, from, amount)?;
        if let Some(balance) = balances.accounts.get_mut(&from) {
            *balance -= amount;
        }
        balances.total_supply -= amount;
        Ok(())
    }

    fn ensure_balance(balances: &Balances, owner: Address, needed: U256) -> Result<(), TokenError> {
        let balance = balances.accounts.get(&owner).copied().unwrap_or(U256::ZERO);
        if balance < needed {
            return Err(TokenError::InsufficientBalance {
                owner,
                balance,
                needed,
            });
        }
        Ok(())
    }

    fn move_balance(
        balances: &mut Balances,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        Self::ensure_balance(balances, from, amount)?;
        if let Some(balance) = balances.accounts.get_mut(&from) {
            *balance -= amount;
        }
        // Supply is bounded by total_supply, so the credit cannot overflow.
        *balances.accounts.entry(to).or_default() += amount;
        Ok(())
    }
}
