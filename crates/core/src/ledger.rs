//! Collateral and debt ledger.
//!
//! The ledger owns all mutable accounting state: per-account collateral
//! balances and minted debt. Every mutation is appended to an undo journal so
//! an aborted operation can be rewound to the checkpoint taken at its start.

use alloy::primitives::{Address, U256};
use smallvec::SmallVec;
use std::collections::HashMap;
use tracing::{debug, error};

use crate::error::{EngineError, Result};

/// Per-account record. Created on first credit or debt increase and never
/// removed; it may return to all-zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    /// Deposited collateral per asset, in first-deposit order
    pub collateral: SmallVec<[(Address, U256); 4]>,
    /// Minted synthetic debt
    pub debt: U256,
}

impl Account {
    /// Deposited amount of `asset`.
    pub fn balance(&self, asset: &Address) -> U256 {
        self.collateral
            .iter()
            .find(|(a, _)| a == asset)
            .map(|(_, amount)| *amount)
            .unwrap_or(U256::ZERO)
    }

    /// Whether the account has no collateral and no debt.
    pub fn is_empty(&self) -> bool {
        self.debt.is_zero() && self.collateral.iter().all(|(_, amount)| amount.is_zero())
    }

    fn balance_mut(&mut self, asset: Address) -> &mut U256 {
        let index = match self.collateral.iter().position(|(a, _)| *a == asset) {
            Some(index) => index,
            None => {
                self.collateral.push((asset, U256::ZERO));
                self.collateral.len() - 1
            }
        };
        &mut self.collateral[index].1
    }
}

/// A single applied ledger mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JournalEntry {
    AccountCreated { account: Address },
    Credited { account: Address, asset: Address, amount: U256 },
    Debited { account: Address, asset: Address, amount: U256 },
    DebtIncreased { account: Address, amount: U256 },
    DebtDecreased { account: Address, amount: U256 },
}

/// Position in the journal to rewind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// In-memory ledger with an undo journal.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: HashMap<Address, Account>,
    journal: Vec<JournalEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` of `asset` to `account`.
    pub fn credit(&mut self, account: Address, asset: Address, amount: U256) -> Result<()> {
        let balance = self.account_mut(account).balance_mut(asset);
        *balance = balance
            .checked_add(amount)
            .ok_or(EngineError::ArithmeticOverflow)?;
        self.journal.push(JournalEntry::Credited { account, asset, amount });
        debug!(%account, %asset, %amount, "Collateral credited");
        Ok(())
    }

    /// Remove `amount` of `asset` from `account`.
    pub fn debit(&mut self, account: Address, asset: Address, amount: U256) -> Result<()> {
        let balance = self.collateral_balance(account, asset);
        if amount > balance {
            return Err(EngineError::InsufficientCollateral {
                account,
                asset,
                balance,
                requested: amount,
            });
        }
        *self.account_mut(account).balance_mut(asset) = balance - amount;
        self.journal.push(JournalEntry::Debited { account, asset, amount });
        debug!(%account, %asset, %amount, "Collateral debited");
        Ok(())
    }

    /// Add `amount` to `account`'s minted debt.
    pub fn increase_debt(&mut self, account: Address, amount: U256) -> Result<()> {
        let record = self.account_mut(account);
        record.debt = record
            .debt
            .checked_add(amount)
            .ok_or(EngineError::ArithmeticOverflow)?;
        self.journal.push(JournalEntry::DebtIncreased { account, amount });
        debug!(%account, %amount, "Debt increased");
        Ok(())
    }

    /// Remove `amount` from `account`'s minted debt.
    pub fn decrease_debt(&mut self, account: Address, amount: U256) -> Result<()> {
        let debt = self.debt(account);
        if amount > debt {
            return Err(EngineError::InsufficientDebt {
                account,
                debt,
                requested: amount,
            });
        }
        self.account_mut(account).debt = debt - amount;
        self.journal.push(JournalEntry::DebtDecreased { account, amount });
        debug!(%account, %amount, "Debt decreased");
        Ok(())
    }

    pub fn collateral_balance(&self, account: Address, asset: Address) -> U256 {
        self.accounts
            .get(&account)
            .map(|record| record.balance(&asset))
            .unwrap_or(U256::ZERO)
    }

    pub fn debt(&self, account: Address) -> U256 {
        self.accounts
            .get(&account)
            .map(|record| record.debt)
            .unwrap_or(U256::ZERO)
    }

    /// Non-zero collateral holdings of `account`.
    pub fn total_collateral(&self, account: Address) -> SmallVec<[(Address, U256); 4]> {
        self.accounts
            .get(&account)
            .map(|record| {
                record
                    .collateral
                    .iter()
                    .filter(|(_, amount)| !amount.is_zero())
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Copy of the account record (all-zero if never touched).
    pub fn snapshot(&self, account: Address) -> Account {
        self.accounts.get(&account).cloned().unwrap_or_default()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.journal.len())
    }

    /// Forget journal entries recorded since `checkpoint`, keeping their effects.
    pub fn commit(&mut self, checkpoint: Checkpoint) {
        self.journal.truncate(checkpoint.0);
    }

    /// Undo every mutation recorded since `checkpoint`, newest first.
    pub fn rollback_to(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.0 {
            let Some(entry) = self.journal.pop() else { break };
            if let Err(e) = self.revert(entry) {
                // Serialized execution means an inverse always fits.
                error!(?entry, error = %e, "Failed to revert ledger entry");
            }
        }
    }

    /// Record for `account`, creating (and journaling) it on first touch.
    fn account_mut(&mut self, account: Address) -> &mut Account {
        if !self.accounts.contains_key(&account) {
            self.journal.push(JournalEntry::AccountCreated { account });
        }
        self.accounts.entry(account).or_default()
    }

    fn revert(&mut self, entry: JournalEntry) -> Result<()> {
        let account = match entry {
            JournalEntry::AccountCreated { account } => {
                self.accounts.remove(&account);
                return Ok(());
            }
            JournalEntry::Credited { account, .. }
            | JournalEntry::Debited { account, .. }
            | JournalEntry::DebtIncreased { account, .. }
            | JournalEntry::DebtDecreased { account, .. } => account,
        };
        // Entries after an `AccountCreated` are undone before it, so the
        // record is still present here.
        let record = self.accounts.entry(account).or_default();

        match entry {
            JournalEntry::AccountCreated { .. } => {}
            JournalEntry::Credited { asset, amount, .. } => {
                let balance = record.balance_mut(asset);
                *balance = balance
                    .checked_sub(amount)
                    .ok_or(EngineError::ArithmeticOverflow)?;
            }
            JournalEntry::Debited { asset, amount, .. } => {
                let balance = record.balance_mut(asset);
                *balance = balance
                    .checked_add(amount)
                    .ok_or(EngineError::ArithmeticOverflow)?;
            }
            JournalEntry::DebtIncreased { amount, .. } => {
                record.debt = record
                    .debt
                    .checked_sub(amount)
                    .ok_or(EngineError::ArithmeticOverflow)?;
            }
            JournalEntry::DebtDecreased { amount, .. } => {
                record.debt = record
                    .debt
                    .checked_add(amount)
                    .ok_or(EngineError::ArithmeticOverflow)?;
            }
        }
        Ok(())
    }
}
