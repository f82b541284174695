//! Atomic execution of a single engine operation.
//!
//! A [`Transaction`] applies ledger effects immediately (journaled against a
//! checkpoint) and queues every external token call as an [`Interaction`].
//! Interactions settle only after all effects and solvency checks passed:
//! pulls first, then pushes. On any failure the settled pulls are
//! compensated and the ledger is rewound, so state after an aborted
//! operation equals state before it.

use alloy::primitives::{Address, U256};
use smallvec::SmallVec;
use std::sync::Arc;
use synthvault_chain::CollateralTransfer;
use tracing::{debug, error};

use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::events::EngineEvent;
use crate::health::HealthFactor;
use crate::ledger::Checkpoint;

/// A queued call into a token collaborator.
#[derive(Debug, Clone)]
pub(crate) enum Interaction {
    /// Pull collateral from `from` into the engine
    CollateralIn {
        token: Arc<dyn CollateralTransfer>,
        from: Address,
        amount: U256,
    },
    /// Pull synthetic from `payer` into the engine and destroy it
    SyntheticBurn { payer: Address, amount: U256 },
    /// Send collateral held by the engine to `to`
    CollateralOut {
        token: Arc<dyn CollateralTransfer>,
        to: Address,
        amount: U256,
    },
    /// Issue fresh synthetic to `to`
    SyntheticMint { to: Address, amount: U256 },
}

impl Interaction {
    /// Pushes move value out of the engine and cannot be compensated.
    fn is_push(&self) -> bool {
        matches!(self, Self::CollateralOut { .. } | Self::SyntheticMint { .. })
    }

    fn execute(&self, engine: &Engine) -> Result<()> {
        let this = engine.address();
        let synthetic = engine.synthetic_issuer();
        match self {
            Self::CollateralIn { token, from, amount } => {
                if !token.transfer_from(this, *from, this, *amount) {
                    return Err(EngineError::TransferFailed);
                }
            }
            Self::SyntheticBurn { payer, amount } => {
                if !synthetic.transfer_from(this, *payer, this, *amount) {
                    return Err(EngineError::TransferFailed);
                }
                if !synthetic.burn(this, *amount) {
                    if !synthetic.transfer(this, *payer, *amount) {
                        error!(%payer, %amount, "Failed to return synthetic after rejected burn");
                    }
                    return Err(EngineError::TransferFailed);
                }
            }
            Self::CollateralOut { token, to, amount } => {
                if !token.transfer(this, *to, *amount) {
                    return Err(EngineError::TransferFailed);
                }
            }
            Self::SyntheticMint { to, amount } => {
                if !synthetic.mint(this, *to, *amount) {
                    return Err(EngineError::MintFailed);
                }
            }
        }
        debug!(interaction = ?self, "Interaction settled");
        Ok(())
    }

    /// Undo a settled pull using the engine's own authority.
    fn compensate(&self, engine: &Engine) {
        let this = engine.address();
        let restored = match self {
            Self::CollateralIn { token, from, amount } => token.transfer(this, *from, *amount),
            Self::SyntheticBurn { payer, amount } => {
                engine.synthetic_issuer().mint(this, *payer, *amount)
            }
            Self::CollateralOut { .. } | Self::SyntheticMint { .. } => false,
        };
        if restored {
            debug!(interaction = ?self, "Interaction compensated");
        } else {
            error!(interaction = ?self, "Failed to compensate settled interaction");
        }
    }
}

/// One in-flight operation.
pub(crate) struct Transaction<'e> {
    engine: &'e Engine,
    checkpoint: Checkpoint,
    pending: Vec<Interaction>,
    settled: Vec<Interaction>,
    events: SmallVec<[EngineEvent; 2]>,
}

impl<'e> Transaction<'e> {
    pub(crate) fn begin(engine: &'e Engine) -> Self {
        let checkpoint = engine.ledger.lock().checkpoint();
        Self {
            engine,
            checkpoint,
            pending: Vec::new(),
            settled: Vec::new(),
            events: SmallVec::new(),
        }
    }

    pub(crate) fn engine(&self) -> &'e Engine {
        self.engine
    }

    pub(crate) fn credit(&mut self, account: Address, asset: Address, amount: U256) -> Result<()> {
        self.engine.ledger.lock().credit(account, asset, amount)
    }

    pub(crate) fn debit(&mut self, account: Address, asset: Address, amount: U256) -> Result<()> {
        self.engine.ledger.lock().debit(account, asset, amount)
    }

    pub(crate) fn increase_debt(&mut self, account: Address, amount: U256) -> Result<()> {
        self.engine.ledger.lock().increase_debt(account, amount)
    }

    pub(crate) fn decrease_debt(&mut self, account: Address, amount: U256) -> Result<()> {
        self.engine.ledger.lock().decrease_debt(account, amount)
    }

    pub(crate) fn debt(&self, account: Address) -> U256 {
        self.engine.ledger.lock().debt(account)
    }

    /// Health factor including the effects applied so far.
    pub(crate) fn health_factor(&self, account: Address) -> Result<HealthFactor> {
        let snapshot = self.engine.ledger.lock().snapshot(account);
        self.engine.health_calculator().health_factor(&snapshot)
    }

    /// Fail with `HealthFactorBroken` unless `account` meets the policy minimum.
    pub(crate) fn require_healthy(&self, account: Address) -> Result<HealthFactor> {
        let health = self.health_factor(account)?;
        if !health.meets(self.engine.policy().min_health_factor()) {
            return Err(EngineError::HealthFactorBroken(health.to_u256()));
        }
        Ok(health)
    }

    pub(crate) fn queue(&mut self, interaction: Interaction) {
        debug_assert!(
            !interaction.is_push() || !self.pending.iter().any(Interaction::is_push),
            "at most one push interaction per operation"
        );
        self.pending.push(interaction);
    }

    pub(crate) fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    /// Run queued interactions, pulls before pushes, stopping at the first failure.
    pub(crate) fn settle(&mut self) -> Result<()> {
        let mut pending = std::mem::take(&mut self.pending);
        pending.sort_by_key(Interaction::is_push);
        for interaction in pending {
            interaction.execute(self.engine)?;
            self.settled.push(interaction);
        }
        Ok(())
    }

    /// Keep every effect and hand back the events to publish.
    pub(crate) fn commit(self) -> SmallVec<[EngineEvent; 2]> {
        self.engine.ledger.lock().commit(self.checkpoint);
        self.events
    }

    /// Compensate settled pulls (newest first) and rewind the ledger.
    pub(crate) fn abort(self) {
        for interaction in self.settled.iter().rev() {
            interaction.compensate(self.engine);
        }
        self.engine.ledger.lock().rollback_to(self.checkpoint);
    }
}
