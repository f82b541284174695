//! Liquidation of undercollateralized accounts.
//!
//! A caller repays part of an unhealthy debtor's debt with its own synthetic
//! and receives the equivalent collateral plus a 10% bonus. The whole
//! sequence is one transaction.

use alloy::primitives::{Address, U256};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::engine::Engine;
use crate::error::{ensure_nonzero, EngineError, Result};
use crate::events::EngineEvent;
use crate::health::HealthFactor;
use crate::operations::{burn, redeem};
use crate::u256_math::{self, LIQUIDATION_BONUS};

/// Result of a successful liquidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LiquidationOutcome {
    /// Debt repaid on the debtor's behalf
    pub debt_covered: U256,
    /// Collateral equivalent of the covered debt
    pub base_seized: U256,
    /// Bonus collateral on top of the base
    pub bonus: U256,
    /// Collateral moved from debtor to caller
    pub total_seized: U256,
    pub starting_health_factor: HealthFactor,
    pub ending_health_factor: HealthFactor,
}

impl Engine {
    /// Repay `debt_to_cover` of `debtor`'s debt from `caller`'s synthetic
    /// balance and seize `collateral_asset` worth the repaid amount plus the
    /// liquidation bonus.
    ///
    /// Only unhealthy debtors can be liquidated, the debtor's health factor
    /// must strictly improve, and the caller must remain healthy itself.
    #[instrument(skip(self), fields(debtor = %debtor, caller = %caller, asset = %collateral_asset, debt_to_cover = %debt_to_cover))]
    pub fn liquidate(
        &self,
        collateral_asset: Address,
        debtor: Address,
        debt_to_cover: U256,
        caller: Address,
    ) -> Result<LiquidationOutcome> {
        self.transact("liquidate", |tx| {
            ensure_nonzero(debt_to_cover)?;

            let starting = tx.health_factor(debtor)?;
            if starting.meets(self.min_health_factor()) {
                return Err(EngineError::HealthFactorOk);
            }

            let base_seized = self.quantity_for(collateral_asset, debt_to_cover)?;
            let bonus = u256_math::percent_of(base_seized, LIQUIDATION_BONUS)
                .ok_or(EngineError::ArithmeticOverflow)?;
            let total_seized = base_seized
                .checked_add(bonus)
                .ok_or(EngineError::ArithmeticOverflow)?;
            debug!(%base_seized, %bonus, %total_seized, "Seizure computed");

            redeem(tx, collateral_asset, total_seized, debtor, caller)?;
            burn(tx, debt_to_cover, debtor, caller)?;

            let ending = tx.health_factor(debtor)?;
            if ending <= starting {
                return Err(EngineError::HealthFactorNotImproved);
            }
            tx.require_healthy(caller)?;

            tx.emit(EngineEvent::Liquidated {
                debtor,
                liquidator: caller,
                collateral_asset,
                debt_covered: debt_to_cover,
                collateral_seized: total_seized,
            });

            Ok(LiquidationOutcome {
                debt_covered: debt_to_cover,
                base_seized,
                bonus,
                total_seized,
                starting_health_factor: starting,
                ending_health_factor: ending,
            })
        })
    }
}
