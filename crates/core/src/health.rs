//! Health factor (solvency ratio) calculation.

use alloy::primitives::U256;
use serde::Serialize;
use std::fmt;

use crate::error::{EngineError, Result};
use crate::ledger::Account;
use crate::u256_math;
use crate::value::ValueConverter;

/// Risk-adjusted collateral value over debt, scaled by `PRECISION`.
///
/// `Maximal` stands for an account without debt, where the ratio is
/// undefined. It orders above every `Ratio` and always meets the minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum HealthFactor {
    Ratio(U256),
    Maximal,
}

impl HealthFactor {
    /// Health of a position with `debt` backed by `collateral_value`.
    pub fn calculate(debt: U256, collateral_value: U256) -> Result<Self> {
        if debt.is_zero() {
            return Ok(Self::Maximal);
        }
        u256_math::calculate_hf_wad(collateral_value, debt)
            .map(Self::Ratio)
            .ok_or(EngineError::ArithmeticOverflow)
    }

    /// Whether this health factor satisfies `minimum` (same scale as the ratio).
    pub fn meets(&self, minimum: U256) -> bool {
        match self {
            Self::Ratio(ratio) => *ratio >= minimum,
            Self::Maximal => true,
        }
    }

    pub fn ratio(&self) -> Option<U256> {
        match self {
            Self::Ratio(ratio) => Some(*ratio),
            Self::Maximal => None,
        }
    }

    /// Ratio as a raw integer; `Maximal` maps to `U256::MAX`.
    pub fn to_u256(&self) -> U256 {
        self.ratio().unwrap_or(U256::MAX)
    }
}

impl fmt::Display for HealthFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ratio(ratio) => write!(f, "{:.4}", u256_math::wad_to_f64(*ratio)),
            Self::Maximal => f.write_str("max"),
        }
    }
}

/// Derives health factors from ledger snapshots.
#[derive(Debug, Clone, Copy)]
pub struct HealthFactorCalculator<'a> {
    converter: ValueConverter<'a>,
}

impl<'a> HealthFactorCalculator<'a> {
    pub fn new(converter: ValueConverter<'a>) -> Self {
        Self { converter }
    }

    /// Health of a snapshotted account. Prices are only read when the
    /// account carries debt.
    pub fn health_factor(&self, account: &Account) -> Result<HealthFactor> {
        if account.debt.is_zero() {
            return Ok(HealthFactor::Maximal);
        }
        let collateral_value = self.converter.total_value(account.collateral.iter())?;
        HealthFactor::calculate(account.debt, collateral_value)
    }
}
