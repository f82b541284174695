//! Collateral-backed synthetic asset engine.
//!
//! This crate provides the accounting core:
//! - Collateral/debt ledger with an undo journal
//! - Oracle-priced value conversion and health factor calculation
//! - Position operations (deposit, mint, redeem, burn and composites)
//! - Liquidation of undercollateralized accounts with a bonus
//! - Serialized, all-or-nothing execution with re-entrancy rejection
//!
//! Token and oracle collaborators come from `synthvault-chain`.

pub mod config;
mod engine;
mod error;
mod events;
mod guard;
mod health;
mod ledger;
mod liquidation;
mod operations;
mod registry;
mod transaction;
pub mod u256_math;
mod value;

#[cfg(test)]
mod testing;

pub use config::{
    load_deployment, load_deployment_from_env, DeploymentConfig, EngineConfig, MintCheck,
    ResolvedDeployment, SolvencyPolicy,
};
pub use engine::{AccountSummary, Engine};
pub use error::{EngineError, Result};
pub use events::{EngineEvent, EventBus, DEFAULT_EVENT_CAPACITY};
pub use guard::ReentrancyGuard;
pub use health::{HealthFactor, HealthFactorCalculator};
pub use ledger::{Account, Checkpoint, Ledger};
pub use liquidation::LiquidationOutcome;
pub use registry::{CollateralAsset, CollateralRegistry};
pub use value::ValueConverter;
