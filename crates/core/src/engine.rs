//! The collateral engine: registry, ledger, policy and the read surface.
//!
//! Mutating operations live in `operations` and `liquidation`; each runs
//! through [`Engine::transact`], which serializes it behind the re-entrancy
//! guard and commits or aborts it as a whole.

use alloy::primitives::{Address, U256};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use synthvault_chain::{CollateralTransfer, PriceFeed, SyntheticAssetIssuer};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, SolvencyPolicy};
use crate::error::Result;
use crate::events::{EngineEvent, EventBus};
use crate::guard::ReentrancyGuard;
use crate::health::{HealthFactor, HealthFactorCalculator};
use crate::ledger::Ledger;
use crate::registry::CollateralRegistry;
use crate::transaction::Transaction;
use crate::u256_math;
use crate::value::ValueConverter;

/// Debt and collateral value of one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub minted_debt: U256,
    pub collateral_value: U256,
}

pub struct Engine {
    /// Identity the engine uses toward token collaborators
    address: Address,
    registry: CollateralRegistry,
    synthetic: Arc<dyn SyntheticAssetIssuer>,
    policy: SolvencyPolicy,
    pub(crate) ledger: Mutex<Ledger>,
    guard: ReentrancyGuard,
    events: EventBus,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("address", &self.address)
            .field("collateral_assets", &self.registry.assets())
            .field("synthetic", &self.synthetic.address())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Build an engine accepting `collateral[i]` priced by `feeds[i]`.
    pub fn new(
        address: Address,
        collateral: Vec<Arc<dyn CollateralTransfer>>,
        feeds: Vec<Arc<dyn PriceFeed>>,
        synthetic: Arc<dyn SyntheticAssetIssuer>,
    ) -> Result<Self> {
        let registry = CollateralRegistry::new(collateral, feeds)?;
        info!(
            engine = %address,
            synthetic = %synthetic.address(),
            assets = registry.len(),
            "Engine created"
        );
        Ok(Self {
            address,
            registry,
            synthetic,
            policy: SolvencyPolicy::default(),
            ledger: Mutex::new(Ledger::new()),
            guard: ReentrancyGuard::new(),
            events: EventBus::default(),
        })
    }

    pub fn with_policy(mut self, policy: SolvencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.events = EventBus::new(capacity);
        self
    }

    /// Apply policy and event settings from a loaded configuration.
    pub fn with_config(self, config: &EngineConfig) -> Self {
        self.with_policy(config.solvency)
            .with_event_capacity(config.events.channel_capacity)
    }

    /// Receive events of operations committed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Run `body` as one serialized, all-or-nothing operation.
    pub(crate) fn transact<T>(
        &self,
        operation: &'static str,
        body: impl FnOnce(&mut Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let _entered = self.guard.enter()?;
        let mut tx = Transaction::begin(self);
        match body(&mut tx).and_then(|value| tx.settle().map(|()| value)) {
            Ok(value) => {
                let events = tx.commit();
                debug!(operation, events = events.len(), "Operation committed");
                for event in events {
                    info!(event = event.name(), ?event, "Engine event");
                    self.events.publish(event);
                }
                Ok(value)
            }
            Err(e) => {
                tx.abort();
                warn!(operation, error = %e, "Operation aborted");
                Err(e)
            }
        }
    }

    pub(crate) fn registry(&self) -> &CollateralRegistry {
        &self.registry
    }

    pub(crate) fn synthetic_issuer(&self) -> &dyn SyntheticAssetIssuer {
        self.synthetic.as_ref()
    }

    pub(crate) fn converter(&self) -> ValueConverter<'_> {
        ValueConverter::new(&self.registry)
    }

    pub(crate) fn health_calculator(&self) -> HealthFactorCalculator<'_> {
        HealthFactorCalculator::new(self.converter())
    }

    // ==================== Read surface ====================

    /// Reference-currency value of `amount` of `asset`.
    pub fn value_of(&self, asset: Address, amount: U256) -> Result<U256> {
        self.converter().value_of(asset, amount)
    }

    /// Quantity of `asset` worth `value`.
    pub fn quantity_for(&self, asset: Address, value: U256) -> Result<U256> {
        self.converter().quantity_for(asset, value)
    }

    /// Total value of everything `account` has deposited.
    pub fn total_collateral_value(&self, account: Address) -> Result<U256> {
        let holdings = self.total_collateral(account);
        self.converter().total_value(holdings.iter())
    }

    pub fn minted_debt(&self, account: Address) -> U256 {
        let _held = self.guard.hold();
        self.ledger.lock().debt(account)
    }

    pub fn account_summary(&self, account: Address) -> Result<AccountSummary> {
        let _held = self.guard.hold();
        let snapshot = self.ledger.lock().snapshot(account);
        Ok(AccountSummary {
            minted_debt: snapshot.debt,
            collateral_value: self.converter().total_value(snapshot.collateral.iter())?,
        })
    }

    pub fn collateral_balance(&self, account: Address, asset: Address) -> U256 {
        let _held = self.guard.hold();
        self.ledger.lock().collateral_balance(account, asset)
    }

    /// Non-zero holdings of `account` in registration order.
    pub fn total_collateral(&self, account: Address) -> Vec<(Address, U256)> {
        let _held = self.guard.hold();
        let snapshot = self.ledger.lock().snapshot(account);
        self.registry
            .assets()
            .iter()
            .map(|asset| (*asset, snapshot.balance(asset)))
            .filter(|(_, amount)| !amount.is_zero())
            .collect()
    }

    pub fn health_factor(&self, account: Address) -> Result<HealthFactor> {
        let _held = self.guard.hold();
        let snapshot = self.ledger.lock().snapshot(account);
        self.health_calculator().health_factor(&snapshot)
    }

    /// Preview the health factor of a hypothetical position.
    pub fn calculate_health_factor(&self, debt: U256, collateral_value: U256) -> Result<HealthFactor> {
        HealthFactor::calculate(debt, collateral_value)
    }

    pub fn collateral_assets(&self) -> &[Address] {
        self.registry.assets()
    }

    /// Address of the feed pricing `asset`.
    pub fn price_feed(&self, asset: Address) -> Result<Address> {
        Ok(self.registry.get(&asset)?.feed.address())
    }

    pub fn synthetic(&self) -> Address {
        self.synthetic.address()
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn policy(&self) -> &SolvencyPolicy {
        &self.policy
    }

    /// Number of accounts the ledger has ever touched.
    pub fn account_count(&self) -> usize {
        let _held = self.guard.hold();
        self.ledger.lock().account_count()
    }

    pub fn precision(&self) -> U256 {
        u256_math::PRECISION
    }

    pub fn additional_feed_precision(&self) -> U256 {
        u256_math::ADDITIONAL_FEED_PRECISION
    }

    pub fn liquidation_threshold(&self) -> U256 {
        u256_math::LIQUIDATION_THRESHOLD
    }

    pub fn liquidation_bonus(&self) -> U256 {
        u256_math::LIQUIDATION_BONUS
    }

    pub fn liquidation_precision(&self) -> U256 {
        u256_math::LIQUIDATION_PRECISION
    }

    pub fn min_health_factor(&self) -> U256 {
        self.policy.min_health_factor()
    }
}
