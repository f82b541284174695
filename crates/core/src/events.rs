//! Notifications emitted by committed operations.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Observable effect of a successful operation. Nothing is emitted for an
/// operation that aborts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    CollateralDeposited {
        account: Address,
        asset: Address,
        amount: U256,
    },
    CollateralRedeemed {
        from: Address,
        to: Address,
        asset: Address,
        amount: U256,
    },
    DebtMinted {
        account: Address,
        amount: U256,
    },
    DebtBurned {
        on_behalf_of: Address,
        payer: Address,
        amount: U256,
    },
    Liquidated {
        debtor: Address,
        liquidator: Address,
        collateral_asset: Address,
        debt_covered: U256,
        collateral_seized: U256,
    },
}

impl EngineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CollateralDeposited { .. } => "CollateralDeposited",
            Self::CollateralRedeemed { .. } => "CollateralRedeemed",
            Self::DebtMinted { .. } => "DebtMinted",
            Self::DebtBurned { .. } => "DebtBurned",
            Self::Liquidated { .. } => "Liquidated",
        }
    }
}

/// Fan-out of engine events to any number of subscribers.
///
/// Slow subscribers lag (and skip events) rather than stall the engine.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn publish(&self, event: EngineEvent) {
        let name = event.name();
        // Sending only fails when nobody listens
        if self.sender.send(event).is_err() {
            trace!(event = name, "No event subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
