//! Manually driven aggregator.

use super::{PriceFeed, RoundData};
use alloy::primitives::{Address, I256};
use parking_lot::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// In-memory aggregator whose answer is pushed by its operator.
///
/// Every update opens a new round, mirroring how Chainlink aggregators
/// report `latestRoundData`.
pub struct ManualAggregator {
    /// Aggregator address
    address: Address,
    /// Price decimals
    decimals: u8,
    /// Latest round
    round: RwLock<RoundData>,
}

impl std::fmt::Debug for ManualAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let round = self.round.read();
        f.debug_struct("ManualAggregator")
            .field("address", &self.address)
            .field("decimals", &self.decimals)
            .field("round_id", &round.round_id)
            .field("answer", &round.answer)
            .finish()
    }
}

impl ManualAggregator {
    /// Create an aggregator with an initial answer (round 1).
    pub fn new(address: Address, decimals: u8, initial_answer: I256) -> Self {
        let now = now_secs();
        Self {
            address,
            decimals,
            round: RwLock::new(RoundData {
                round_id: 1,
                answer: initial_answer,
                started_at: now,
                updated_at: now,
                answered_in_round: 1,
            }),
        }
    }

    /// Push a new answer, opening the next round.
    pub fn update_answer(&self, answer: I256) {
        let now = now_secs();
        let mut round = self.round.write();
        round.round_id += 1;
        round.answer = answer;
        round.started_at = now;
        round.updated_at = now;
        round.answered_in_round = round.round_id;

        debug!(
            aggregator = %self.address,
            round_id = round.round_id,
            answer = %answer,
            "Aggregator answer updated"
        );
    }
}

impl PriceFeed for ManualAggregator {
    fn address(&self) -> Address {
        self.address
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn latest_round_data(&self) -> RoundData {
        *self.round.read()
    }
}
