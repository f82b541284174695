//! Price feed abstraction.
//!
//! The engine only needs one thing from an oracle: the latest answer for the
//! asset it prices. Staleness and manipulation handling live outside the
//! engine.
//!
//! # Example
//!
//! ```rust,ignore
//! use synthvault_chain::oracle::{ManualAggregator, PriceFeed};
//!
//! // $2000.00 with 8 decimals
//! let feed = ManualAggregator::new(feed_address, 8, I256::try_from(2_000_00000000i64)?);
//! assert_eq!(feed.latest_price(), I256::try_from(2_000_00000000i64)?);
//!
//! feed.update_answer(I256::try_from(18_00000000i64)?);
//! ```

mod aggregator;

pub use aggregator::ManualAggregator;

use alloy::primitives::{Address, I256};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Oracle price decimals expected by the engine (Chainlink convention).
pub const PRICE_DECIMALS: u8 = 8;

/// Core trait for price feeds consumed by the engine.
pub trait PriceFeed: Send + Sync + Debug {
    /// Get the feed contract address.
    fn address(&self) -> Address;

    /// Get the price decimals (8 for Chainlink-style feeds).
    fn decimals(&self) -> u8;

    /// Get the latest round data.
    fn latest_round_data(&self) -> RoundData;

    /// Get the latest answer. May be zero or negative; callers validate.
    fn latest_price(&self) -> I256 {
        self.latest_round_data().answer
    }
}

/// Round data from a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundData {
    /// Round ID
    pub round_id: u64,
    /// Price answer (signed, in feed decimals)
    pub answer: I256,
    /// Timestamp when round started
    pub started_at: u64,
    /// Timestamp when answer was computed
    pub updated_at: u64,
    /// Round ID for which answer was computed
    pub answered_in_round: u64,
}
