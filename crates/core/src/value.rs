//! Conversion between asset quantities and reference-currency value.
//!
//! Both directions truncate toward zero. A value computed from an amount and
//! converted back recovers the amount exactly when the division is exact and
//! is otherwise short by at most one unit (for prices of at least 1.0); this
//! slack is inherent to integer fixed-point math.

use alloy::primitives::{Address, U256};

use crate::error::{EngineError, Result};
use crate::registry::CollateralRegistry;
use crate::u256_math;

/// Prices assets through their registered feeds.
#[derive(Debug, Clone, Copy)]
pub struct ValueConverter<'a> {
    registry: &'a CollateralRegistry,
}

impl<'a> ValueConverter<'a> {
    pub fn new(registry: &'a CollateralRegistry) -> Self {
        Self { registry }
    }

    /// Latest unsigned price of `asset` (8 decimals).
    pub fn price(&self, asset: Address) -> Result<U256> {
        let answer = self.registry.get(&asset)?.feed.latest_price();
        u256_math::price_from_answer(answer).ok_or(EngineError::InvalidPrice {
            asset,
            price: answer,
        })
    }

    /// `price(asset) * ADDITIONAL_FEED_PRECISION * amount / PRECISION`
    pub fn value_of(&self, asset: Address, amount: U256) -> Result<U256> {
        let price = self.price(asset)?;
        u256_math::value_wad(price, amount).ok_or(EngineError::ArithmeticOverflow)
    }

    /// `value * PRECISION / (price(asset) * ADDITIONAL_FEED_PRECISION)`
    pub fn quantity_for(&self, asset: Address, value: U256) -> Result<U256> {
        let answer = self.registry.get(&asset)?.feed.latest_price();
        let price = u256_math::price_from_answer(answer)
            .filter(|price| !price.is_zero())
            .ok_or(EngineError::InvalidPrice {
                asset,
                price: answer,
            })?;
        u256_math::quantity_wad(price, value).ok_or(EngineError::ArithmeticOverflow)
    }

    /// Total value of a set of holdings. Only held assets consult their feed.
    pub fn total_value<'h>(
        &self,
        holdings: impl IntoIterator<Item = &'h (Address, U256)>,
    ) -> Result<U256> {
        holdings
            .into_iter()
            .filter(|(_, amount)| !amount.is_zero())
            .try_fold(U256::ZERO, |total, (asset, amount)| {
                let value = self.value_of(*asset, *amount)?;
                total
                    .checked_add(value)
                    .ok_or(EngineError::ArithmeticOverflow)
            })
    }
}
