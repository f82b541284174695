//! Checked U256 fixed-point arithmetic for collateral accounting.
//!
//! Every helper returns `None` on overflow (or division by zero) so callers
//! can abort the surrounding operation instead of wrapping silently.

use alloy::primitives::{I256, U256};

/// WAD constant: 1e18 for 18-decimal fixed-point arithmetic
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);

/// Fixed-point scale used for values and health factor ratios.
pub const PRECISION: U256 = WAD;

/// Upscales an 8-decimal oracle answer to 18 decimals (1e10).
pub const ADDITIONAL_FEED_PRECISION: U256 = U256::from_limbs([10_000_000_000u64, 0, 0, 0]);

/// Share of collateral value counted toward solvency (50%).
pub const LIQUIDATION_THRESHOLD: U256 = U256::from_limbs([50u64, 0, 0, 0]);

/// Extra collateral awarded to liquidators (10%).
pub const LIQUIDATION_BONUS: U256 = U256::from_limbs([10u64, 0, 0, 0]);

/// Denominator for threshold and bonus percentages.
pub const LIQUIDATION_PRECISION: U256 = U256::from_limbs([100u64, 0, 0, 0]);

/// Minimum health factor in the ratio's own scale (1.0).
pub const MIN_HEALTH_FACTOR: U256 = WAD;

/// Unscaled minimum health factor (a raw `1`).
pub const LEGACY_MIN_HEALTH_FACTOR: U256 = U256::from_limbs([1u64, 0, 0, 0]);

/// Compute `a * b / denominator`, truncating toward zero.
#[inline(always)]
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Option<U256> {
    if denominator.is_zero() {
        return None;
    }
    a.checked_mul(b).map(|product| product / denominator)
}

/// Apply a percentage expressed over [`LIQUIDATION_PRECISION`].
///
/// Example: percent_of(1000, 10) = 100
#[inline(always)]
pub fn percent_of(value: U256, percent: U256) -> Option<U256> {
    mul_div(value, percent, LIQUIDATION_PRECISION)
}

/// Convert a signed oracle answer to an unsigned price.
/// Returns `None` for negative answers.
#[inline(always)]
pub fn price_from_answer(answer: I256) -> Option<U256> {
    if answer.is_negative() {
        None
    } else {
        // Non-negative two's complement values share their unsigned bit pattern.
        Some(answer.into_raw())
    }
}

/// Reference-currency value of `amount` at `price` (8 decimals):
/// `price * ADDITIONAL_FEED_PRECISION * amount / PRECISION`.
#[inline(always)]
pub fn value_wad(price: U256, amount: U256) -> Option<U256> {
    let scaled_price = price.checked_mul(ADDITIONAL_FEED_PRECISION)?;
    mul_div(scaled_price, amount, PRECISION)
}

/// Asset quantity worth `value` at `price` (8 decimals):
/// `value * PRECISION / (price * ADDITIONAL_FEED_PRECISION)`.
/// Returns `None` for a zero price.
#[inline(always)]
pub fn quantity_wad(price: U256, value: U256) -> Option<U256> {
    let scaled_price = price.checked_mul(ADDITIONAL_FEED_PRECISION)?;
    mul_div(value, PRECISION, scaled_price)
}

/// Calculate health factor in WAD (18 decimals).
/// HF = (collateral_value * THRESHOLD / LIQUIDATION_PRECISION) * 10^18 / debt
///
/// Returns `None` when debt is zero; callers treat that as maximal health.
#[inline(always)]
pub fn calculate_hf_wad(collateral_value: U256, debt: U256) -> Option<U256> {
    if debt.is_zero() {
        return None;
    }
    let adjusted = mul_div(collateral_value, LIQUIDATION_THRESHOLD, LIQUIDATION_PRECISION)?;
    mul_div(adjusted, PRECISION, debt)
}

/// Convert WAD (18 decimals) to f64.
/// Use only for display/logging, not for computation.
#[inline(always)]
pub fn wad_to_f64(wad: U256) -> f64 {
    if wad <= U256::from(u128::MAX) {
        let value: u128 = wad.to();
        value as f64 / 1e18
    } else {
        // Most significant limb first; f64 keeps the leading 53 bits
        let value = wad
            .as_limbs()
            .iter()
            .rev()
            .fold(0.0, |acc, limb| acc * 18_446_744_073_709_551_616.0 + *limb as f64);
        value / 1e18
    }
}
