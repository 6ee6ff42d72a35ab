//! Constant-product AMM math
//!
//! Integer-exact versions of the Uniswap-V2 library formulas used for
//! paired deposit amounts, LP mint estimates and position amounts.

use alloy_primitives::U256;
use serde::Serialize;

use crate::utils::constants::{BPS_DENOMINATOR, MAX_SLIPPAGE_PCT};

/// LP tokens a V2 pair locks forever on its first mint
pub const MINIMUM_LIQUIDITY: u64 = 1_000;

/// Output for `amount_in` against one pool, fee taken on input
pub fn get_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256, fee_bps: u32) -> U256 {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return U256::ZERO;
    }
    let denom = U256::from(BPS_DENOMINATOR);
    let fee_bps = U256::from(fee_bps.min(BPS_DENOMINATOR as u32));
    let amount_in_with_fee = amount_in.saturating_mul(denom - fee_bps);
    let numerator = amount_in_with_fee.saturating_mul(reserve_out);
    let denominator = reserve_in
        .saturating_mul(denom)
        .saturating_add(amount_in_with_fee);
    if denominator.is_zero() {
        return U256::ZERO;
    }
    numerator / denominator
}

/// Proportional counterpart amount: `amount_a * reserve_b / reserve_a`
pub fn quote(amount_a: U256, reserve_a: U256, reserve_b: U256) -> U256 {
    if reserve_a.is_zero() {
        return U256::ZERO;
    }
    amount_a.saturating_mul(reserve_b) / reserve_a
}

/// Floor integer square root (Newton's method)
pub fn isqrt(value: U256) -> U256 {
    if value < U256::from(2u8) {
        return value;
    }
    let mut x = value;
    let mut y = (x + U256::from(1u8)) >> 1;
    while y < x {
        x = y;
        y = (x + value / x) >> 1;
    }
    x
}

/// Expected LP tokens and resulting pool share
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LpEstimate {
    pub liquidity: U256,
    /// Share of the pool after minting, percent
    pub share_pct: f64,
}

/// LP tokens minted for depositing `amount_a`/`amount_b`.
/// A pool without reserves mints `sqrt(a*b) - MINIMUM_LIQUIDITY` and owns
/// the whole circulating supply.
pub fn estimate_lp_mint(
    amount_a: U256,
    amount_b: U256,
    reserve_a: U256,
    reserve_b: U256,
    total_supply: U256,
) -> LpEstimate {
    if total_supply.is_zero() || reserve_a.is_zero() || reserve_b.is_zero() {
        return LpEstimate {
            liquidity: isqrt(amount_a.saturating_mul(amount_b)).saturating_sub(U256::from(MINIMUM_LIQUIDITY)),
            share_pct: 100.0,
        };
    }
    let la = amount_a.saturating_mul(total_supply) / reserve_a;
    let lb = amount_b.saturating_mul(total_supply) / reserve_b;
    let liquidity = la.min(lb);
    LpEstimate {
        liquidity,
        share_pct: ratio_pct(liquidity, total_supply.saturating_add(liquidity)),
    }
}

/// Underlying amount owned by `user_lp`: `reserve * user_lp / total_supply`
pub fn position_amount(reserve: U256, user_lp: U256, total_supply: U256) -> U256 {
    if total_supply.is_zero() {
        return U256::ZERO;
    }
    reserve.saturating_mul(user_lp) / total_supply
}

/// `amount * (1 - pct/100)` at basis-point precision; pct is clamped to [0, 50]
pub fn apply_slippage(amount: U256, pct: f64) -> U256 {
    let pct = if pct.is_nan() { 0.0 } else { pct.clamp(0.0, MAX_SLIPPAGE_PCT) };
    let bps = (pct * 100.0).round() as u64;
    amount.saturating_mul(U256::from(BPS_DENOMINATOR - bps)) / U256::from(BPS_DENOMINATOR)
}

/// `part / whole` as a percentage with 1e-4 precision
fn ratio_pct(part: U256, whole: U256) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }
    let scaled = part.saturating_mul(U256::from(1_000_000u64)) / whole;
    let scaled: u64 = scaled.try_into().unwrap_or(u64::MAX);
    scaled as f64 / 10_000.0
}
