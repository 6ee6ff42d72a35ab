//! Slippage Resolver
//!
//! Turns the user's slippage preference plus the detected token tax into
//! the tolerance actually applied to a quote.
//!
//! Auto mode:
//! - confirmed positive tax => Safe, tolerance = tax
//! - zero or unknown tax => Blind, tolerance 0 and `amount_out_min = 1`

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::models::errors::{AppError, AppResult};
use crate::models::types::{Quote, SlippageMode, TaxReading};
use crate::utils::constants::MAX_SLIPPAGE_PCT;

/// Auto sub-mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoKind {
    /// Tolerance taken from the detected tax
    Safe,
    /// No output floor
    Blind,
}

/// Tolerance ready to be applied to a quote
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSlippage {
    pub mode: SlippageMode,
    /// Percent in [0, 50], two decimals
    pub pct: f64,
    /// `round(pct * 100)`
    pub bps: u32,
    /// Only set in auto mode
    pub auto: Option<AutoKind>,
    /// Tax the tolerance was resolved against
    pub tax: TaxReading,
}

/// Clamp to [0, 50] and round to two decimals; NaN reads as zero
pub fn clamp_pct(pct: f64) -> f64 {
    if pct.is_nan() {
        return 0.0;
    }
    (pct.clamp(0.0, MAX_SLIPPAGE_PCT) * 100.0).round() / 100.0
}

fn to_bps(pct: f64) -> u32 {
    (pct * 100.0).round() as u32
}

/// Resolve the effective tolerance. Pure.
pub fn resolve(mode: SlippageMode, user_pct: f64, detected: TaxReading) -> ResolvedSlippage {
    match mode {
        SlippageMode::Auto => match detected.confirmed_positive() {
            Some(tax) => {
                let pct = clamp_pct(tax);
                ResolvedSlippage {
                    mode,
                    pct,
                    bps: to_bps(pct),
                    auto: Some(AutoKind::Safe),
                    tax: detected,
                }
            }
            None => ResolvedSlippage {
                mode,
                pct: 0.0,
                bps: 0,
                auto: Some(AutoKind::Blind),
                tax: detected,
            },
        },
        SlippageMode::Fixed | SlippageMode::Custom => {
            let pct = clamp_pct(user_pct);
            ResolvedSlippage {
                mode,
                pct,
                bps: to_bps(pct),
                auto: None,
                tax: detected,
            }
        }
    }
}

impl ResolvedSlippage {
    /// Blind auto: any positive output is accepted
    pub fn is_blind(&self) -> bool {
        self.auto == Some(AutoKind::Blind)
    }

    /// A manual tolerance below the token tax guarantees a revert
    pub fn validate(&self) -> AppResult<()> {
        if self.mode == SlippageMode::Auto {
            return Ok(());
        }
        let tax = self.tax.pct_or_zero();
        if self.pct + 1e-9 < tax {
            return Err(AppError::slippage_too_small(tax));
        }
        Ok(())
    }

    /// Minimum acceptable output for `amount_out`
    pub fn min_out(&self, amount_out: U256) -> U256 {
        Quote::min_out(amount_out, self.bps, self.is_blind())
    }
}
