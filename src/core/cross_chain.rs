//! Cross-Chain Estimator
//!
//! Indicative output only: the destination chain's QuoterV2 prices the
//! wrapped-native -> `token_out` leg at every configured fee tier.
//! Execution is not built and always fails.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::quote::quote_v3_path;
use crate::models::config::ChainRegistry;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::SwapPath;
use crate::providers::client::ChainReader;
use crate::utils::constants::DEFAULT_CROSS_CHAIN_FEE_TIERS;

/// Indicative cross-chain quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossChainEstimate {
    pub src_chain_id: u64,
    pub dst_chain_id: u64,
    pub token_out: Address,
    pub amount_in: U256,
    /// Best destination output; zero when no tier quoted
    pub amount_out: U256,
    /// Fee tier of the best quote
    pub fee_tier: Option<u32>,
}

impl CrossChainEstimate {
    /// Cross-chain execution is not available
    pub fn execute(&self) -> AppResult<()> {
        Err(AppError::cross_chain_unsupported())
    }
}

#[derive(Clone)]
pub struct CrossChainEstimator {
    registry: Arc<ChainRegistry>,
    reader: Arc<dyn ChainReader>,
}

impl CrossChainEstimator {
    pub fn new(registry: Arc<ChainRegistry>, reader: Arc<dyn ChainReader>) -> Self {
        Self { registry, reader }
    }

    pub async fn estimate(
        &self,
        src_chain_id: u64,
        dst_chain_id: u64,
        token_out: Address,
        amount_in: U256,
    ) -> AppResult<CrossChainEstimate> {
        self.registry.require(src_chain_id)?;
        let dst = self.registry.require(dst_chain_id)?;
        let quoter = dst.require_quoter_v3()?;
        let wrapped = dst.require_wrapped_native()?;

        let mut best: Option<(u32, U256)> = None;
        if token_out != wrapped {
            let path = SwapPath::new(vec![wrapped, token_out])?;
            let tiers = if dst.fee_tiers.is_empty() {
                DEFAULT_CROSS_CHAIN_FEE_TIERS.to_vec()
            } else {
                dst.fee_tiers.clone()
            };
            for fee in tiers {
                match quote_v3_path(self.reader.as_ref(), dst_chain_id, quoter, &path, &[fee], amount_in).await {
                    Ok(out) => {
                        if best.map_or(true, |(_, b)| out > b) {
                            best = Some((fee, out));
                        }
                    }
                    Err(e) => debug!("Cross-chain tier {} failed: {}", fee, e),
                }
            }
        } else {
            best = Some((0, amount_in));
        }

        let estimate = CrossChainEstimate {
            src_chain_id,
            dst_chain_id,
            token_out,
            amount_in,
            amount_out: best.map(|(_, out)| out).unwrap_or(U256::ZERO),
            fee_tier: best.map(|(fee, _)| fee).filter(|fee| *fee > 0),
        };
        info!(
            "🌉 Cross-chain estimate {} -> {}: out={}",
            src_chain_id, dst_chain_id, estimate.amount_out
        );
        Ok(estimate)
    }
}
