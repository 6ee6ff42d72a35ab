//! Liquidity reads: pair discovery, pair state, LP position refresh
//! and deposit estimates.

use alloy_primitives::{Address, U256};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::core::amm::{estimate_lp_mint, position_amount, quote, LpEstimate};
use crate::models::config::ChainRegistry;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::Position;
use crate::providers::client::{decode_result, read_call, ChainReader};
use crate::utils::abi::{
    allPairsCall, allPairsLengthCall, balanceOfCall, encode, getPairCall, getReservesCall,
    token0Call, token1Call, totalSupplyCall,
};

/// Max pairs read per enumeration page
pub const MAX_PAIR_PAGE: u64 = 100;

/// On-chain state of a V2 pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairState {
    pub pair: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256,
    pub reserve1: U256,
    pub total_supply: U256,
}

impl PairState {
    /// Reserves ordered as (reserve of `token`, reserve of the other side)
    pub fn reserves_for(&self, token: Address) -> Option<(U256, U256)> {
        if token == self.token0 {
            Some((self.reserve0, self.reserve1))
        } else if token == self.token1 {
            Some((self.reserve1, self.reserve0))
        } else {
            None
        }
    }
}

#[derive(Clone)]
pub struct LiquidityReader {
    registry: Arc<ChainRegistry>,
    reader: Arc<dyn ChainReader>,
}

impl LiquidityReader {
    pub fn new(registry: Arc<ChainRegistry>, reader: Arc<dyn ChainReader>) -> Self {
        Self { registry, reader }
    }

    /// Pair address for two tokens; `None` if the factory has none
    pub async fn find_pair(&self, chain_id: u64, token_a: Address, token_b: Address) -> AppResult<Option<Address>> {
        let factory = self.registry.require(chain_id)?.require_factory_v2()?;
        let call = getPairCall {
            tokenA: token_a,
            tokenB: token_b,
        };
        let pair = read_call(self.reader.as_ref(), chain_id, factory, &call).await?.pair;
        Ok((!pair.is_zero()).then_some(pair))
    }

    /// Tokens, reserves and LP supply of a pair, read in one batch
    pub async fn pair_state(&self, chain_id: u64, pair: Address) -> AppResult<PairState> {
        let calls = vec![
            (pair, encode(&token0Call {})),
            (pair, encode(&token1Call {})),
            (pair, encode(&getReservesCall {})),
            (pair, encode(&totalSupplyCall {})),
        ];
        let results = self.reader.call_many(chain_id, calls).await;
        let bad = || AppError::reverted(format!("{} is not a V2 pair", pair));

        let token0 = results.first().and_then(decode_result::<token0Call>).ok_or_else(bad)?._0;
        let token1 = results.get(1).and_then(decode_result::<token1Call>).ok_or_else(bad)?._0;
        let reserves = results.get(2).and_then(decode_result::<getReservesCall>).ok_or_else(bad)?;
        let total_supply = results.get(3).and_then(decode_result::<totalSupplyCall>).ok_or_else(bad)?._0;

        Ok(PairState {
            pair,
            token0,
            token1,
            reserve0: U256::from(reserves.reserve0),
            reserve1: U256::from(reserves.reserve1),
            total_supply,
        })
    }

    /// Position of `owner` in `pair`, recomputed from fresh reads
    pub async fn refresh_position(&self, chain_id: u64, owner: Address, pair: Address) -> AppResult<Position> {
        let state = self.pair_state(chain_id, pair).await?;
        let lp_shares = read_call(self.reader.as_ref(), chain_id, pair, &balanceOfCall { owner }).await?._0;

        Ok(Position {
            chain_id,
            pair,
            token_a: state.token0,
            token_b: state.token1,
            amount_a: position_amount(state.reserve0, lp_shares, state.total_supply),
            amount_b: position_amount(state.reserve1, lp_shares, state.total_supply),
            lp_shares,
            total_supply: state.total_supply,
            refreshed_at: Utc::now(),
        })
    }

    /// Non-empty positions of `owner` across `pairs`; unreadable pairs are skipped
    pub async fn positions(&self, chain_id: u64, owner: Address, pairs: &[Address]) -> Vec<Position> {
        let mut out = Vec::new();
        for &pair in pairs {
            match self.refresh_position(chain_id, owner, pair).await {
                Ok(pos) if !pos.is_empty() => out.push(pos),
                Ok(_) => {}
                Err(e) => debug!("Position read for {} failed: {}", pair, e),
            }
        }
        out
    }

    /// Page through the factory's pair list
    pub async fn list_pairs(&self, chain_id: u64, start: u64, limit: u64) -> AppResult<Vec<Address>> {
        let factory = self.registry.require(chain_id)?.require_factory_v2()?;
        let total = read_call(self.reader.as_ref(), chain_id, factory, &allPairsLengthCall {}).await?._0;
        let total: u64 = total.try_into().unwrap_or(u64::MAX);

        let end = total.min(start.saturating_add(limit.min(MAX_PAIR_PAGE)));
        if start >= end {
            return Ok(Vec::new());
        }
        let calls = (start..end)
            .map(|i| (factory, encode(&allPairsCall { index: U256::from(i) })))
            .collect();
        let results = self.reader.call_many(chain_id, calls).await;

        Ok(results
            .iter()
            .filter_map(decode_result::<allPairsCall>)
            .map(|ret| ret.pair)
            .filter(|pair| !pair.is_zero())
            .collect())
    }

    /// Amount of `token_b` matching `amount_a` at the pair's current ratio.
    /// `None` when there is no pair or it holds no reserves; the first
    /// depositor sets the price.
    pub async fn paired_amount(
        &self,
        chain_id: u64,
        token_a: Address,
        token_b: Address,
        amount_a: U256,
    ) -> AppResult<Option<U256>> {
        let Some(pair) = self.find_pair(chain_id, token_a, token_b).await? else {
            return Ok(None);
        };
        let state = self.pair_state(chain_id, pair).await?;
        let (reserve_a, reserve_b) = state
            .reserves_for(token_a)
            .ok_or_else(|| AppError::invalid_path(format!("{} is not in pair {}", token_a, pair)))?;
        if reserve_a.is_zero() || reserve_b.is_zero() {
            return Ok(None);
        }
        Ok(Some(quote(amount_a, reserve_a, reserve_b)))
    }

    /// LP tokens expected for a deposit; a missing pair is a fresh pool
    pub async fn estimate_add(
        &self,
        chain_id: u64,
        token_a: Address,
        token_b: Address,
        amount_a: U256,
        amount_b: U256,
    ) -> AppResult<LpEstimate> {
        let Some(pair) = self.find_pair(chain_id, token_a, token_b).await? else {
            return Ok(estimate_lp_mint(amount_a, amount_b, U256::ZERO, U256::ZERO, U256::ZERO));
        };
        let state = self.pair_state(chain_id, pair).await?;
        let (reserve_a, reserve_b) = state
            .reserves_for(token_a)
            .ok_or_else(|| AppError::invalid_path(format!("{} is not in pair {}", token_a, pair)))?;
        Ok(estimate_lp_mint(amount_a, amount_b, reserve_a, reserve_b, state.total_supply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserves_for() {
        let state = PairState {
            pair: Address::repeat_byte(9),
            token0: Address::repeat_byte(1),
            token1: Address::repeat_byte(2),
            reserve0: U256::from(10u64),
            reserve1: U256::from(20u64),
            total_supply: U256::from(5u64),
        };
        assert_eq!(
            state.reserves_for(Address::repeat_byte(2)),
            Some((U256::from(20u64), U256::from(10u64)))
        );
        assert_eq!(state.reserves_for(Address::repeat_byte(3)), None);
    }
}
