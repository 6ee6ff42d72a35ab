//! Quote Engine
//!
//! Best-route selection over a small fixed candidate set:
//! 1. Native <-> wrapped-native is a 1:1 virtual quote (no AMM call)
//! 2. V2 paths (direct, via wrapped-native, via one or two stables) are
//!    priced with the router's `getAmountsOut`; the largest output wins
//! 3. If no V2 path quotes and the chain has a QuoterV2, V3 hop sets are
//!    priced hop by hop with `quoteExactInputSingle`
//!
//! Per-candidate failures are expected (missing pools) and swallowed.

use alloy_primitives::aliases::{U160, U24};
use alloy_primitives::{Address, U256};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::models::config::{ChainConfig, ChainRegistry};
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{Quote, Route, SwapPath, TokenAddress, TokenRef};
use crate::providers::client::{decode_result, read_call, ChainReader};
use crate::utils::abi::{
    encode, getAmountsOutCall, quoteExactInputSingleCall, QuoteExactInputSingleParams,
};
use crate::utils::units::parse_positive_units;

/// Inputs of a quote; recomputed on every user input change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub chain_id: u64,
    pub token_in: TokenRef,
    pub token_out: TokenRef,
    /// Human decimal amount in `token_in` units
    pub amount: String,
    pub slippage_bps: u32,
    /// Accept any positive output (`amount_out_min == 1`)
    #[serde(default)]
    pub blind_min_out: bool,
}

impl QuoteRequest {
    /// Key used to tell requests apart for supersession
    pub fn input_key(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}",
            self.chain_id,
            self.token_in.address,
            self.token_out.address,
            self.amount.trim(),
            self.slippage_bps,
            self.blind_min_out
        )
    }
}

/// One V3 candidate: a path and one fee tier per hop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct V3Candidate {
    pub path: SwapPath,
    pub fees: Vec<u32>,
}

/// Fee tier as the quoter's uint24
fn fee_u24(fee: u32) -> Option<U24> {
    if fee >= 1 << 24 {
        return None;
    }
    Some(U24::from_limbs([u64::from(fee)]))
}

/// Price a V3 path hop by hop; each hop's output feeds the next
pub async fn quote_v3_path(
    reader: &dyn ChainReader,
    chain_id: u64,
    quoter: Address,
    path: &SwapPath,
    fees: &[u32],
    amount_in: U256,
) -> AppResult<U256> {
    if fees.len() != path.hops() {
        return Err(AppError::invalid_path("V3 path needs one fee per hop"));
    }
    let mut amount = amount_in;
    for (hop, fee) in path.tokens().windows(2).zip(fees) {
        let fee = fee_u24(*fee)
            .ok_or_else(|| AppError::invalid_path(format!("Fee tier {} exceeds uint24", fee)))?;
        let call = quoteExactInputSingleCall {
            params: QuoteExactInputSingleParams {
                tokenIn: hop[0],
                tokenOut: hop[1],
                amountIn: amount,
                fee,
                sqrtPriceLimitX96: U160::ZERO,
            },
        };
        amount = read_call(reader, chain_id, quoter, &call).await?.amountOut;
        if amount.is_zero() {
            return Err(AppError::route_not_available());
        }
    }
    Ok(amount)
}

/// Stateless quoting service
#[derive(Clone)]
pub struct QuoteEngine {
    registry: Arc<ChainRegistry>,
    reader: Arc<dyn ChainReader>,
}

impl QuoteEngine {
    pub fn new(registry: Arc<ChainRegistry>, reader: Arc<dyn ChainReader>) -> Self {
        Self { registry, reader }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    /// Best quote for the request.
    ///
    /// Errors: `CFG_UNSUPPORTED_CHAIN`, `QUOTE_INVALID_AMOUNT`,
    /// `QUOTE_SAME_TOKEN`, `ROUTER_NOT_CONFIGURED`, `ROUTE_NOT_AVAILABLE`.
    pub async fn quote(&self, req: &QuoteRequest) -> AppResult<Quote> {
        let start = Instant::now();
        let cfg = self.registry.require(req.chain_id)?;

        if req.token_in.chain_id != req.chain_id || req.token_out.chain_id != req.chain_id {
            return Err(AppError::cross_chain_unsupported());
        }
        if req.token_in == req.token_out {
            return Err(AppError::new(
                ErrorCode::QuoteSameToken,
                "Input and output token are the same",
            ));
        }
        let amount_in = parse_positive_units(&req.amount, req.token_in.decimals)?;

        if let Some(unwrap) = wrap_direction(cfg, &req.token_in, &req.token_out) {
            if let Some(wrapped) = cfg.wrapped_native {
                debug!("🔁 {} quote on chain {}", if unwrap { "Unwrap" } else { "Wrap" }, cfg.chain_id);
                return Ok(Quote::wrap(cfg.chain_id, wrapped, amount_in, unwrap));
            }
        }

        let token_in = req
            .token_in
            .resolve(cfg.wrapped_native)
            .ok_or_else(|| AppError::missing_contract("wrapped native", cfg.chain_id))?;
        let token_out = req
            .token_out
            .resolve(cfg.wrapped_native)
            .ok_or_else(|| AppError::missing_contract("wrapped native", cfg.chain_id))?;
        if token_in == token_out {
            return Err(AppError::new(
                ErrorCode::QuoteSameToken,
                "Input and output resolve to the same token",
            ));
        }

        let mut best: Option<(Route, U256)> = None;

        if let Some(router) = cfg.router_v2 {
            let candidates = v2_candidates(cfg, token_in, token_out);
            if let Some((path, out)) = self.best_v2(cfg.chain_id, router, amount_in, candidates).await {
                best = Some((Route::V2 { path }, out));
            }
        }

        if best.is_none() {
            if let Some(quoter) = cfg.quoter_v3 {
                let candidates = v3_candidates(cfg, token_in, token_out);
                if let Some((cand, out)) = self.best_v3(cfg.chain_id, quoter, amount_in, candidates).await {
                    best = Some((
                        Route::V3 {
                            path: cand.path,
                            fee_tiers: cand.fees,
                        },
                        out,
                    ));
                }
            }
        }

        let Some((route, amount_out)) = best else {
            return Err(match cfg.router_v2 {
                None => AppError::router_not_configured(cfg.chain_id),
                Some(_) => AppError::route_not_available(),
            });
        };

        let quote = Quote {
            chain_id: cfg.chain_id,
            route,
            amount_in,
            amount_out,
            amount_out_min: Quote::min_out(amount_out, req.slippage_bps, req.blind_min_out),
        };

        info!(
            "💱 Quote {} {} -> {} | out={} min={} | {}ms",
            quote.protocol().as_str(),
            req.token_in.symbol,
            req.token_out.symbol,
            quote.amount_out,
            quote.amount_out_min,
            start.elapsed().as_millis()
        );
        Ok(quote)
    }

    /// Price every V2 candidate in one batch; strictly greatest output wins
    async fn best_v2(
        &self,
        chain_id: u64,
        router: Address,
        amount_in: U256,
        candidates: Vec<SwapPath>,
    ) -> Option<(SwapPath, U256)> {
        if candidates.is_empty() {
            return None;
        }
        let calls = candidates
            .iter()
            .map(|path| {
                let call = getAmountsOutCall {
                    amountIn: amount_in,
                    path: path.tokens().to_vec(),
                };
                (router, encode(&call))
            })
            .collect();
        let results = self.reader.call_many(chain_id, calls).await;

        let mut best: Option<(SwapPath, U256)> = None;
        for (path, result) in candidates.into_iter().zip(results.iter()) {
            let out = match decode_result::<getAmountsOutCall>(result) {
                Some(ret) => ret.amounts.last().copied().unwrap_or(U256::ZERO),
                None => {
                    if let Err(e) = result {
                        debug!("V2 candidate {} failed: {}", path.key(), e);
                    }
                    continue;
                }
            };
            if out.is_zero() {
                continue;
            }
            if best.as_ref().map_or(true, |(_, b)| out > *b) {
                best = Some((path, out));
            }
        }
        best
    }

    /// Price every V3 candidate concurrently; greatest final output wins
    async fn best_v3(
        &self,
        chain_id: u64,
        quoter: Address,
        amount_in: U256,
        candidates: Vec<V3Candidate>,
    ) -> Option<(V3Candidate, U256)> {
        let reader = self.reader.as_ref();
        let quotes = join_all(candidates.iter().map(|cand| {
            quote_v3_path(reader, chain_id, quoter, &cand.path, &cand.fees, amount_in)
        }))
        .await;

        let mut best: Option<(V3Candidate, U256)> = None;
        for (cand, result) in candidates.into_iter().zip(quotes) {
            match result {
                Ok(out) if !out.is_zero() => {
                    if best.as_ref().map_or(true, |(_, b)| out > *b) {
                        best = Some((cand, out));
                    }
                }
                Ok(_) => {}
                Err(e) => debug!("V3 candidate {} {:?} failed: {}", cand.path.key(), cand.fees, e),
            }
        }
        best
    }
}

/// `Some(false)` for native -> wrapped, `Some(true)` for wrapped -> native
pub fn wrap_direction(cfg: &ChainConfig, token_in: &TokenRef, token_out: &TokenRef) -> Option<bool> {
    let wrapped = cfg.wrapped_native?;
    match (token_in.address, token_out.address) {
        (TokenAddress::Native, TokenAddress::Contract(out)) if out == wrapped => Some(false),
        (TokenAddress::Contract(inp), TokenAddress::Native) if inp == wrapped => Some(true),
        _ => None,
    }
}

/// Push `path` unless an equal path (case-insensitive key) is already present
fn push_unique(out: &mut Vec<SwapPath>, seen: &mut HashSet<String>, path: Option<SwapPath>) {
    if let Some(path) = path {
        if seen.insert(path.key()) {
            out.push(path);
        }
    }
}

/// V2 candidate paths in evaluation order, deduplicated
pub fn v2_candidates(cfg: &ChainConfig, token_in: Address, token_out: Address) -> Vec<SwapPath> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();

    push_unique(&mut out, &mut seen, SwapPath::cleaned([token_in, token_out]));

    if let Some(wrapped) = cfg.wrapped_native {
        if token_in != wrapped && token_out != wrapped {
            push_unique(&mut out, &mut seen, SwapPath::cleaned([token_in, wrapped, token_out]));
        }
    }

    for &stable in &cfg.stable_bridges {
        push_unique(&mut out, &mut seen, SwapPath::cleaned([token_in, stable, token_out]));
    }

    for &s1 in &cfg.stable_bridges {
        for &s2 in &cfg.stable_bridges {
            if s1 != s2 {
                push_unique(&mut out, &mut seen, SwapPath::cleaned([token_in, s1, s2, token_out]));
            }
        }
    }

    out
}

/// V3 candidate hop sets in evaluation order, deduplicated by path and fees
pub fn v3_candidates(cfg: &ChainConfig, token_in: Address, token_out: Address) -> Vec<V3Candidate> {
    let tiers = cfg.effective_fee_tiers();
    let mut out: Vec<V3Candidate> = Vec::new();
    let mut seen: HashSet<(String, Vec<u32>)> = HashSet::new();

    let mut push = |tokens: Vec<Address>, fees: Vec<u32>| {
        if let Ok(path) = SwapPath::new(tokens) {
            if seen.insert((path.key(), fees.clone())) {
                out.push(V3Candidate { path, fees });
            }
        }
    };

    for &fee in &tiers {
        push(vec![token_in, token_out], vec![fee]);
    }

    let mut mids: Vec<Address> = Vec::new();
    if let Some(wrapped) = cfg.wrapped_native {
        mids.push(wrapped);
    }
    mids.extend(cfg.stable_bridges.iter().copied());

    for mid in mids {
        if mid == token_in || mid == token_out {
            continue;
        }
        for &f1 in &tiers {
            for &f2 in &tiers {
                push(vec![token_in, mid, token_out], vec![f1, f2]);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    fn chain() -> ChainConfig {
        ChainConfig::new(1, "Test", "ETH")
            .with_wrapped_native(addr(0xee))
            .with_router_v2(addr(0xf0))
            .with_stable_bridges(vec![addr(0x51), addr(0x52)])
            .with_fee_tiers(vec![500, 3000])
    }

    #[test]
    fn test_v2_candidate_set() {
        let paths = v2_candidates(&chain(), addr(1), addr(2));
        let keys: Vec<Vec<Address>> = paths.iter().map(|p| p.tokens().to_vec()).collect();
        assert_eq!(
            keys,
            vec![
                vec![addr(1), addr(2)],
                vec![addr(1), addr(0xee), addr(2)],
                vec![addr(1), addr(0x51), addr(2)],
                vec![addr(1), addr(0x52), addr(2)],
                vec![addr(1), addr(0x51), addr(0x52), addr(2)],
                vec![addr(1), addr(0x52), addr(0x51), addr(2)],
            ]
        );
    }

    #[test]
    fn test_v2_skips_wrapped_hop_for_wrapped_endpoint() {
        let paths = v2_candidates(&chain(), addr(0xee), addr(2));
        assert!(paths.iter().all(|p| p.tokens().len() != 3 || p.tokens()[1] != addr(0xee)));
    }

    #[test]
    fn test_v2_dedup_when_stable_is_wrapped() {
        let cfg = chain().with_stable_bridges(vec![addr(0xee), addr(0x51)]);
        let paths = v2_candidates(&cfg, addr(1), addr(2));
        let keys: HashSet<String> = paths.iter().map(|p| p.key()).collect();
        assert_eq!(keys.len(), paths.len());
        // direct, via wrapped, via 0x51, and the two ordered stable pairs
        assert_eq!(paths.len(), 5);
    }

    #[test]
    fn test_v2_dedup_when_stable_is_endpoint() {
        // token_in is itself a stable: [in, in, out] collapses to the direct path
        let paths = v2_candidates(&chain(), addr(0x51), addr(2));
        let keys: HashSet<String> = paths.iter().map(|p| p.key()).collect();
        assert_eq!(keys.len(), paths.len());
        assert_eq!(paths[0].tokens(), &[addr(0x51), addr(2)]);
    }

    #[test]
    fn test_v3_candidate_set() {
        let cands = v3_candidates(&chain(), addr(1), addr(2));
        // direct x 2 tiers + 3 mids x 4 ordered tier pairs
        assert_eq!(cands.len(), 2 + 3 * 4);
        assert_eq!(cands[0].fees, vec![500]);
        assert!(cands.iter().all(|c| c.fees.len() == c.path.hops()));
    }

    #[test]
    fn test_v3_default_tiers() {
        let cfg = ChainConfig::new(1, "Test", "ETH");
        let cands = v3_candidates(&cfg, addr(1), addr(2));
        assert_eq!(
            cands.iter().map(|c| c.fees[0]).collect::<Vec<_>>(),
            vec![500, 2500, 10000]
        );
    }

    #[test]
    fn test_wrap_direction() {
        let cfg = chain();
        let native = TokenRef::native(1, "ETH");
        let weth = TokenRef::erc20(1, addr(0xee), "WETH", 18);
        let other = TokenRef::erc20(1, addr(3), "X", 18);
        assert_eq!(wrap_direction(&cfg, &native, &weth), Some(false));
        assert_eq!(wrap_direction(&cfg, &weth, &native), Some(true));
        assert_eq!(wrap_direction(&cfg, &native, &other), None);
    }

    #[test]
    fn test_fee_u24() {
        assert!(fee_u24(500).is_some());
        assert!(fee_u24(1 << 24).is_none());
    }

    #[test]
    fn test_input_key_changes_with_amount() {
        let req = |amount: &str| QuoteRequest {
            chain_id: 1,
            token_in: TokenRef::native(1, "ETH"),
            token_out: TokenRef::erc20(1, addr(3), "X", 18),
            amount: amount.to_string(),
            slippage_bps: 50,
            blind_min_out: false,
        };
        assert_ne!(req("1").input_key(), req("2").input_key());
        assert_eq!(req("1").input_key(), req(" 1 ").input_key());
    }
}
