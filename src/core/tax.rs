//! Tax/Fee Detector
//!
//! Best-effort transfer-tax discovery by reading well-known getter names.
//! Every getter is read (one batched round trip); the largest normalized
//! candidate wins. Tokens exposing none of the getters read as
//! [`TaxReading::Unknown`], which is distinct from a confirmed zero.

use alloy_primitives::{Address, U256};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::errors::ErrorCode;
use crate::models::types::{TaxReading, TokenRef};
use crate::providers::client::ChainReader;
use crate::utils::abi::{getter_calldata, word, words};
use crate::utils::cache::{CacheStats, TaxCache};

/// Denominator getters, first positive value wins
pub const DENOMINATOR_GETTERS: [&str; 5] = [
    "feeDenominator",
    "denominator",
    "taxDenominator",
    "FEE_DENOMINATOR",
    "TAX_DENOMINATOR",
];

/// Getters returning one tax value
pub const SINGLE_GETTERS: [&str; 18] = [
    "totalTax",
    "taxFee",
    "_taxFee",
    "sellTax",
    "buyTax",
    "transferTax",
    "fee",
    "fees",
    "liquidityFee",
    "marketingFee",
    "totalFee",
    "_totalFee",
    "sellFee",
    "buyFee",
    "transferFee",
    "tax",
    "_tax",
    "taxes",
];

/// Getters returning a (buy, sell, transfer) style tuple
pub const TUPLE_GETTERS: [&str; 5] = ["getTaxes", "taxesInfo", "feesInfo", "getFees", "feeInfo"];

fn to_f64(raw: U256) -> f64 {
    u128::try_from(raw).map(|v| v as f64).unwrap_or(f64::MAX)
}

/// Raw getter value to percent.
///
/// With a denominator: `100 * raw / denom`. Without: raw percent up to 50,
/// basis points up to 5000, per-ten-thousand up to 10000, anything else 0.
pub fn normalize(raw: U256, denominator: Option<U256>) -> f64 {
    if let Some(denom) = denominator.filter(|d| !d.is_zero()) {
        return 100.0 * to_f64(raw) / to_f64(denom);
    }
    let value = to_f64(raw);
    if value <= 50.0 {
        value
    } else if value <= 5_000.0 {
        value / 100.0
    } else if value <= 10_000.0 {
        100.0 * value / 10_000.0
    } else {
        0.0
    }
}

/// Words a tuple getter returned: three, or two when the data is shorter
fn tuple_words(data: &[u8]) -> Option<Vec<U256>> {
    words(data, 3).or_else(|| words(data, 2))
}

/// Transfer-tax detector with a per-(chain, token) TTL cache
#[derive(Clone)]
pub struct TaxDetector {
    reader: Arc<dyn ChainReader>,
    cache: TaxCache,
}

impl TaxDetector {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self::with_cache(reader, TaxCache::new())
    }

    pub fn with_cache(reader: Arc<dyn ChainReader>, cache: TaxCache) -> Self {
        Self { reader, cache }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Native currency carries no transfer tax
    pub async fn detect_token(&self, token: &TokenRef) -> TaxReading {
        match token.address.contract() {
            Some(addr) => self.detect(token.chain_id, addr).await,
            None => TaxReading::Detected(0.0),
        }
    }

    /// Cached detection
    pub async fn detect(&self, chain_id: u64, token: Address) -> TaxReading {
        if let Some(reading) = self.cache.get(chain_id, token) {
            return reading;
        }
        let (reading, transport_failed) = self.read_getters(chain_id, token).await;
        if transport_failed {
            // a reading missing some answers is not cached
            warn!("⚠️ Tax getter reads for {} on chain {} hit RPC errors; not caching", token, chain_id);
        } else {
            self.cache.set(chain_id, token, reading);
        }
        reading
    }

    /// Uncached detection: reads every getter
    pub async fn detect_uncached(&self, chain_id: u64, token: Address) -> TaxReading {
        self.read_getters(chain_id, token).await.0
    }

    /// Reading plus whether any getter read failed for a reason other than a revert
    async fn read_getters(&self, chain_id: u64, token: Address) -> (TaxReading, bool) {
        let names: Vec<&str> = DENOMINATOR_GETTERS
            .iter()
            .chain(SINGLE_GETTERS.iter())
            .chain(TUPLE_GETTERS.iter())
            .copied()
            .collect();
        let calls = names.iter().map(|n| (token, getter_calldata(n))).collect();
        let results = self.reader.call_many(chain_id, calls).await;
        let transport_failed = results
            .iter()
            .any(|r| matches!(r, Err(e) if e.code != ErrorCode::ContractReverted));

        let (denoms, rest) = results.split_at(DENOMINATOR_GETTERS.len().min(results.len()));
        let (singles, tuples) = rest.split_at(SINGLE_GETTERS.len().min(rest.len()));

        let denominator = DENOMINATOR_GETTERS.iter().zip(denoms).find_map(|(name, res)| {
            let value = res.as_ref().ok().and_then(|data| word(data, 0))?;
            if value.is_zero() {
                return None;
            }
            debug!("🧮 {} {}() = {}", token, name, value);
            Some(value)
        });

        let mut candidates: Vec<f64> = Vec::new();

        for (name, res) in SINGLE_GETTERS.iter().zip(singles) {
            if let Some(raw) = res.as_ref().ok().and_then(|data| word(data, 0)) {
                let pct = normalize(raw, denominator);
                debug!("🧾 {} {}() = {} -> {:.2}%", token, name, raw, pct);
                candidates.push(pct);
            }
        }

        for (name, res) in TUPLE_GETTERS.iter().zip(tuples) {
            if let Some(values) = res.as_ref().ok().and_then(|data| tuple_words(data)) {
                debug!("🧾 {} {}() = {:?}", token, name, values);
                candidates.extend(values.into_iter().map(|raw| normalize(raw, denominator)));
            }
        }

        if candidates.is_empty() {
            debug!("❔ No tax getter answered for {} on chain {}", token, chain_id);
            return (TaxReading::Unknown, transport_failed);
        }

        let max = candidates.into_iter().fold(0.0_f64, f64::max);
        let reading = TaxReading::detected(max);
        info!("🧾 Tax for {} on chain {}: {:.2}%", token, chain_id, reading.pct_or_zero());
        (reading, transport_failed)
    }
}
