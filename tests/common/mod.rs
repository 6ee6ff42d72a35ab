//! In-memory chain + wallet used by the integration tests.
//!
//! Calldata is decoded with the crate's own `sol!` types, prices come from
//! constant-product pools without fees, and every transaction-relevant
//! interaction is appended to an event log.

#![allow(dead_code)]

use alloy_primitives::aliases::{U112, U160};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ruster_swap::core::amm::get_amount_out;
use ruster_swap::models::config::{ChainConfig, ChainRegistry, EngineConfig};
use ruster_swap::models::errors::{AppError, AppResult, ErrorCode};
use ruster_swap::providers::client::{ChainReader, PreparedTx, ReceiptPoller, TxReceipt, TxRequest, WalletSigner};
use ruster_swap::utils::abi::{
    allPairsCall, allPairsLengthCall, allowanceCall, approveCall, balanceOfCall, getAmountsOutCall, getPairCall,
    getReservesCall, getter_calldata, quoteExactInputSingleCall, token0Call, token1Call, totalSupplyCall,
};

pub const CHAIN: u64 = 56;
pub const OTHER_CHAIN: u64 = 8453;

pub fn addr(n: u8) -> Address {
    Address::repeat_byte(n)
}

pub fn wrapped() -> Address {
    addr(0xee)
}
pub fn router() -> Address {
    addr(0xf0)
}
pub fn factory() -> Address {
    addr(0xf1)
}
pub fn quoter() -> Address {
    addr(0xf2)
}
pub fn swap_router_v3() -> Address {
    addr(0xf3)
}
pub fn stable() -> Address {
    addr(0x51)
}
pub fn user() -> Address {
    addr(0xaa)
}

/// `n * 10^decimals`
pub fn units(n: u64, decimals: u8) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(decimals))
}

/// Fully configured test chain
pub fn test_chain() -> ChainConfig {
    ChainConfig::new(CHAIN, "Test Chain", "TST")
        .with_wrapped_native(wrapped())
        .with_router_v2(router())
        .with_factory_v2(factory())
        .with_quoter_v3(quoter())
        .with_swap_router_v3(swap_router_v3())
        .with_stable_bridges(vec![stable()])
        .with_fee_tiers(vec![500, 3000])
}

pub fn registry_with(configs: Vec<ChainConfig>) -> Arc<ChainRegistry> {
    Arc::new(ChainRegistry::from_configs(configs).unwrap())
}

pub fn test_registry() -> Arc<ChainRegistry> {
    registry_with(vec![
        test_chain(),
        ChainConfig::new(OTHER_CHAIN, "Other", "ETH")
            .with_wrapped_native(addr(0xe1))
            .with_quoter_v3(addr(0xf4))
            .with_fee_tiers(vec![500, 3000]),
    ])
}

pub fn fast_engine_config() -> EngineConfig {
    EngineConfig {
        deadline_minutes: 20,
        remove_deadline_minutes: 15,
        receipt_poll_interval: Duration::from_millis(5),
        receipt_timeout: Duration::from_secs(1),
        tax_cache_ttl_secs: 300,
        lp_slippage_pct: 0.5,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchMode {
    Accept,
    Reject,
    Unsupported,
}

struct PairInfo {
    token0: Address,
    token1: Address,
    reserve0: U256,
    reserve1: U256,
    total_supply: U256,
    balances: HashMap<Address, U256>,
}

pub struct MockState {
    pub wallet_chain: u64,
    pub account: Address,
    v2_pools: HashMap<(Address, Address), (U256, U256)>,
    v3_pools: HashMap<(Address, Address, u32), (U256, U256)>,
    getters: HashMap<(Address, Bytes), Bytes>,
    allowances: HashMap<(Address, Address, Address), U256>,
    delays: HashMap<U256, Duration>,
    pairs: HashMap<(Address, Address), Address>,
    pair_list: Vec<Address>,
    pair_info: HashMap<Address, PairInfo>,
    pub switch_mode: SwitchMode,
    pub simulate_error: Option<String>,
    pub reject_write: bool,
    pub approval_succeeds: bool,
    pub tx_succeeds: bool,
    pub write_delay: Option<Duration>,
    approval_hashes: Vec<B256>,
    next_hash: u64,
    pub events: Vec<String>,
    pub written: Vec<TxRequest>,
    pub simulated: Vec<TxRequest>,
}

/// Chain reader, wallet and receipt poller in one
#[derive(Clone)]
pub struct MockChain {
    pub state: Arc<Mutex<MockState>>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                wallet_chain: CHAIN,
                account: user(),
                v2_pools: HashMap::new(),
                v3_pools: HashMap::new(),
                getters: HashMap::new(),
                allowances: HashMap::new(),
                delays: HashMap::new(),
                pairs: HashMap::new(),
                pair_list: Vec::new(),
                pair_info: HashMap::new(),
                switch_mode: SwitchMode::Accept,
                simulate_error: None,
                reject_write: false,
                approval_succeeds: true,
                tx_succeeds: true,
                write_delay: None,
                approval_hashes: Vec::new(),
                next_hash: 1,
                events: Vec::new(),
                written: Vec::new(),
                simulated: Vec::new(),
            })),
        }
    }

    pub fn with<F: FnOnce(&mut MockState)>(&self, f: F) -> &Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    /// V2 pool with `reserve_a` of `a` and `reserve_b` of `b`
    pub fn add_v2_pool(&self, a: Address, b: Address, reserve_a: U256, reserve_b: U256) -> &Self {
        self.with(|s| {
            s.v2_pools.insert((a, b), (reserve_a, reserve_b));
            s.v2_pools.insert((b, a), (reserve_b, reserve_a));
        })
    }

    pub fn add_v3_pool(&self, a: Address, b: Address, fee: u32, reserve_a: U256, reserve_b: U256) -> &Self {
        self.with(|s| {
            s.v3_pools.insert((a, b, fee), (reserve_a, reserve_b));
            s.v3_pools.insert((b, a, fee), (reserve_b, reserve_a));
        })
    }

    /// Zero-argument getter `name()` on `token` returning `words`
    pub fn set_getter(&self, token: Address, name: &str, words: &[u64]) -> &Self {
        let mut data = Vec::new();
        for w in words {
            data.extend_from_slice(&U256::from(*w).to_be_bytes::<32>());
        }
        self.with(|s| {
            s.getters.insert((token, getter_calldata(name)), Bytes::from(data));
        })
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) -> &Self {
        self.with(|s| {
            s.allowances.insert((token, owner, spender), amount);
        })
    }

    /// Delay `getAmountsOut` for a given input amount
    pub fn delay_amount(&self, amount_in: U256, delay: Duration) -> &Self {
        self.with(|s| {
            s.delays.insert(amount_in, delay);
        })
    }

    pub fn add_pair(
        &self,
        pair: Address,
        token0: Address,
        token1: Address,
        reserve0: U256,
        reserve1: U256,
        total_supply: U256,
    ) -> &Self {
        self.with(|s| {
            s.pairs.insert((token0, token1), pair);
            s.pairs.insert((token1, token0), pair);
            s.pair_list.push(pair);
            s.pair_info.insert(
                pair,
                PairInfo {
                    token0,
                    token1,
                    reserve0,
                    reserve1,
                    total_supply,
                    balances: HashMap::new(),
                },
            );
        })
    }

    pub fn set_lp_balance(&self, pair: Address, owner: Address, amount: U256) -> &Self {
        self.with(|s| {
            if let Some(info) = s.pair_info.get_mut(&pair) {
                info.balances.insert(owner, amount);
            }
        })
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    /// Events of the transaction path only
    pub fn tx_events(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e.as_str(), "allowance" | "approve" | "wait" | "simulate" | "write" | "switch_chain"))
            .collect()
    }

    pub fn written(&self) -> Vec<TxRequest> {
        self.state.lock().unwrap().written.clone()
    }

    pub fn simulated(&self) -> Vec<TxRequest> {
        self.state.lock().unwrap().simulated.clone()
    }

    fn log(&self, event: &str) {
        self.state.lock().unwrap().events.push(event.to_string());
    }

    fn next_hash(&self, approval: bool) -> B256 {
        let mut s = self.state.lock().unwrap();
        let hash = B256::left_padding_from(&s.next_hash.to_be_bytes());
        s.next_hash += 1;
        if approval {
            s.approval_hashes.push(hash);
        }
        hash
    }

    fn v2_amounts(&self, amount_in: U256, path: &[Address]) -> AppResult<Vec<U256>> {
        let s = self.state.lock().unwrap();
        let mut amounts = vec![amount_in];
        let mut current = amount_in;
        for hop in path.windows(2) {
            let (ra, rb) = s
                .v2_pools
                .get(&(hop[0], hop[1]))
                .copied()
                .ok_or_else(|| AppError::reverted("execution reverted: UniswapV2Library: INSUFFICIENT_LIQUIDITY"))?;
            current = get_amount_out(current, ra, rb, 0);
            amounts.push(current);
        }
        Ok(amounts)
    }

    fn answer(&self, to: Address, data: &[u8]) -> AppResult<Bytes> {
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| AppError::reverted("execution reverted"))?;

        if selector == getAmountsOutCall::SELECTOR && to == router() {
            let call = getAmountsOutCall::abi_decode(data, true).map_err(AppError::from)?;
            let amounts = self.v2_amounts(call.amountIn, &call.path)?;
            return Ok(getAmountsOutCall::abi_encode_returns(&(amounts,)).into());
        }

        if selector == quoteExactInputSingleCall::SELECTOR && (to == quoter() || to == addr(0xf4)) {
            let call = quoteExactInputSingleCall::abi_decode(data, true).map_err(AppError::from)?;
            let p = call.params;
            let fee: u32 = p.fee.to::<u32>();
            let s = self.state.lock().unwrap();
            let (ra, rb) = s
                .v3_pools
                .get(&(p.tokenIn, p.tokenOut, fee))
                .copied()
                .ok_or_else(|| AppError::reverted("execution reverted"))?;
            let out = get_amount_out(p.amountIn, ra, rb, 0);
            return Ok(quoteExactInputSingleCall::abi_encode_returns(&(out, U160::ZERO, 0u32, U256::ZERO)).into());
        }

        if selector == allowanceCall::SELECTOR {
            let call = allowanceCall::abi_decode(data, true).map_err(AppError::from)?;
            let mut s = self.state.lock().unwrap();
            s.events.push("allowance".to_string());
            let value = s
                .allowances
                .get(&(to, call.owner, call.spender))
                .copied()
                .unwrap_or(U256::ZERO);
            return Ok(allowanceCall::abi_encode_returns(&(value,)).into());
        }

        let s = self.state.lock().unwrap();

        if to == factory() {
            if selector == getPairCall::SELECTOR {
                let call = getPairCall::abi_decode(data, true).map_err(AppError::from)?;
                let pair = s.pairs.get(&(call.tokenA, call.tokenB)).copied().unwrap_or(Address::ZERO);
                return Ok(getPairCall::abi_encode_returns(&(pair,)).into());
            }
            if selector == allPairsLengthCall::SELECTOR {
                return Ok(allPairsLengthCall::abi_encode_returns(&(U256::from(s.pair_list.len()),)).into());
            }
            if selector == allPairsCall::SELECTOR {
                let call = allPairsCall::abi_decode(data, true).map_err(AppError::from)?;
                let index: usize = call.index.to::<usize>();
                let pair = s
                    .pair_list
                    .get(index)
                    .copied()
                    .ok_or_else(|| AppError::reverted("execution reverted"))?;
                return Ok(allPairsCall::abi_encode_returns(&(pair,)).into());
            }
        }

        if let Some(info) = s.pair_info.get(&to) {
            if selector == token0Call::SELECTOR {
                return Ok(token0Call::abi_encode_returns(&(info.token0,)).into());
            }
            if selector == token1Call::SELECTOR {
                return Ok(token1Call::abi_encode_returns(&(info.token1,)).into());
            }
            if selector == getReservesCall::SELECTOR {
                let ret = (U112::from(info.reserve0), U112::from(info.reserve1), 0u32);
                return Ok(getReservesCall::abi_encode_returns(&ret).into());
            }
            if selector == totalSupplyCall::SELECTOR {
                return Ok(totalSupplyCall::abi_encode_returns(&(info.total_supply,)).into());
            }
            if selector == balanceOfCall::SELECTOR {
                let call = balanceOfCall::abi_decode(data, true).map_err(AppError::from)?;
                let bal = info.balances.get(&call.owner).copied().unwrap_or(U256::ZERO);
                return Ok(balanceOfCall::abi_encode_returns(&(bal,)).into());
            }
        }

        if let Some(ret) = s.getters.get(&(to, Bytes::copy_from_slice(data))) {
            return Ok(ret.clone());
        }

        Err(AppError::reverted("execution reverted"))
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn call(&self, _chain_id: u64, to: Address, data: Bytes) -> AppResult<Bytes> {
        if data.get(..4) == Some(&getAmountsOutCall::SELECTOR[..]) {
            if let Ok(call) = getAmountsOutCall::abi_decode(&data, true) {
                let delay = self.state.lock().unwrap().delays.get(&call.amountIn).copied();
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
            }
        }
        self.answer(to, &data)
    }

    async fn balance(&self, _chain_id: u64, _owner: Address) -> AppResult<U256> {
        Ok(units(10, 18))
    }

    async fn gas_price(&self, _chain_id: u64) -> AppResult<U256> {
        Ok(U256::from(1_000_000_000u64))
    }
}

#[async_trait]
impl WalletSigner for MockChain {
    async fn account(&self) -> AppResult<Address> {
        Ok(self.state.lock().unwrap().account)
    }

    async fn chain_id(&self) -> AppResult<u64> {
        Ok(self.state.lock().unwrap().wallet_chain)
    }

    async fn switch_chain(&self, chain_id: u64) -> AppResult<()> {
        let mut s = self.state.lock().unwrap();
        s.events.push("switch_chain".to_string());
        match s.switch_mode {
            SwitchMode::Accept => {
                s.wallet_chain = chain_id;
                Ok(())
            }
            SwitchMode::Reject => Err(AppError::new(ErrorCode::WalletError, "User rejected the request.")),
            SwitchMode::Unsupported => Err(AppError::new(ErrorCode::WalletError, "Unrecognized chain ID")),
        }
    }

    async fn simulate(&self, request: TxRequest) -> AppResult<PreparedTx> {
        let mut s = self.state.lock().unwrap();
        s.events.push("simulate".to_string());
        s.simulated.push(request.clone());
        if let Some(reason) = &s.simulate_error {
            return Err(AppError::reverted(reason.clone()));
        }
        Ok(PreparedTx {
            request,
            gas_limit: Some(250_000),
        })
    }

    async fn write(&self, prepared: PreparedTx) -> AppResult<B256> {
        let request = prepared.request;
        if request.selector() == Some(approveCall::SELECTOR) {
            let call = approveCall::abi_decode(&request.data, true).map_err(AppError::from)?;
            {
                let mut s = self.state.lock().unwrap();
                s.events.push("approve".to_string());
                s.allowances.insert((request.to, request.from, call.spender), call.amount);
            }
            return Ok(self.next_hash(true));
        }

        let delay = self.state.lock().unwrap().write_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        {
            let mut s = self.state.lock().unwrap();
            s.events.push("write".to_string());
            if s.reject_write {
                return Err(AppError::new(ErrorCode::WalletError, "MetaMask Tx Signature: User denied transaction signature."));
            }
            s.written.push(request);
        }
        Ok(self.next_hash(false))
    }
}

#[async_trait]
impl ReceiptPoller for MockChain {
    async fn wait_for_receipt(&self, _chain_id: u64, hash: B256) -> AppResult<TxReceipt> {
        let mut s = self.state.lock().unwrap();
        s.events.push("wait".to_string());
        let status = if s.approval_hashes.contains(&hash) {
            s.approval_succeeds
        } else {
            s.tx_succeeds
        };
        Ok(TxReceipt {
            transaction_hash: hash,
            status,
            block_number: Some(100),
        })
    }
}
