//! Chain & Wallet Collaborator Interfaces
//!
//! The engine never talks to a node or a wallet directly. It goes through
//! three object-safe traits:
//! - [`ChainReader`]: read-only `eth_call`, balances, gas price, batched calls
//! - [`WalletSigner`]: active account/chain, chain switch, simulate, sign+broadcast
//! - [`ReceiptPoller`]: wait for a transaction receipt
//!
//! `RpcProvider` / `RpcManager` implement the read side over JSON-RPC.
//! Signing is always supplied by the embedding application.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::errors::{AppError, AppResult};
use crate::utils::abi::encode;

// ============================================
// Request / receipt types
// ============================================

/// Transaction the engine wants signed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRequest {
    pub chain_id: u64,
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl TxRequest {
    pub fn new(chain_id: u64, from: Address, to: Address, data: Bytes) -> Self {
        Self {
            chain_id,
            from,
            to,
            data,
            value: U256::ZERO,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// First four bytes of calldata
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).map(|s| [s[0], s[1], s[2], s[3]])
    }
}

/// Request returned by a successful dry run, ready to sign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedTx {
    pub request: TxRequest,
    pub gas_limit: Option<u64>,
}

impl PreparedTx {
    /// Skip simulation (used for approvals)
    pub fn unsimulated(request: TxRequest) -> Self {
        Self {
            request,
            gas_limit: None,
        }
    }
}

/// Mined transaction outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    /// `true` when the transaction executed successfully
    pub status: bool,
    pub block_number: Option<u64>,
}

// ============================================
// Collaborator traits
// ============================================

/// Read-only chain access
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// `eth_call` against latest state; a revert is an error
    async fn call(&self, chain_id: u64, to: Address, data: Bytes) -> AppResult<Bytes>;

    /// Batched calls with per-item results
    async fn call_many(&self, chain_id: u64, calls: Vec<(Address, Bytes)>) -> Vec<AppResult<Bytes>> {
        let mut out = Vec::with_capacity(calls.len());
        for (to, data) in calls {
            out.push(self.call(chain_id, to, data).await);
        }
        out
    }

    /// Native balance
    async fn balance(&self, chain_id: u64, owner: Address) -> AppResult<U256>;

    async fn gas_price(&self, chain_id: u64) -> AppResult<U256>;
}

/// Wallet signing capability
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Connected account
    async fn account(&self) -> AppResult<Address>;

    /// Chain the wallet is currently on
    async fn chain_id(&self) -> AppResult<u64>;

    /// Ask the wallet to switch network
    async fn switch_chain(&self, chain_id: u64) -> AppResult<()>;

    /// Dry run of the exact request; reverts come back as errors
    async fn simulate(&self, request: TxRequest) -> AppResult<PreparedTx>;

    /// Sign and broadcast; returns the transaction hash
    async fn write(&self, prepared: PreparedTx) -> AppResult<B256>;
}

/// Receipt confirmation
#[async_trait]
pub trait ReceiptPoller: Send + Sync {
    async fn wait_for_receipt(&self, chain_id: u64, hash: B256) -> AppResult<TxReceipt>;
}

// ============================================
// Typed read helpers
// ============================================

/// Encode `call`, run it, decode its return struct
pub async fn read_call<C>(
    reader: &dyn ChainReader,
    chain_id: u64,
    to: Address,
    call: &C,
) -> AppResult<C::Return>
where
    C: SolCall + Send + Sync,
{
    let ret = reader.call(chain_id, to, encode(call)).await?;
    C::abi_decode_returns(&ret, false).map_err(AppError::from)
}

/// Decode one item of a `call_many` batch
pub fn decode_result<C: SolCall>(result: &AppResult<Bytes>) -> Option<C::Return> {
    match result {
        Ok(ret) => C::abi_decode_returns(ret, false).ok(),
        Err(_) => None,
    }
}
