//! RPC Client Module - Multi-Chain JSON-RPC Integration
//!
//! 1. Per-chain URL from `<CHAIN>_HTTP_URL`, falling back to public RPCs
//! 2. Exponential backoff retry with jitter
//! 3. User-Agent header & API key masking in logs
//! 4. Gzip compression for large responses
//! 5. Batch requests (max 50 per batch) backing `ChainReader::call_many`
//! 6. Reverts are terminal: never retried, never sent to the fallback

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::providers::client::{ChainReader, ReceiptPoller, TxReceipt};
use crate::utils::constants::{
    get_chain_name, get_public_rpc_fallback, get_rpc_env_key, DEFAULT_RECEIPT_POLL_MS,
    DEFAULT_RECEIPT_TIMEOUT_SECS, DEFAULT_RPC_TIMEOUT_SECS, SUPPORTED_CHAIN_IDS,
    USER_AGENT as USER_AGENT_CONST,
};

// ============================================
// RETRY CONSTANTS
// ============================================

/// Maximum batch size
pub const MAX_BATCH_SIZE: usize = 50;

/// Base retry delay in milliseconds
pub const BASE_RETRY_MS: u64 = 250;

/// Maximum retry delay in milliseconds
pub const MAX_RETRY_MS: u64 = 4_000;

/// Maximum attempts per endpoint (250ms→500ms→1s)
pub const MAX_RETRIES: u32 = 4;

/// Jitter percentage for retry delay
pub const RETRY_JITTER_PERCENT: u64 = 20;

/// JSON-RPC error code used by geth-style nodes for reverts
const REVERT_ERROR_CODE: i64 = 3;

/// Backoff delay for a retry attempt (attempt >= 1)
fn retry_delay_ms(attempt: u32) -> u64 {
    let base_delay = BASE_RETRY_MS.saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)));
    let capped_delay = base_delay.min(MAX_RETRY_MS);
    let jitter_range = (capped_delay * RETRY_JITTER_PERCENT) / 100;
    let jitter: i64 =
        rand::thread_rng().gen_range(-(jitter_range as i64)..=(jitter_range as i64));
    (capped_delay as i64 + jitter).max(50) as u64
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
    #[serde(default)]
    id: serde_json::Value,
}

/// JSON-RPC error structure
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    /// Rate limit (HTTP 429 surfaced as code -32005)
    pub fn is_rate_limit(&self) -> bool {
        self.code == -32005 || self.message.to_lowercase().contains("rate limit")
    }

    /// Contract execution reverted
    pub fn is_revert(&self) -> bool {
        self.code == REVERT_ERROR_CODE || self.message.to_lowercase().contains("revert")
    }

    pub fn is_method_not_found(&self) -> bool {
        self.code == -32601
    }

    fn into_app_error(self) -> AppError {
        if self.is_revert() {
            let detail = match &self.data {
                Some(serde_json::Value::String(data)) => format!("{} ({})", self.message, data),
                _ => self.message.clone(),
            };
            AppError::reverted(detail)
        } else if self.is_rate_limit() {
            AppError::rpc_rate_limited()
        } else {
            AppError::new(
                ErrorCode::RpcError,
                format!("RPC error: {} (code: {})", self.message, self.code),
            )
        }
    }
}

/// Receipt as returned by `eth_getTransactionReceipt`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: B256,
    status: Option<String>,
    block_number: Option<String>,
}

fn parse_hex_u256(s: &str) -> AppResult<U256> {
    let digits = s.trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).map_err(|_| {
        AppError::new(ErrorCode::RpcInvalidResponse, format!("Invalid hex quantity: {}", s))
    })
}

fn parse_hex_bytes(s: &str) -> AppResult<Bytes> {
    s.parse::<Bytes>().map_err(|_| {
        AppError::new(ErrorCode::RpcInvalidResponse, format!("Invalid hex data: {}", s))
    })
}

/// RPC Provider with retry logic and fallback support
#[derive(Clone)]
pub struct RpcProvider {
    /// Primary RPC URL (env override or public)
    primary_url: String,
    /// Fallback RPC URL (public), absent when equal to primary
    fallback_url: Option<String>,
    /// HTTP client with custom headers (gzip enabled)
    client: reqwest::Client,
    chain_id: u64,
    /// Network name for logging
    network_name: String,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

impl RpcProvider {
    /// Provider for a built-in chain
    pub fn new(chain_id: u64) -> AppResult<Self> {
        let fallback = get_public_rpc_fallback(chain_id).map(String::from);
        let primary = get_rpc_env_key(chain_id)
            .and_then(|key| std::env::var(key).ok())
            .filter(|url| !url.is_empty())
            .or_else(|| fallback.clone())
            .ok_or_else(|| AppError::unsupported_chain(chain_id))?;
        Self::with_urls(chain_id, primary, fallback)
    }

    /// Provider with explicit endpoints
    pub fn with_urls(
        chain_id: u64,
        primary_url: impl Into<String>,
        fallback_url: Option<String>,
    ) -> AppResult<Self> {
        let primary_url = primary_url.into();
        let fallback_url = fallback_url.filter(|f| *f != primary_url);
        Ok(Self {
            primary_url,
            fallback_url,
            client: Self::build_client()?,
            chain_id,
            network_name: get_chain_name(chain_id).to_string(),
            receipt_poll_interval: Duration::from_millis(DEFAULT_RECEIPT_POLL_MS),
            receipt_timeout: Duration::from_secs(DEFAULT_RECEIPT_TIMEOUT_SECS),
        })
    }

    /// Override receipt polling cadence
    pub fn with_receipt_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.receipt_poll_interval = interval;
        self.receipt_timeout = timeout;
        self
    }

    /// Build HTTP client with custom headers (gzip compression)
    fn build_client() -> AppResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .map_err(|e| {
                AppError::new(
                    ErrorCode::RpcConnectionFailed,
                    format!("Failed to build HTTP client: {}", e),
                )
            })
    }

    /// Execute JSON-RPC call with retry logic and fallback
    pub async fn request<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> AppResult<T> {
        self.request_optional(method, params).await?.ok_or_else(|| {
            AppError::new(ErrorCode::RpcInvalidResponse, "No result in response")
        })
    }

    /// Like [`request`](Self::request) but a `null` result is `Ok(None)`
    pub async fn request_optional<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> AppResult<Option<T>> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let primary_err = match self.call_with_retry(&self.primary_url, &payload).await {
            Ok(result) => return Ok(result),
            Err(e) if e.code == ErrorCode::ContractReverted => return Err(e),
            Err(e) => {
                warn!("⚠️ Primary RPC failed on {}: {}", self.network_name, e);
                e
            }
        };

        if let Some(ref fallback) = self.fallback_url {
            info!("🔄 Trying fallback RPC for {}", self.network_name);
            match self.call_with_retry(fallback, &payload).await {
                Ok(result) => return Ok(result),
                Err(e) if e.code == ErrorCode::ContractReverted => return Err(e),
                Err(e) => warn!("⚠️ Fallback RPC also failed: {}", e),
            }
        }

        Err(AppError::new(
            ErrorCode::RpcNoEndpoints,
            format!(
                "All RPC endpoints failed for {}: {}",
                self.network_name, primary_err.message
            ),
        ))
    }

    /// Execute call with exponential backoff and jitter
    async fn call_with_retry<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> AppResult<Option<T>> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = retry_delay_ms(attempt);
                debug!("⏳ Retry {}/{} after {}ms", attempt + 1, MAX_RETRIES, delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.execute_call::<T>(url, payload).await {
                Ok(result) => return Ok(result),
                Err(e) if e.code == ErrorCode::ContractReverted => return Err(e),
                Err(e) => {
                    if e.code == ErrorCode::RpcRateLimited {
                        warn!(
                            "⏳ Rate limited, backing off (attempt {}/{})",
                            attempt + 1,
                            MAX_RETRIES
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::new(ErrorCode::RpcError, format!("Failed after {} retries", MAX_RETRIES))
        }))
    }

    /// Execute single RPC call
    async fn execute_call<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> AppResult<Option<T>> {
        let response = self.client.post(url).json(payload).send().await?;

        let status = response.status();
        if status == 429 {
            return Err(AppError::rpc_rate_limited());
        }
        if !status.is_success() {
            return Err(AppError::new(
                ErrorCode::RpcError,
                format!("HTTP error: {}", status),
            ));
        }

        let json: RpcResponse<T> = response.json().await?;
        if let Some(error) = json.error {
            return Err(error.into_app_error());
        }
        Ok(json.result)
    }

    /// Execute eth_call against latest state
    pub async fn eth_call(&self, to: Address, data: &Bytes) -> AppResult<Bytes> {
        let params = serde_json::json!([{ "to": to, "data": data }, "latest"]);
        let hex: String = self.request("eth_call", params).await?;
        parse_hex_bytes(&hex)
    }

    pub async fn get_balance(&self, owner: Address) -> AppResult<U256> {
        let hex: String = self
            .request("eth_getBalance", serde_json::json!([owner, "latest"]))
            .await?;
        parse_hex_u256(&hex)
    }

    pub async fn get_gas_price(&self) -> AppResult<U256> {
        let hex: String = self.request("eth_gasPrice", serde_json::json!([])).await?;
        parse_hex_u256(&hex)
    }

    /// `None` while the transaction is pending
    pub async fn get_transaction_receipt(&self, hash: B256) -> AppResult<Option<TxReceipt>> {
        let receipt: Option<RpcReceipt> = self
            .request_optional("eth_getTransactionReceipt", serde_json::json!([hash]))
            .await?;

        match receipt {
            None => Ok(None),
            Some(r) => {
                let status = match r.status.as_deref() {
                    Some(s) => !parse_hex_u256(s)?.is_zero(),
                    None => false,
                };
                let block_number = match r.block_number.as_deref() {
                    Some(b) => parse_hex_u256(b)?.try_into().ok(),
                    None => None,
                };
                Ok(Some(TxReceipt {
                    transaction_hash: r.transaction_hash,
                    status,
                    block_number,
                }))
            }
        }
    }

    /// Get RPC URL (masked for logging)
    pub fn masked_url(&self) -> String {
        for marker in ["/v2/", "/v3/"] {
            if let Some((base, _key)) = self.primary_url.split_once(marker) {
                return format!("{}{}***HIDDEN***", base, marker);
            }
        }
        self.primary_url.clone()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn ensure_chain(&self, chain_id: u64) -> AppResult<()> {
        if chain_id != self.chain_id {
            return Err(AppError::unsupported_chain(chain_id));
        }
        Ok(())
    }

    // ============================================
    // BATCH REQUESTS
    // ============================================

    /// Execute batch JSON-RPC calls (max 50 per batch), results in request order
    pub async fn batch_call<T: for<'de> Deserialize<'de>>(
        &self,
        requests: Vec<(&str, serde_json::Value)>,
    ) -> AppResult<Vec<AppResult<T>>> {
        if requests.is_empty() {
            return Ok(vec![]);
        }

        let mut all_results = Vec::with_capacity(requests.len());
        for chunk in requests.chunks(MAX_BATCH_SIZE) {
            let batch_payload: Vec<serde_json::Value> = chunk
                .iter()
                .enumerate()
                .map(|(idx, (method, params))| {
                    serde_json::json!({
                        "jsonrpc": "2.0",
                        "method": method,
                        "params": params,
                        "id": idx
                    })
                })
                .collect();

            all_results.extend(self.execute_batch::<T>(&batch_payload).await?);
        }

        Ok(all_results)
    }

    /// Execute batch request with retry
    async fn execute_batch<T: for<'de> Deserialize<'de>>(
        &self,
        batch_payload: &[serde_json::Value],
    ) -> AppResult<Vec<AppResult<T>>> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(retry_delay_ms(attempt))).await;
            }

            let resp = match self.client.post(&self.primary_url).json(batch_payload).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(AppError::from(e));
                    continue;
                }
            };

            let status = resp.status();
            if status == 429 {
                last_error = Some(AppError::rpc_rate_limited());
                continue;
            }
            if !status.is_success() {
                last_error = Some(AppError::new(
                    ErrorCode::RpcError,
                    format!("HTTP error: {}", status),
                ));
                continue;
            }

            let items: Vec<RpcResponse<T>> = resp.json().await?;

            // Responses may arrive in any order; slot them by id
            let mut slots: Vec<Option<AppResult<T>>> =
                (0..batch_payload.len()).map(|_| None).collect();
            for item in items {
                let Some(idx) = item.id.as_u64().map(|i| i as usize) else {
                    continue;
                };
                if idx >= slots.len() {
                    continue;
                }
                slots[idx] = Some(match (item.error, item.result) {
                    (Some(error), _) => Err(error.into_app_error()),
                    (None, Some(result)) => Ok(result),
                    (None, None) => Err(AppError::new(
                        ErrorCode::RpcInvalidResponse,
                        format!("No result in response for id {}", idx),
                    )),
                });
            }

            return Ok(slots
                .into_iter()
                .map(|slot| {
                    slot.unwrap_or_else(|| {
                        Err(AppError::new(
                            ErrorCode::RpcInvalidResponse,
                            "Missing item in batch response",
                        ))
                    })
                })
                .collect());
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::new(
                ErrorCode::RpcError,
                format!("Batch request failed after {} retries", MAX_RETRIES),
            )
        }))
    }
}

#[async_trait]
impl ChainReader for RpcProvider {
    async fn call(&self, chain_id: u64, to: Address, data: Bytes) -> AppResult<Bytes> {
        self.ensure_chain(chain_id)?;
        self.eth_call(to, &data).await
    }

    async fn call_many(&self, chain_id: u64, calls: Vec<(Address, Bytes)>) -> Vec<AppResult<Bytes>> {
        if let Err(e) = self.ensure_chain(chain_id) {
            return calls.iter().map(|_| Err(AppError::new(e.code, e.message.clone()))).collect();
        }
        let requests: Vec<(&str, serde_json::Value)> = calls
            .iter()
            .map(|(to, data)| {
                ("eth_call", serde_json::json!([{ "to": to, "data": data }, "latest"]))
            })
            .collect();

        match self.batch_call::<String>(requests).await {
            Ok(results) => results
                .into_iter()
                .map(|r| r.and_then(|hex| parse_hex_bytes(&hex)))
                .collect(),
            Err(e) => {
                warn!("⚠️ Batch eth_call failed on {}, falling back to sequential: {}", self.network_name, e);
                let mut out = Vec::with_capacity(calls.len());
                for (to, data) in calls {
                    out.push(self.eth_call(to, &data).await);
                }
                out
            }
        }
    }

    async fn balance(&self, chain_id: u64, owner: Address) -> AppResult<U256> {
        self.ensure_chain(chain_id)?;
        self.get_balance(owner).await
    }

    async fn gas_price(&self, chain_id: u64) -> AppResult<U256> {
        self.ensure_chain(chain_id)?;
        self.get_gas_price().await
    }
}

#[async_trait]
impl ReceiptPoller for RpcProvider {
    async fn wait_for_receipt(&self, chain_id: u64, hash: B256) -> AppResult<TxReceipt> {
        self.ensure_chain(chain_id)?;
        let started = Instant::now();
        loop {
            match self.get_transaction_receipt(hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => debug!("⏳ Receipt pending for {}", hash),
                Err(e) if e.code.is_retryable() => debug!("⏳ Receipt poll error: {}", e),
                Err(e) => return Err(e),
            }
            if started.elapsed() >= self.receipt_timeout {
                return Err(AppError::new(
                    ErrorCode::TxReceiptTimeout,
                    format!("No receipt for {} after {:?}", hash, self.receipt_timeout),
                ));
            }
            tokio::time::sleep(self.receipt_poll_interval).await;
        }
    }
}

/// Multi-chain RPC manager
pub struct RpcManager {
    providers: HashMap<u64, RpcProvider>,
}

impl RpcManager {
    /// Create manager with all built-in chains
    pub fn new() -> Self {
        let mut providers = HashMap::new();

        for chain_id in SUPPORTED_CHAIN_IDS {
            match RpcProvider::new(chain_id) {
                Ok(provider) => {
                    info!("✅ Initialized RPC for chain {} ({})", chain_id, provider.masked_url());
                    providers.insert(chain_id, provider);
                }
                Err(e) => {
                    warn!("⚠️ Failed to initialize RPC for chain {}: {}", chain_id, e);
                }
            }
        }

        Self { providers }
    }

    /// Manager over an explicit set of providers
    pub fn from_providers(list: impl IntoIterator<Item = RpcProvider>) -> Self {
        Self {
            providers: list.into_iter().map(|p| (p.chain_id(), p)).collect(),
        }
    }

    /// Apply receipt polling settings to every provider
    pub fn with_receipt_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.providers = self
            .providers
            .into_iter()
            .map(|(id, p)| (id, p.with_receipt_polling(interval, timeout)))
            .collect();
        self
    }

    pub fn get(&self, chain_id: u64) -> Option<&RpcProvider> {
        self.providers.get(&chain_id)
    }

    fn require(&self, chain_id: u64) -> AppResult<&RpcProvider> {
        self.get(chain_id)
            .ok_or_else(|| AppError::unsupported_chain(chain_id))
    }

    pub fn is_supported(&self, chain_id: u64) -> bool {
        self.providers.contains_key(&chain_id)
    }
}

impl Default for RpcManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainReader for RpcManager {
    async fn call(&self, chain_id: u64, to: Address, data: Bytes) -> AppResult<Bytes> {
        self.require(chain_id)?.call(chain_id, to, data).await
    }

    async fn call_many(&self, chain_id: u64, calls: Vec<(Address, Bytes)>) -> Vec<AppResult<Bytes>> {
        match self.require(chain_id) {
            Ok(provider) => provider.call_many(chain_id, calls).await,
            Err(_) => calls
                .iter()
                .map(|_| Err(AppError::unsupported_chain(chain_id)))
                .collect(),
        }
    }

    async fn balance(&self, chain_id: u64, owner: Address) -> AppResult<U256> {
        self.require(chain_id)?.balance(chain_id, owner).await
    }

    async fn gas_price(&self, chain_id: u64) -> AppResult<U256> {
        self.require(chain_id)?.gas_price(chain_id).await
    }
}

#[async_trait]
impl ReceiptPoller for RpcManager {
    async fn wait_for_receipt(&self, chain_id: u64, hash: B256) -> AppResult<TxReceipt> {
        self.require(chain_id)?.wait_for_receipt(chain_id, hash).await
    }
}
