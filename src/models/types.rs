//! Type definitions for the swap engine
//! Value objects shared by quoting, tax detection, slippage and execution

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::utils::constants::{BPS_DENOMINATOR, MAX_SLIPPAGE_PCT};

// ============================================
// Tokens
// ============================================

/// Either the chain's native coin or an ERC-20 contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TokenAddress {
    Native,
    Contract(Address),
}

impl TokenAddress {
    pub fn is_native(&self) -> bool {
        matches!(self, TokenAddress::Native)
    }

    /// Contract address, `None` for native
    pub fn contract(&self) -> Option<Address> {
        match self {
            TokenAddress::Native => None,
            TokenAddress::Contract(addr) => Some(*addr),
        }
    }
}

impl FromStr for TokenAddress {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("native") {
            return Ok(TokenAddress::Native);
        }
        Address::from_str(s)
            .map(TokenAddress::Contract)
            .map_err(|_| AppError::bad_request(format!("Invalid token address: {}", s)))
    }
}

impl TryFrom<String> for TokenAddress {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TokenAddress> for String {
    fn from(value: TokenAddress) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenAddress::Native => write!(f, "native"),
            TokenAddress::Contract(addr) => write!(f, "{}", addr),
        }
    }
}

/// A token on a specific chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRef {
    pub chain_id: u64,
    pub address: TokenAddress,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl TokenRef {
    /// Native coin of a chain (always 18 decimals on supported EVM chains)
    pub fn native(chain_id: u64, symbol: impl Into<String>) -> Self {
        Self {
            chain_id,
            address: TokenAddress::Native,
            symbol: symbol.into(),
            decimals: 18,
            logo: None,
        }
    }

    /// ERC-20 token
    pub fn erc20(chain_id: u64, address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            chain_id,
            address: TokenAddress::Contract(address),
            symbol: symbol.into(),
            decimals,
            logo: None,
        }
    }

    pub fn is_native(&self) -> bool {
        self.address.is_native()
    }

    /// Address used on-chain: native maps to the wrapped-native token
    pub fn resolve(&self, wrapped_native: Option<Address>) -> Option<Address> {
        match self.address {
            TokenAddress::Native => wrapped_native,
            TokenAddress::Contract(addr) => Some(addr),
        }
    }
}

/// Same chain and same address (byte-wise, so hex case never matters)
impl PartialEq for TokenRef {
    fn eq(&self, other: &Self) -> bool {
        self.chain_id == other.chain_id && self.address == other.address
    }
}

impl Eq for TokenRef {}

// ============================================
// Swap paths
// ============================================

/// Shortest valid path (one hop)
pub const MIN_PATH_LEN: usize = 2;
/// Longest path the candidate builder produces (three hops)
pub const MAX_PATH_LEN: usize = 4;

/// Ordered token addresses with no two consecutive entries equal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Address>", into = "Vec<Address>")]
pub struct SwapPath(Vec<Address>);

impl SwapPath {
    /// Validate an explicit path
    pub fn new(tokens: Vec<Address>) -> AppResult<Self> {
        if tokens.len() < MIN_PATH_LEN || tokens.len() > MAX_PATH_LEN {
            return Err(AppError::invalid_path(format!(
                "Path length {} outside {}..={}",
                tokens.len(),
                MIN_PATH_LEN,
                MAX_PATH_LEN
            )));
        }
        if tokens.windows(2).any(|w| w[0] == w[1]) {
            return Err(AppError::invalid_path(
                "Path repeats a token in consecutive positions",
            ));
        }
        Ok(Self(tokens))
    }

    /// Drop consecutive duplicates; `None` when fewer than two tokens remain
    pub fn cleaned(tokens: impl IntoIterator<Item = Address>) -> Option<Self> {
        let mut out: Vec<Address> = Vec::with_capacity(MAX_PATH_LEN);
        for token in tokens {
            if out.last() != Some(&token) {
                out.push(token);
            }
        }
        Self::new(out).ok()
    }

    pub fn tokens(&self) -> &[Address] {
        &self.0
    }

    pub fn hops(&self) -> usize {
        self.0.len() - 1
    }

    pub fn token_in(&self) -> Address {
        self.0[0]
    }

    pub fn token_out(&self) -> Address {
        self.0[self.0.len() - 1]
    }

    /// Lowercase hex joined by `>`; used for dedup and logs
    pub fn key(&self) -> String {
        self.0
            .iter()
            .map(|a| format!("0x{}", hex::encode(a.as_slice())))
            .collect::<Vec<_>>()
            .join(">")
    }
}

impl TryFrom<Vec<Address>> for SwapPath {
    type Error = AppError;

    fn try_from(value: Vec<Address>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SwapPath> for Vec<Address> {
    fn from(value: SwapPath) -> Self {
        value.0
    }
}

// ============================================
// Quotes
// ============================================

/// AMM protocol family of a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    V2,
    V3,
    Wrap,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::V2 => "v2",
            Protocol::V3 => "v3",
            Protocol::Wrap => "wrap",
        }
    }
}

/// How the quoted trade is executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Route {
    /// Constant-product router path
    V2 { path: SwapPath },
    /// Concentrated-liquidity path, one fee tier per hop
    V3 { path: SwapPath, fee_tiers: Vec<u32> },
    /// Native to wrapped-native deposit
    Wrap { wrapped: Address },
    /// Wrapped-native to native withdrawal
    Unwrap { wrapped: Address },
}

/// Best execution found for a request. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub chain_id: u64,
    pub route: Route,
    pub amount_in: U256,
    pub amount_out: U256,
    pub amount_out_min: U256,
}

impl Quote {
    /// Minimum acceptable output: 1 wei when blind, otherwise `out - out*bps/10000`
    pub fn min_out(amount_out: U256, slippage_bps: u32, blind: bool) -> U256 {
        if blind {
            return U256::from(1u8);
        }
        let cut = amount_out.saturating_mul(U256::from(slippage_bps)) / U256::from(BPS_DENOMINATOR);
        amount_out.saturating_sub(cut)
    }

    /// 1:1 wrap or unwrap quote, no slippage applies
    pub fn wrap(chain_id: u64, wrapped: Address, amount: U256, unwrap: bool) -> Self {
        let route = if unwrap {
            Route::Unwrap { wrapped }
        } else {
            Route::Wrap { wrapped }
        };
        Self {
            chain_id,
            route,
            amount_in: amount,
            amount_out: amount,
            amount_out_min: amount,
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self.route {
            Route::V2 { .. } => Protocol::V2,
            Route::V3 { .. } => Protocol::V3,
            Route::Wrap { .. } | Route::Unwrap { .. } => Protocol::Wrap,
        }
    }

    pub fn path(&self) -> Option<&SwapPath> {
        match &self.route {
            Route::V2 { path } | Route::V3 { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn fee_tiers(&self) -> Option<&[u32]> {
        match &self.route {
            Route::V3 { fee_tiers, .. } => Some(fee_tiers),
            _ => None,
        }
    }

    /// Invariants a quote must hold before anything is signed
    pub fn validate(&self) -> AppResult<()> {
        if self.amount_out.is_zero() || self.amount_out_min.is_zero() {
            return Err(AppError::new(ErrorCode::InvalidQuote, "Quote has zero output"));
        }
        if self.amount_out_min > self.amount_out {
            return Err(AppError::new(
                ErrorCode::InvalidQuote,
                "Quote minimum output exceeds expected output",
            ));
        }
        if let Route::V3 { path, fee_tiers } = &self.route {
            if fee_tiers.len() != path.hops() {
                return Err(AppError::new(
                    ErrorCode::InvalidQuote,
                    "V3 quote needs one fee tier per hop",
                ));
            }
        }
        Ok(())
    }
}

// ============================================
// Tax & slippage
// ============================================

/// Outcome of transfer-tax detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "pct", rename_all = "lowercase")]
pub enum TaxReading {
    /// No getter read succeeded
    Unknown,
    /// At least one getter read succeeded; percent in [0, 50]
    Detected(f64),
}

impl TaxReading {
    /// Clamp into [0, 50]; NaN reads as zero
    pub fn detected(pct: f64) -> Self {
        let pct = if pct.is_nan() { 0.0 } else { pct.clamp(0.0, MAX_SLIPPAGE_PCT) };
        TaxReading::Detected(pct)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, TaxReading::Unknown)
    }

    /// Detected and strictly positive
    pub fn confirmed_positive(&self) -> Option<f64> {
        match self {
            TaxReading::Detected(pct) if *pct > 0.0 => Some(*pct),
            _ => None,
        }
    }

    pub fn pct_or_zero(&self) -> f64 {
        match self {
            TaxReading::Detected(pct) => *pct,
            TaxReading::Unknown => 0.0,
        }
    }

    /// Merge the readings of both sides of a trade: highest known tax wins
    pub fn combine(self, other: TaxReading) -> TaxReading {
        match (self, other) {
            (TaxReading::Unknown, TaxReading::Unknown) => TaxReading::Unknown,
            (TaxReading::Detected(a), TaxReading::Unknown)
            | (TaxReading::Unknown, TaxReading::Detected(a)) => TaxReading::Detected(a),
            (TaxReading::Detected(a), TaxReading::Detected(b)) => TaxReading::Detected(a.max(b)),
        }
    }
}

/// User preference for slippage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlippageMode {
    Auto,
    Fixed,
    Custom,
}

// ============================================
// Transaction lifecycle
// ============================================

/// User-initiated action driven by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Swap,
    Wrap,
    Unwrap,
    AddLiquidity,
    RemoveLiquidity,
}

/// Lifecycle stage of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStage {
    Idle,
    ChainCheck,
    Approving,
    Simulating,
    AwaitingSignature,
    Submitted,
    Confirming,
    Succeeded,
    Reverted,
    Failed,
}

impl TxStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStage::Succeeded | TxStage::Reverted | TxStage::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxStage::Idle => "IDLE",
            TxStage::ChainCheck => "CHAIN_CHECK",
            TxStage::Approving => "APPROVING",
            TxStage::Simulating => "SIMULATING",
            TxStage::AwaitingSignature => "AWAITING_SIGNATURE",
            TxStage::Submitted => "SUBMITTED",
            TxStage::Confirming => "CONFIRMING",
            TxStage::Succeeded => "SUCCEEDED",
            TxStage::Reverted => "REVERTED",
            TxStage::Failed => "FAILED",
        }
    }
}

/// Why a lifecycle ended in `Failed`
#[derive(Debug, Clone, Serialize)]
pub struct TxFailure {
    pub code: ErrorCode,
    pub message: String,
}

/// One transaction attempt from trigger to terminal stage
#[derive(Debug, Clone, Serialize)]
pub struct TxLifecycle {
    pub id: Uuid,
    pub action: ActionKind,
    pub chain_id: u64,
    pub stages: Vec<TxStage>,
    pub failure: Option<TxFailure>,
    pub approval_hashes: Vec<B256>,
    pub tx_hash: Option<B256>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TxLifecycle {
    pub fn new(action: ActionKind, chain_id: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            chain_id,
            stages: vec![TxStage::Idle],
            failure: None,
            approval_hashes: Vec::new(),
            tx_hash: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Current stage
    pub fn stage(&self) -> TxStage {
        self.stages.last().copied().unwrap_or(TxStage::Idle)
    }

    pub fn is_success(&self) -> bool {
        self.stage() == TxStage::Succeeded
    }

    pub fn failure_code(&self) -> Option<ErrorCode> {
        self.failure.as_ref().map(|f| f.code)
    }

    pub(crate) fn push(&mut self, stage: TxStage) {
        self.stages.push(stage);
        if stage.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
    }

    pub(crate) fn fail(&mut self, err: &AppError) {
        self.failure = Some(TxFailure {
            code: err.code,
            message: err.humanized(),
        });
        self.push(TxStage::Failed);
    }
}

// ============================================
// Liquidity positions
// ============================================

/// User LP position, recomputed from chain reads on every refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub chain_id: u64,
    pub pair: Address,
    pub token_a: Address,
    pub token_b: Address,
    /// `reserve_a * lp_shares / total_supply`
    pub amount_a: U256,
    /// `reserve_b * lp_shares / total_supply`
    pub amount_b: U256,
    pub lp_shares: U256,
    pub total_supply: U256,
    pub refreshed_at: DateTime<Utc>,
}

impl Position {
    /// Share of the pool in percent
    pub fn share_pct(&self) -> f64 {
        if self.total_supply.is_zero() {
            return 0.0;
        }
        let bps = self.lp_shares.saturating_mul(U256::from(1_000_000u64)) / self.total_supply;
        let bps: u64 = bps.try_into().unwrap_or(u64::MAX);
        bps as f64 / 10_000.0
    }

    pub fn is_empty(&self) -> bool {
        self.lp_shares.is_zero()
    }
}
