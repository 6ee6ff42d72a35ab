//! API Request/Response Types

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::core::slippage::ResolvedSlippage;
use crate::models::config::ChainConfig;
use crate::models::errors::AppError;
use crate::models::types::{Quote, SlippageMode, TaxReading, TokenAddress};

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "API_BAD_REQUEST".to_string(),
            message: message.into(),
            details: None,
        }
    }
}

impl From<&AppError> for ApiError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.humanized(),
            details: None,
        }
    }
}

// ============================================
// Health Check
// ============================================

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub chains: usize,
    pub tax_cache_entries: usize,
    pub tax_cache_hit_rate: f64,
}

// ============================================
// Chains
// ============================================

#[derive(Debug, Serialize)]
pub struct ChainSummary {
    pub chain_id: u64,
    pub name: String,
    pub native_symbol: String,
    pub testnet: bool,
    pub wrapped_native: Option<Address>,
    pub has_router_v2: bool,
    pub has_quoter_v3: bool,
    pub fee_tiers: Vec<u32>,
}

impl From<&ChainConfig> for ChainSummary {
    fn from(cfg: &ChainConfig) -> Self {
        Self {
            chain_id: cfg.chain_id,
            name: cfg.name.clone(),
            native_symbol: cfg.native_symbol.clone(),
            testnet: cfg.testnet,
            wrapped_native: cfg.wrapped_native,
            has_router_v2: cfg.router_v2.is_some(),
            has_quoter_v3: cfg.quoter_v3.is_some(),
            fee_tiers: cfg.effective_fee_tiers(),
        }
    }
}

// ============================================
// Quote
// ============================================

/// One side of a quote request
#[derive(Debug, Deserialize)]
pub struct TokenInput {
    /// `"native"` or a contract address
    pub address: TokenAddress,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    #[serde(default)]
    pub symbol: Option<String>,
}

fn default_decimals() -> u8 {
    18
}

fn default_slippage_mode() -> SlippageMode {
    SlippageMode::Auto
}

#[derive(Debug, Deserialize)]
pub struct QuoteApiRequest {
    pub chain_id: u64,
    pub token_in: TokenInput,
    pub token_out: TokenInput,
    pub amount: String,
    #[serde(default = "default_slippage_mode")]
    pub slippage_mode: SlippageMode,
    #[serde(default)]
    pub slippage_pct: f64,
}

#[derive(Debug, Serialize)]
pub struct QuoteData {
    pub quote: Quote,
    pub protocol: String,
    pub amount_out_formatted: String,
    pub amount_out_min_formatted: String,
    pub slippage: ResolvedSlippage,
    /// Set when a manual slippage is below the token tax
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slippage_warning: Option<String>,
}

// ============================================
// Tax
// ============================================

#[derive(Debug, Serialize)]
pub struct TaxData {
    pub chain_id: u64,
    pub token: Address,
    pub reading: TaxReading,
}

// ============================================
// Slippage
// ============================================

#[derive(Debug, Deserialize)]
pub struct SlippageResolveRequest {
    pub mode: SlippageMode,
    #[serde(default)]
    pub user_pct: f64,
    pub tax: TaxReading,
}

#[derive(Debug, Serialize)]
pub struct SlippageResolveData {
    pub resolved: ResolvedSlippage,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

// ============================================
// Cross-chain
// ============================================

#[derive(Debug, Deserialize)]
pub struct CrossEstimateRequest {
    pub src_chain_id: u64,
    pub dst_chain_id: u64,
    pub token_out: Address,
    /// Native amount on the source chain, decimal string
    pub amount: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

#[derive(Debug, Serialize)]
pub struct CrossEstimateData {
    pub src_chain_id: u64,
    pub dst_chain_id: u64,
    pub token_out: Address,
    pub amount_in: U256,
    pub amount_out: U256,
    pub fee_tier: Option<u32>,
    pub executable: bool,
}
