//! Centralized Error Handling Module
//!
//! Every failure carries a unique, stable error code so the caller can tell
//! a configuration gap ("we never supported this") from missing liquidity
//! ("no pool right now") from a user decision ("rejected in wallet").
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - RPC_xxx: RPC / contract read errors
//! - CFG_xxx: Configuration errors
//! - QUOTE_xxx / ROUTE_xxx: Quoting errors
//! - SIM_xxx: Simulation errors
//! - WALLET_xxx: Wallet interaction errors
//! - TX_xxx: Transaction lifecycle errors
//! - API_xxx: HTTP API errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// No usable route: either no liquidity or no router at all
    pub fn is_no_route(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::RouteNotAvailable | ErrorCode::RouterNotConfigured
        )
    }

    /// Missing deployment data for the chain (as opposed to missing liquidity)
    pub fn is_config_gap(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ConfigUnsupportedChain
                | ErrorCode::ConfigMissingContract
                | ErrorCode::RouterNotConfigured
        )
    }

    /// The user declined in the wallet (coded or reported in the raw message)
    pub fn is_user_rejection(&self) -> bool {
        if self.code == ErrorCode::WalletUserRejected {
            return true;
        }
        let msg = self.message.to_lowercase();
        msg.contains("user rejected") || msg.contains("user denied") || msg.contains("rejected the request")
    }

    /// Message suitable for end users.
    ///
    /// Codes raised by this crate already carry a curated message; raw
    /// wallet/RPC failures are mapped through [`humanize_message`].
    pub fn humanized(&self) -> String {
        match self.code {
            ErrorCode::RpcError
            | ErrorCode::ContractReverted
            | ErrorCode::WalletError
            | ErrorCode::SimulationReverted
            | ErrorCode::Unknown => humanize_message(&self.message),
            _ => self.message.clone(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // ============================================
    // RPC Errors
    // ============================================
    /// RPC connection failed
    RpcConnectionFailed,
    /// RPC request timeout
    RpcTimeout,
    /// RPC rate limited (HTTP 429)
    RpcRateLimited,
    /// RPC returned error response
    RpcError,
    /// No RPC endpoints available
    RpcNoEndpoints,
    /// Invalid RPC response (undecodable return data)
    RpcInvalidResponse,
    /// eth_call reverted
    ContractReverted,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,
    /// Unsupported chain ID
    ConfigUnsupportedChain,
    /// Contract (wrapped native, quoter, factory...) not set for chain
    ConfigMissingContract,
    /// Chain registered twice
    ConfigDuplicateChain,
    /// No V2 router configured for chain
    RouterNotConfigured,

    // ============================================
    // Quote Errors
    // ============================================
    /// Amount is not a positive decimal for the token precision
    QuoteInvalidAmount,
    /// Input and output token are the same
    QuoteSameToken,
    /// Router configured but no candidate path produced output
    RouteNotAvailable,
    /// Malformed swap path
    InvalidPath,
    /// Quote violates its invariants (zero output, min > out)
    InvalidQuote,

    // ============================================
    // Slippage Errors
    // ============================================
    /// Slippage below detected token tax
    SlippageTooSmall,

    // ============================================
    // Simulation Errors
    // ============================================
    /// Simulation failed on a minimum-output check
    SimulationMinOutput,
    /// Simulation reverted (generic)
    SimulationReverted,

    // ============================================
    // Wallet Errors
    // ============================================
    /// User rejected the request in the wallet
    WalletUserRejected,
    /// Wallet is on a different chain and could not be switched
    WalletWrongNetwork,
    /// Other wallet failure
    WalletError,

    // ============================================
    // Transaction Lifecycle Errors
    // ============================================
    /// Another transaction is already in flight
    TxBusy,
    /// Approval transaction reverted
    TxApprovalFailed,
    /// Receipt did not arrive in time
    TxReceiptTimeout,
    /// Cross-chain execution requested
    CrossChainUnsupported,

    // ============================================
    // API Errors
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Resource not found
    ApiNotFound,
    /// Internal server error
    ApiInternalError,

    // ============================================
    // Generic Errors
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RpcConnectionFailed => "RPC_CONNECTION_FAILED",
            Self::RpcTimeout => "RPC_TIMEOUT",
            Self::RpcRateLimited => "RPC_RATE_LIMITED",
            Self::RpcError => "RPC_ERROR",
            Self::RpcNoEndpoints => "RPC_NO_ENDPOINTS",
            Self::RpcInvalidResponse => "RPC_INVALID_RESPONSE",
            Self::ContractReverted => "CONTRACT_REVERTED",

            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",
            Self::ConfigUnsupportedChain => "CFG_UNSUPPORTED_CHAIN",
            Self::ConfigMissingContract => "CFG_MISSING_CONTRACT",
            Self::ConfigDuplicateChain => "CFG_DUPLICATE_CHAIN",
            Self::RouterNotConfigured => "ROUTER_NOT_CONFIGURED",

            Self::QuoteInvalidAmount => "QUOTE_INVALID_AMOUNT",
            Self::QuoteSameToken => "QUOTE_SAME_TOKEN",
            Self::RouteNotAvailable => "ROUTE_NOT_AVAILABLE",
            Self::InvalidPath => "QUOTE_INVALID_PATH",
            Self::InvalidQuote => "QUOTE_INVALID",

            Self::SlippageTooSmall => "SLIPPAGE_TOO_SMALL",

            Self::SimulationMinOutput => "SIM_MIN_OUTPUT",
            Self::SimulationReverted => "SIM_REVERTED",

            Self::WalletUserRejected => "WALLET_USER_REJECTED",
            Self::WalletWrongNetwork => "WALLET_WRONG_NETWORK",
            Self::WalletError => "WALLET_ERROR",

            Self::TxBusy => "TX_BUSY",
            Self::TxApprovalFailed => "TX_APPROVAL_FAILED",
            Self::TxReceiptTimeout => "TX_RECEIPT_TIMEOUT",
            Self::CrossChainUnsupported => "CROSS_CHAIN_UNSUPPORTED",

            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiNotFound => "API_NOT_FOUND",
            Self::ApiInternalError => "API_INTERNAL_ERROR",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ApiBadRequest
            | Self::ConfigInvalidValue
            | Self::QuoteInvalidAmount
            | Self::QuoteSameToken
            | Self::InvalidPath
            | Self::SlippageTooSmall => 400,
            Self::ApiNotFound | Self::ConfigUnsupportedChain => 404,
            Self::RouteNotAvailable | Self::RouterNotConfigured | Self::ConfigMissingContract => {
                422
            }
            Self::CrossChainUnsupported => 501,
            Self::RpcRateLimited => 429,
            Self::RpcConnectionFailed | Self::RpcTimeout | Self::RpcNoEndpoints => 502,
            _ => 500,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RpcTimeout
                | Self::RpcRateLimited
                | Self::RpcConnectionFailed
                | Self::RpcNoEndpoints
                | Self::TxReceiptTimeout
        )
    }
}

impl serde::Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// RPC connection failed
    pub fn rpc_connection_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcConnectionFailed, msg)
    }

    /// RPC timeout
    pub fn rpc_timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcTimeout, msg)
    }

    /// RPC rate limited
    pub fn rpc_rate_limited() -> Self {
        Self::new(ErrorCode::RpcRateLimited, "Rate limited (HTTP 429)")
    }

    /// Contract call reverted
    pub fn reverted(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ContractReverted, msg)
    }

    /// Unsupported chain
    pub fn unsupported_chain(chain_id: u64) -> Self {
        Self::new(
            ErrorCode::ConfigUnsupportedChain,
            format!("Unsupported chain_id: {}", chain_id),
        )
    }

    /// Contract address missing from the chain table
    pub fn missing_contract(what: &str, chain_id: u64) -> Self {
        Self::new(
            ErrorCode::ConfigMissingContract,
            format!("{} not configured for chain {}", what, chain_id),
        )
    }

    /// V2 router missing
    pub fn router_not_configured(chain_id: u64) -> Self {
        Self::new(
            ErrorCode::RouterNotConfigured,
            format!("Router V2 not configured for chain {}", chain_id),
        )
    }

    /// Router present, liquidity absent
    pub fn route_not_available() -> Self {
        Self::new(ErrorCode::RouteNotAvailable, "Route not available")
    }

    /// Invalid amount
    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::QuoteInvalidAmount, msg)
    }

    /// Invalid path
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPath, msg)
    }

    /// Slippage below token tax
    pub fn slippage_too_small(needed_pct: f64) -> Self {
        Self::new(
            ErrorCode::SlippageTooSmall,
            format!("Slippage too small for token tax {:.2}%.", needed_pct),
        )
    }

    /// User rejected in wallet
    pub fn user_rejected() -> Self {
        Self::new(
            ErrorCode::WalletUserRejected,
            "You rejected the transaction in your wallet.",
        )
    }

    /// Wallet on the wrong chain
    pub fn wrong_network(chain_name: &str) -> Self {
        Self::new(
            ErrorCode::WalletWrongNetwork,
            format!("Please manually switch your wallet to {}.", chain_name),
        )
    }

    /// Cross-chain execution is not built
    pub fn cross_chain_unsupported() -> Self {
        Self::new(
            ErrorCode::CrossChainUnsupported,
            "Cross-chain swaps are not yet supported",
        )
    }

    /// Busy flag held by another action
    pub fn busy() -> Self {
        Self::new(
            ErrorCode::TxBusy,
            "Another transaction is still in progress",
        )
    }

    /// API bad request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, msg)
    }

    /// API internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiInternalError, msg)
    }
}

// ============================================
// Humanized messages
// ============================================

/// Does a revert message look like a minimum-output check?
pub fn is_min_out_revert(msg: &str) -> bool {
    let m = msg.to_lowercase();
    m.contains("insufficient_output_amount")
        || m.contains("insufficient output amount")
        || m.contains("too little received")
        || m.contains("excessive")
        || m.contains("slippage")
        || m.contains("uniswapv2: k")
        || m.contains("pancake: k")
}

/// Map a raw wallet/RPC failure message to user-facing guidance
pub fn humanize_message(raw: &str) -> String {
    let msg = raw.to_lowercase();
    if msg.contains("address") && msg.contains("invalid") {
        return "Invalid contract address for the selected chain. Make sure wallet & UI are on the same network.".to_string();
    }
    if msg.contains("user rejected") || msg.contains("rejected the request") {
        return "You rejected the transaction in your wallet.".to_string();
    }
    if msg.contains("chain mismatch")
        || msg.contains("wrong network")
        || msg.contains("switch the network")
    {
        return "Your wallet is on a different network. Switch to the selected chain and try again.".to_string();
    }
    if msg.contains("insufficient funds") || msg.contains("exceeds balance") {
        return "Insufficient balance to complete this transaction.".to_string();
    }
    if is_min_out_revert(&msg) {
        return "Price moved more than your slippage tolerance.".to_string();
    }
    if msg.contains("transferhelper") || msg.contains("allowance") {
        return "Token allowance is insufficient.".to_string();
    }
    if msg.contains("deadline") || msg.contains("expired") {
        return "Transaction deadline exceeded.".to_string();
    }
    if raw.trim().is_empty() {
        return "Transaction failed. Please try again or adjust your settings.".to_string();
    }
    raw.to_string()
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::RpcTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::RpcConnectionFailed, "Connection failed")
        } else {
            Self::new(ErrorCode::RpcError, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::RpcInvalidResponse, "JSON parse error", err)
    }
}

impl From<alloy_sol_types::Error> for AppError {
    fn from(err: alloy_sol_types::Error) -> Self {
        Self::with_source(ErrorCode::RpcInvalidResponse, "ABI decode error", err)
    }
}
