//! RusterSwap Library
//!
//! Multichain swap quoting and execution engine for a DEX front end:
//! - Chain registry with per-chain router, factory, quoter and stable bridges
//! - Best-route quoting over Uniswap-V2 style routers with a V3 fallback
//! - Best-effort transfer-tax detection and tax-aware slippage
//! - Transaction lifecycle: chain check, approvals, simulation, sign, confirm
//! - Indicative cross-chain estimates

pub mod api;
pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::{
    CrossChainEstimate, CrossChainEstimator, LiquidityReader, QuoteEngine, QuoteRequest, QuoteSession,
    RefreshBurst, ResolvedSlippage, TaxDetector, TxAction, TxOrchestrator,
};
pub use models::{AppError, AppResult, ChainConfig, ChainRegistry, EngineConfig, ErrorCode};
pub use models::{Quote, Route, SwapPath, TaxReading, TokenAddress, TokenRef, TxLifecycle, TxStage};
pub use providers::{ChainReader, ReceiptPoller, RpcManager, RpcProvider, WalletSigner};
