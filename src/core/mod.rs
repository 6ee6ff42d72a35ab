//! Core Module - Quoting, Tax Detection & Transaction Lifecycle
//!
//! Business logic of the engine. Everything here talks to the chain
//! only through the collaborator traits in `providers::client`.

pub mod amm;
pub mod cross_chain;
pub mod liquidity;
pub mod orchestrator;
pub mod quote;
pub mod refresh;
pub mod session;
pub mod slippage;
pub mod tax;

pub use cross_chain::{CrossChainEstimate, CrossChainEstimator};
pub use liquidity::{LiquidityReader, PairState};
pub use orchestrator::{Approval, ExecutionPlan, TxAction, TxOrchestrator};
pub use quote::{QuoteEngine, QuoteRequest};
pub use refresh::RefreshBurst;
pub use session::QuoteSession;
pub use slippage::{resolve as resolve_slippage, AutoKind, ResolvedSlippage};
pub use tax::TaxDetector;
