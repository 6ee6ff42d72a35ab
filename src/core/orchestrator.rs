//! Transaction Orchestrator
//!
//! Drives one user action through its lifecycle:
//!
//! ```text
//! Idle -> ChainCheck -> [Approving] -> Simulating -> AwaitingSignature
//!      -> Submitted -> Confirming -> Succeeded | Reverted | Failed
//! ```
//!
//! Only one action runs at a time. Every stage change is published on a
//! `watch` channel and logged. Whatever goes wrong ends in a single
//! terminal `Failed` stage carrying an error code and a user-facing message.

use alloy_primitives::{Address, U256};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::core::amm::apply_slippage;
use crate::core::cross_chain::CrossChainEstimate;
use crate::core::slippage::ResolvedSlippage;
use crate::models::config::{ChainConfig, ChainRegistry, EngineConfig};
use crate::models::errors::{is_min_out_revert, AppError, AppResult, ErrorCode};
use crate::models::types::{ActionKind, Quote, Route, TokenRef, TxLifecycle, TxStage};
use crate::providers::client::{read_call, ChainReader, PreparedTx, ReceiptPoller, TxRequest, WalletSigner};
use crate::utils::abi::{
    addLiquidityCall, addLiquidityETHCall, allowanceCall, approveCall, depositCall, encode,
    encode_v3_path, exactInputCall, multicallCall, removeLiquidityCall,
    swapExactETHForTokensSupportingFeeOnTransferTokensCall,
    swapExactTokensForETHSupportingFeeOnTransferTokensCall,
    swapExactTokensForTokensSupportingFeeOnTransferTokensCall, unwrapWETH9Call, withdrawCall,
    ExactInputParams,
};
use crate::utils::constants::{get_chain_name, ROUTER_ADDRESS_THIS};

// ============================================
// Actions
// ============================================

/// A user-initiated action
#[derive(Debug, Clone)]
pub enum TxAction {
    /// Execute a quote (V2, V3, or a 1:1 wrap/unwrap quote)
    Swap {
        quote: Quote,
        token_in: TokenRef,
        token_out: TokenRef,
        slippage: ResolvedSlippage,
    },
    Wrap {
        chain_id: u64,
        amount: U256,
    },
    Unwrap {
        chain_id: u64,
        amount: U256,
    },
    AddLiquidity {
        chain_id: u64,
        token_a: TokenRef,
        token_b: TokenRef,
        amount_a: U256,
        amount_b: U256,
        /// Defaults to the engine's LP slippage
        slippage_pct: Option<f64>,
    },
    RemoveLiquidity {
        chain_id: u64,
        pair: Address,
        token_a: Address,
        token_b: Address,
        liquidity: U256,
        /// Amounts the position currently represents
        expected_a: U256,
        expected_b: U256,
    },
    CrossChain {
        estimate: CrossChainEstimate,
    },
}

impl TxAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            TxAction::Swap { quote, .. } => match quote.route {
                Route::Wrap { .. } => ActionKind::Wrap,
                Route::Unwrap { .. } => ActionKind::Unwrap,
                _ => ActionKind::Swap,
            },
            TxAction::Wrap { .. } => ActionKind::Wrap,
            TxAction::Unwrap { .. } => ActionKind::Unwrap,
            TxAction::AddLiquidity { .. } => ActionKind::AddLiquidity,
            TxAction::RemoveLiquidity { .. } => ActionKind::RemoveLiquidity,
            TxAction::CrossChain { .. } => ActionKind::Swap,
        }
    }

    /// Chain the transaction is sent on
    pub fn chain_id(&self) -> u64 {
        match self {
            TxAction::Swap { quote, .. } => quote.chain_id,
            TxAction::Wrap { chain_id, .. }
            | TxAction::Unwrap { chain_id, .. }
            | TxAction::AddLiquidity { chain_id, .. }
            | TxAction::RemoveLiquidity { chain_id, .. } => *chain_id,
            TxAction::CrossChain { estimate } => estimate.src_chain_id,
        }
    }
}

/// ERC-20 allowance the action needs before it can run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    pub token: Address,
    pub spender: Address,
    pub amount: U256,
}

/// Approvals plus the final request
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub approvals: Vec<Approval>,
    pub request: TxRequest,
}

// ============================================
// Busy flag
// ============================================

/// Holds the busy flag; releases it on drop
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(flag.clone()))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ============================================
// Orchestrator
// ============================================

pub struct TxOrchestrator {
    registry: Arc<ChainRegistry>,
    reader: Arc<dyn ChainReader>,
    wallet: Arc<dyn WalletSigner>,
    receipts: Arc<dyn ReceiptPoller>,
    config: EngineConfig,
    busy: Arc<AtomicBool>,
    stage_tx: watch::Sender<TxStage>,
}

impl TxOrchestrator {
    pub fn new(
        registry: Arc<ChainRegistry>,
        reader: Arc<dyn ChainReader>,
        wallet: Arc<dyn WalletSigner>,
        receipts: Arc<dyn ReceiptPoller>,
        config: EngineConfig,
    ) -> Self {
        let (stage_tx, _) = watch::channel(TxStage::Idle);
        Self {
            registry,
            reader,
            wallet,
            receipts,
            config,
            busy: Arc::new(AtomicBool::new(false)),
            stage_tx,
        }
    }

    /// Stage updates of the running action
    pub fn subscribe(&self) -> watch::Receiver<TxStage> {
        self.stage_tx.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run `action` to a terminal stage.
    ///
    /// Only `TX_BUSY` is returned as an error; every other failure is
    /// recorded in the returned lifecycle.
    pub async fn execute(&self, action: TxAction) -> AppResult<TxLifecycle> {
        let _guard = BusyGuard::acquire(&self.busy).ok_or_else(AppError::busy)?;

        let mut lifecycle = TxLifecycle::new(action.kind(), action.chain_id());
        self.stage_tx.send_replace(TxStage::Idle);
        info!(
            "🚀 [{}] {:?} on chain {}",
            lifecycle.id,
            lifecycle.action,
            lifecycle.chain_id
        );

        if let Err(err) = self.run(&action, &mut lifecycle).await {
            warn!("❌ [{}] {} failed: {}", lifecycle.id, lifecycle.stage().as_str(), err);
            lifecycle.fail(&err);
            self.stage_tx.send_replace(TxStage::Failed);
        }
        Ok(lifecycle)
    }

    fn advance(&self, lifecycle: &mut TxLifecycle, stage: TxStage) {
        lifecycle.push(stage);
        self.stage_tx.send_replace(stage);
        info!("➡️ [{}] {}", lifecycle.id, stage.as_str());
    }

    async fn run(&self, action: &TxAction, lifecycle: &mut TxLifecycle) -> AppResult<()> {
        self.precheck(action)?;
        let chain_id = action.chain_id();
        let cfg = self.registry.require(chain_id)?;

        self.advance(lifecycle, TxStage::ChainCheck);
        self.ensure_chain(cfg).await?;
        let account = self.wallet.account().await?;

        let plan = self.plan(cfg, action, account)?;

        let mut approving = false;
        for approval in &plan.approvals {
            if !self.allowance_short(chain_id, account, approval).await? {
                continue;
            }
            if !approving {
                self.advance(lifecycle, TxStage::Approving);
                approving = true;
            }
            self.approve(chain_id, account, approval, lifecycle).await?;
        }

        self.advance(lifecycle, TxStage::Simulating);
        let prepared = self
            .wallet
            .simulate(plan.request)
            .await
            .map_err(classify_simulation)?;

        self.advance(lifecycle, TxStage::AwaitingSignature);
        let hash = self.wallet.write(prepared).await.map_err(classify_wallet)?;
        lifecycle.tx_hash = Some(hash);
        self.advance(lifecycle, TxStage::Submitted);
        match cfg.tx_url(hash) {
            Some(url) => info!("📤 [{}] tx {} {}", lifecycle.id, hash, url),
            None => info!("📤 [{}] tx {}", lifecycle.id, hash),
        }

        self.advance(lifecycle, TxStage::Confirming);
        let receipt = self.receipts.wait_for_receipt(chain_id, hash).await?;
        if receipt.status {
            self.advance(lifecycle, TxStage::Succeeded);
            info!("✅ [{}] confirmed in block {:?}", lifecycle.id, receipt.block_number);
        } else {
            self.advance(lifecycle, TxStage::Reverted);
            warn!("↩️ [{}] reverted on chain", lifecycle.id);
        }
        Ok(())
    }

    /// Checks that need no wallet interaction
    fn precheck(&self, action: &TxAction) -> AppResult<()> {
        match action {
            TxAction::CrossChain { .. } => Err(AppError::cross_chain_unsupported()),
            TxAction::Swap {
                quote,
                token_in,
                token_out,
                slippage,
            } => {
                slippage.validate()?;
                quote.validate()?;
                if token_in.chain_id != quote.chain_id || token_out.chain_id != quote.chain_id {
                    return Err(AppError::cross_chain_unsupported());
                }
                Ok(())
            }
            TxAction::Wrap { amount, .. } | TxAction::Unwrap { amount, .. } => {
                if amount.is_zero() {
                    return Err(AppError::invalid_amount("Amount must be greater than zero"));
                }
                Ok(())
            }
            TxAction::AddLiquidity { amount_a, amount_b, .. } => {
                if amount_a.is_zero() || amount_b.is_zero() {
                    return Err(AppError::invalid_amount("Both amounts must be greater than zero"));
                }
                Ok(())
            }
            TxAction::RemoveLiquidity { liquidity, .. } => {
                if liquidity.is_zero() {
                    return Err(AppError::invalid_amount("Nothing to remove"));
                }
                Ok(())
            }
        }
    }

    /// Make sure the wallet is on the action's chain
    async fn ensure_chain(&self, cfg: &ChainConfig) -> AppResult<()> {
        if self.wallet.chain_id().await? == cfg.chain_id {
            return Ok(());
        }
        let name = if cfg.name.is_empty() {
            get_chain_name(cfg.chain_id).to_string()
        } else {
            cfg.name.clone()
        };
        info!("🔀 Switching wallet to {} ({})", name, cfg.chain_id);

        if let Err(e) = self.wallet.switch_chain(cfg.chain_id).await {
            if e.is_user_rejection() {
                return Err(AppError::user_rejected());
            }
            return Err(AppError::wrong_network(&name));
        }
        if self.wallet.chain_id().await? != cfg.chain_id {
            return Err(AppError::wrong_network(&name));
        }
        Ok(())
    }

    /// Whether the on-chain allowance is below what `approval` needs
    async fn allowance_short(&self, chain_id: u64, owner: Address, approval: &Approval) -> AppResult<bool> {
        let call = allowanceCall {
            owner,
            spender: approval.spender,
        };
        let current = read_call(self.reader.as_ref(), chain_id, approval.token, &call).await?._0;
        Ok(current < approval.amount)
    }

    /// Approve `MAX` and wait for the receipt
    async fn approve(
        &self,
        chain_id: u64,
        owner: Address,
        approval: &Approval,
        lifecycle: &mut TxLifecycle,
    ) -> AppResult<()> {
        info!("🔓 [{}] approving {} for {}", lifecycle.id, approval.token, approval.spender);
        let data = encode(&approveCall {
            spender: approval.spender,
            amount: U256::MAX,
        });
        let request = TxRequest::new(chain_id, owner, approval.token, data);
        let hash = self
            .wallet
            .write(PreparedTx::unsimulated(request))
            .await
            .map_err(classify_wallet)?;
        lifecycle.approval_hashes.push(hash);

        let receipt = self.receipts.wait_for_receipt(chain_id, hash).await?;
        if !receipt.status {
            return Err(AppError::new(
                ErrorCode::TxApprovalFailed,
                format!("Approval of {} failed", approval.token),
            ));
        }
        Ok(())
    }

    fn deadline(&self, minutes: u64) -> U256 {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        U256::from(now + minutes * 60)
    }

    /// Approvals and calldata for `action`
    pub fn plan(&self, cfg: &ChainConfig, action: &TxAction, account: Address) -> AppResult<ExecutionPlan> {
        let chain_id = cfg.chain_id;
        match action {
            TxAction::CrossChain { .. } => Err(AppError::cross_chain_unsupported()),

            TxAction::Wrap { amount, .. } => self.wrap_plan(cfg, account, *amount, false),
            TxAction::Unwrap { amount, .. } => self.wrap_plan(cfg, account, *amount, true),

            TxAction::Swap {
                quote,
                token_in,
                token_out,
                ..
            } => match &quote.route {
                Route::Wrap { .. } => self.wrap_plan(cfg, account, quote.amount_in, false),
                Route::Unwrap { .. } => self.wrap_plan(cfg, account, quote.amount_in, true),
                Route::V2 { path } => {
                    let router = cfg.require_router_v2()?;
                    let deadline = self.deadline(self.config.deadline_minutes);
                    let path = path.tokens().to_vec();
                    let (data, value) = if token_in.is_native() {
                        let call = swapExactETHForTokensSupportingFeeOnTransferTokensCall {
                            amountOutMin: quote.amount_out_min,
                            path,
                            to: account,
                            deadline,
                        };
                        (encode(&call), quote.amount_in)
                    } else if token_out.is_native() {
                        let call = swapExactTokensForETHSupportingFeeOnTransferTokensCall {
                            amountIn: quote.amount_in,
                            amountOutMin: quote.amount_out_min,
                            path,
                            to: account,
                            deadline,
                        };
                        (encode(&call), U256::ZERO)
                    } else {
                        let call = swapExactTokensForTokensSupportingFeeOnTransferTokensCall {
                            amountIn: quote.amount_in,
                            amountOutMin: quote.amount_out_min,
                            path,
                            to: account,
                            deadline,
                        };
                        (encode(&call), U256::ZERO)
                    };
                    Ok(ExecutionPlan {
                        approvals: spend_approvals(token_in, router, quote.amount_in),
                        request: TxRequest::new(chain_id, account, router, data).with_value(value),
                    })
                }
                Route::V3 { path, fee_tiers } => {
                    let router = cfg.require_swap_router_v3()?;
                    let deadline = self.deadline(self.config.deadline_minutes);
                    let packed = encode_v3_path(path.tokens(), fee_tiers)?;
                    let value = if token_in.is_native() { quote.amount_in } else { U256::ZERO };

                    let data = if token_out.is_native() {
                        let swap = exactInputCall {
                            params: ExactInputParams {
                                path: packed,
                                recipient: ROUTER_ADDRESS_THIS,
                                amountIn: quote.amount_in,
                                amountOutMinimum: quote.amount_out_min,
                            },
                        };
                        let unwrap = unwrapWETH9Call {
                            amountMinimum: quote.amount_out_min,
                            recipient: account,
                        };
                        encode(&multicallCall {
                            deadline,
                            data: vec![encode(&swap), encode(&unwrap)],
                        })
                    } else {
                        let swap = exactInputCall {
                            params: ExactInputParams {
                                path: packed,
                                recipient: account,
                                amountIn: quote.amount_in,
                                amountOutMinimum: quote.amount_out_min,
                            },
                        };
                        encode(&multicallCall {
                            deadline,
                            data: vec![encode(&swap)],
                        })
                    };
                    Ok(ExecutionPlan {
                        approvals: spend_approvals(token_in, router, quote.amount_in),
                        request: TxRequest::new(chain_id, account, router, data).with_value(value),
                    })
                }
            },

            TxAction::AddLiquidity {
                token_a,
                token_b,
                amount_a,
                amount_b,
                slippage_pct,
                ..
            } => {
                let router = cfg.require_router_v2()?;
                let pct = slippage_pct.unwrap_or(self.config.lp_slippage_pct);
                let deadline = self.deadline(self.config.deadline_minutes);

                let (data, value, approvals) = match (token_a.address.contract(), token_b.address.contract()) {
                    (Some(a), Some(b)) => {
                        let call = addLiquidityCall {
                            tokenA: a,
                            tokenB: b,
                            amountADesired: *amount_a,
                            amountBDesired: *amount_b,
                            amountAMin: apply_slippage(*amount_a, pct),
                            amountBMin: apply_slippage(*amount_b, pct),
                            to: account,
                            deadline,
                        };
                        let approvals = vec![
                            Approval {
                                token: a,
                                spender: router,
                                amount: *amount_a,
                            },
                            Approval {
                                token: b,
                                spender: router,
                                amount: *amount_b,
                            },
                        ];
                        (encode(&call), U256::ZERO, approvals)
                    }
                    (Some(token), None) | (None, Some(token)) => {
                        let (token_amount, eth_amount) = if token_a.is_native() {
                            (*amount_b, *amount_a)
                        } else {
                            (*amount_a, *amount_b)
                        };
                        let call = addLiquidityETHCall {
                            token,
                            amountTokenDesired: token_amount,
                            amountTokenMin: apply_slippage(token_amount, pct),
                            amountETHMin: apply_slippage(eth_amount, pct),
                            to: account,
                            deadline,
                        };
                        let approvals = vec![Approval {
                            token,
                            spender: router,
                            amount: token_amount,
                        }];
                        (encode(&call), eth_amount, approvals)
                    }
                    (None, None) => {
                        return Err(AppError::invalid_path("Cannot pair the native currency with itself"))
                    }
                };
                Ok(ExecutionPlan {
                    approvals,
                    request: TxRequest::new(chain_id, account, router, data).with_value(value),
                })
            }

            TxAction::RemoveLiquidity {
                pair,
                token_a,
                token_b,
                liquidity,
                expected_a,
                expected_b,
                ..
            } => {
                let router = cfg.require_router_v2()?;
                let pct = self.config.lp_slippage_pct;
                let call = removeLiquidityCall {
                    tokenA: *token_a,
                    tokenB: *token_b,
                    liquidity: *liquidity,
                    amountAMin: apply_slippage(*expected_a, pct),
                    amountBMin: apply_slippage(*expected_b, pct),
                    to: account,
                    deadline: self.deadline(self.config.remove_deadline_minutes),
                };
                Ok(ExecutionPlan {
                    approvals: vec![Approval {
                        token: *pair,
                        spender: router,
                        amount: *liquidity,
                    }],
                    request: TxRequest::new(chain_id, account, router, encode(&call)),
                })
            }
        }
    }

    fn wrap_plan(&self, cfg: &ChainConfig, account: Address, amount: U256, unwrap: bool) -> AppResult<ExecutionPlan> {
        let wrapped = cfg.require_wrapped_native()?;
        let request = if unwrap {
            TxRequest::new(cfg.chain_id, account, wrapped, encode(&withdrawCall { wad: amount }))
        } else {
            TxRequest::new(cfg.chain_id, account, wrapped, encode(&depositCall {})).with_value(amount)
        };
        Ok(ExecutionPlan {
            approvals: Vec::new(),
            request,
        })
    }
}

/// Approval for the token the action spends; native needs none
fn spend_approvals(token_in: &TokenRef, spender: Address, amount: U256) -> Vec<Approval> {
    match token_in.address.contract() {
        Some(token) => vec![Approval {
            token,
            spender,
            amount,
        }],
        None => Vec::new(),
    }
}

/// Dry-run failure: minimum-output check vs any other revert
fn classify_simulation(err: AppError) -> AppError {
    if err.is_user_rejection() {
        return AppError::user_rejected();
    }
    if is_min_out_revert(&err.message) {
        return AppError::new(
            ErrorCode::SimulationMinOutput,
            "Price moved beyond your slippage tolerance. Increase slippage or try a smaller amount.",
        );
    }
    AppError::new(ErrorCode::SimulationReverted, err.message)
}

fn classify_wallet(err: AppError) -> AppError {
    if err.is_user_rejection() {
        return AppError::user_rejected();
    }
    err
}
