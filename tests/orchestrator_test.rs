//! Integration tests for the transaction orchestrator

mod common;

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use common::*;
use std::sync::Arc;
use std::time::Duration;

use ruster_swap::core::cross_chain::CrossChainEstimate;
use ruster_swap::core::orchestrator::{TxAction, TxOrchestrator};
use ruster_swap::core::quote::{QuoteEngine, QuoteRequest};
use ruster_swap::core::slippage::{resolve, ResolvedSlippage};
use ruster_swap::models::errors::ErrorCode;
use ruster_swap::models::types::{ActionKind, SlippageMode, TaxReading, TokenRef, TxStage};
use ruster_swap::utils::abi::{
    addLiquidityETHCall, depositCall, exactInputCall, multicallCall, removeLiquidityCall,
    swapExactETHForTokensSupportingFeeOnTransferTokensCall, swapExactTokensForETHSupportingFeeOnTransferTokensCall,
    swapExactTokensForTokensSupportingFeeOnTransferTokensCall, unwrapWETH9Call, withdrawCall,
};
use ruster_swap::utils::constants::ROUTER_ADDRESS_THIS;

fn token_a() -> TokenRef {
    TokenRef::erc20(CHAIN, addr(0x0a), "AAA", 18)
}

fn token_b() -> TokenRef {
    TokenRef::erc20(CHAIN, addr(0x0b), "BBB", 6)
}

fn native() -> TokenRef {
    TokenRef::native(CHAIN, "TST")
}

fn orchestrator(mock: &MockChain) -> TxOrchestrator {
    let shared = Arc::new(mock.clone());
    TxOrchestrator::new(test_registry(), shared.clone(), shared.clone(), shared, fast_engine_config())
}

fn fixed(pct: f64) -> ResolvedSlippage {
    resolve(SlippageMode::Fixed, pct, TaxReading::Unknown)
}

fn with_pools() -> MockChain {
    let mock = MockChain::new();
    mock.add_v2_pool(addr(0x0a), addr(0x0b), units(1_000_000, 18), units(2_000_000, 6));
    mock.add_v2_pool(wrapped(), addr(0x0b), units(1_000, 18), units(2_000_000, 6));
    mock.add_v2_pool(addr(0x0a), wrapped(), units(1_000_000, 18), units(1_000, 18));
    mock
}

async fn swap_action(mock: &MockChain, token_in: TokenRef, token_out: TokenRef, slippage: ResolvedSlippage) -> TxAction {
    let engine = QuoteEngine::new(test_registry(), Arc::new(mock.clone()));
    let quote = engine
        .quote(&QuoteRequest {
            chain_id: CHAIN,
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            amount: "1.5".to_string(),
            slippage_bps: slippage.bps,
            blind_min_out: slippage.is_blind(),
        })
        .await
        .expect("quote");
    TxAction::Swap {
        quote,
        token_in,
        token_out,
        slippage,
    }
}

#[tokio::test]
async fn test_swap_call_order_with_approval() {
    let mock = with_pools();
    let orch = orchestrator(&mock);
    let mut stages = orch.subscribe();

    let action = swap_action(&mock, token_a(), token_b(), fixed(0.5)).await;
    let lifecycle = orch.execute(action).await.unwrap();

    assert!(lifecycle.is_success(), "failure: {:?}", lifecycle.failure);
    assert_eq!(mock.tx_events(), vec!["allowance", "approve", "wait", "simulate", "write", "wait"]);
    assert_eq!(
        lifecycle.stages,
        vec![
            TxStage::Idle,
            TxStage::ChainCheck,
            TxStage::Approving,
            TxStage::Simulating,
            TxStage::AwaitingSignature,
            TxStage::Submitted,
            TxStage::Confirming,
            TxStage::Succeeded,
        ]
    );
    assert_eq!(lifecycle.approval_hashes.len(), 1);
    assert!(lifecycle.tx_hash.is_some());
    assert!(lifecycle.finished_at.is_some());
    assert_eq!(*stages.borrow_and_update(), TxStage::Succeeded);

    let written = mock.written();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].to, router());
    let call = swapExactTokensForTokensSupportingFeeOnTransferTokensCall::abi_decode(&written[0].data, true).unwrap();
    assert_eq!(call.amountIn, units(15, 17));
    assert_eq!(call.to, user());
    assert_eq!(call.path, vec![addr(0x0a), addr(0x0b)]);
}

#[tokio::test]
async fn test_existing_allowance_skips_approval() {
    let mock = with_pools();
    mock.set_allowance(addr(0x0a), user(), router(), U256::MAX);

    let action = swap_action(&mock, token_a(), token_b(), fixed(0.5)).await;
    let lifecycle = orchestrator(&mock).execute(action).await.unwrap();

    assert!(lifecycle.is_success());
    assert_eq!(mock.tx_events(), vec!["allowance", "simulate", "write", "wait"]);
    assert!(!lifecycle.stages.contains(&TxStage::Approving));
}

#[tokio::test]
async fn test_tax_floor_blocks_before_simulation() {
    let mock = with_pools();
    let slippage = resolve(SlippageMode::Fixed, 1.0, TaxReading::Detected(3.0));
    let action = swap_action(&mock, token_a(), token_b(), slippage).await;

    let lifecycle = orchestrator(&mock).execute(action).await.unwrap();

    assert_eq!(lifecycle.stage(), TxStage::Failed);
    assert_eq!(lifecycle.failure_code(), Some(ErrorCode::SlippageTooSmall));
    assert!(mock.simulated().is_empty(), "no simulate call when slippage is below the tax");
    assert!(mock.tx_events().is_empty());
}

#[tokio::test]
async fn test_native_in_and_native_out_swaps() {
    let mock = with_pools();
    let action = swap_action(&mock, native(), token_b(), fixed(1.0)).await;
    let lifecycle = orchestrator(&mock).execute(action).await.unwrap();
    assert!(lifecycle.is_success());
    assert!(!mock.tx_events().contains(&"allowance".to_string()), "native input needs no approval");

    let sent = mock.written().pop().unwrap();
    assert_eq!(sent.value, units(15, 17));
    let call = swapExactETHForTokensSupportingFeeOnTransferTokensCall::abi_decode(&sent.data, true).unwrap();
    assert_eq!(call.path, vec![wrapped(), addr(0x0b)]);

    let mock = with_pools();
    let action = swap_action(&mock, token_a(), native(), fixed(1.0)).await;
    let lifecycle = orchestrator(&mock).execute(action).await.unwrap();
    assert!(lifecycle.is_success());
    let sent = mock.written().pop().unwrap();
    assert_eq!(sent.value, U256::ZERO);
    let call = swapExactTokensForETHSupportingFeeOnTransferTokensCall::abi_decode(&sent.data, true).unwrap();
    assert_eq!(call.path, vec![addr(0x0a), wrapped()]);
}

#[tokio::test]
async fn test_v3_native_out_uses_multicall_unwrap() {
    let mock = MockChain::new();
    mock.add_v3_pool(addr(0x0a), wrapped(), 500, units(1_000, 18), units(1_000, 18));

    let action = swap_action(&mock, token_a(), native(), fixed(1.0)).await;
    let lifecycle = orchestrator(&mock).execute(action).await.unwrap();
    assert!(lifecycle.is_success(), "failure: {:?}", lifecycle.failure);

    let sent = mock.written().pop().unwrap();
    assert_eq!(sent.to, swap_router_v3());
    let multicall = multicallCall::abi_decode(&sent.data, true).unwrap();
    assert_eq!(multicall.data.len(), 2);

    let swap = exactInputCall::abi_decode(&multicall.data[0], true).unwrap();
    assert_eq!(swap.params.recipient, ROUTER_ADDRESS_THIS);
    assert_eq!(swap.params.amountIn, units(15, 17));

    let unwrap = unwrapWETH9Call::abi_decode(&multicall.data[1], true).unwrap();
    assert_eq!(unwrap.recipient, user());
    assert_eq!(unwrap.amountMinimum, swap.params.amountOutMinimum);
}

#[tokio::test]
async fn test_wrap_and_unwrap() {
    let mock = MockChain::new();
    let orch = orchestrator(&mock);

    let lifecycle = orch
        .execute(TxAction::Wrap {
            chain_id: CHAIN,
            amount: units(2, 18),
        })
        .await
        .unwrap();
    assert!(lifecycle.is_success());
    assert_eq!(lifecycle.action, ActionKind::Wrap);
    let sent = mock.written().pop().unwrap();
    assert_eq!(sent.to, wrapped());
    assert_eq!(sent.value, units(2, 18));
    assert_eq!(sent.selector(), Some(depositCall::SELECTOR));

    let lifecycle = orch
        .execute(TxAction::Unwrap {
            chain_id: CHAIN,
            amount: units(1, 18),
        })
        .await
        .unwrap();
    assert!(lifecycle.is_success());
    let sent = mock.written().pop().unwrap();
    assert_eq!(withdrawCall::abi_decode(&sent.data, true).unwrap().wad, units(1, 18));
    assert!(!mock.tx_events().contains(&"allowance".to_string()));
}

#[tokio::test]
async fn test_wrong_network_switch() {
    let mock = with_pools();
    mock.with(|s| s.wallet_chain = OTHER_CHAIN);
    let action = swap_action(&mock, native(), token_b(), fixed(1.0)).await;
    let lifecycle = orchestrator(&mock).execute(action.clone()).await.unwrap();
    assert!(lifecycle.is_success(), "accepted switch proceeds");
    assert_eq!(mock.state.lock().unwrap().wallet_chain, CHAIN);

    let mock = with_pools();
    mock.with(|s| {
        s.wallet_chain = OTHER_CHAIN;
        s.switch_mode = SwitchMode::Unsupported;
    });
    let lifecycle = orchestrator(&mock).execute(action.clone()).await.unwrap();
    assert_eq!(lifecycle.failure_code(), Some(ErrorCode::WalletWrongNetwork));
    assert_eq!(
        lifecycle.failure.unwrap().message,
        "Please manually switch your wallet to Test Chain."
    );
    assert!(mock.simulated().is_empty());

    let mock = with_pools();
    mock.with(|s| {
        s.wallet_chain = OTHER_CHAIN;
        s.switch_mode = SwitchMode::Reject;
    });
    let lifecycle = orchestrator(&mock).execute(action).await.unwrap();
    assert_eq!(lifecycle.failure_code(), Some(ErrorCode::WalletUserRejected));
}

#[tokio::test]
async fn test_user_rejects_signature() {
    let mock = with_pools();
    mock.with(|s| s.reject_write = true);
    let action = swap_action(&mock, native(), token_b(), fixed(1.0)).await;

    let lifecycle = orchestrator(&mock).execute(action).await.unwrap();

    assert_eq!(lifecycle.stage(), TxStage::Failed);
    let failure = lifecycle.failure.unwrap();
    assert_eq!(failure.code, ErrorCode::WalletUserRejected);
    assert_eq!(failure.message, "You rejected the transaction in your wallet.");
    assert!(lifecycle.tx_hash.is_none());
}

#[tokio::test]
async fn test_simulation_failures_are_classified() {
    let mock = with_pools();
    mock.with(|s| s.simulate_error = Some("execution reverted: UniswapV2Router: INSUFFICIENT_OUTPUT_AMOUNT".into()));
    let action = swap_action(&mock, native(), token_b(), fixed(0.1)).await;
    let lifecycle = orchestrator(&mock).execute(action.clone()).await.unwrap();
    assert_eq!(lifecycle.failure_code(), Some(ErrorCode::SimulationMinOutput));
    assert!(lifecycle.failure.unwrap().message.contains("slippage"));
    assert!(!mock.tx_events().contains(&"write".to_string()));

    let mock = with_pools();
    mock.with(|s| s.simulate_error = Some("execution reverted: TransferHelper: TRANSFER_FROM_FAILED".into()));
    let lifecycle = orchestrator(&mock).execute(action).await.unwrap();
    assert_eq!(lifecycle.failure_code(), Some(ErrorCode::SimulationReverted));
    assert_eq!(lifecycle.failure.unwrap().message, "Token allowance is insufficient.");
}

#[tokio::test]
async fn test_reverted_receipt_and_failed_approval() {
    let mock = with_pools();
    mock.with(|s| s.tx_succeeds = false);
    let action = swap_action(&mock, native(), token_b(), fixed(1.0)).await;
    let lifecycle = orchestrator(&mock).execute(action).await.unwrap();
    assert_eq!(lifecycle.stage(), TxStage::Reverted);
    assert!(lifecycle.tx_hash.is_some());

    let mock = with_pools();
    mock.with(|s| s.approval_succeeds = false);
    let action = swap_action(&mock, token_a(), token_b(), fixed(1.0)).await;
    let lifecycle = orchestrator(&mock).execute(action).await.unwrap();
    assert_eq!(lifecycle.failure_code(), Some(ErrorCode::TxApprovalFailed));
    assert_eq!(mock.tx_events(), vec!["allowance", "approve", "wait"]);
}

#[tokio::test]
async fn test_busy_flag_and_release() {
    let mock = with_pools();
    mock.with(|s| s.write_delay = Some(Duration::from_millis(200)));
    let orch = Arc::new(orchestrator(&mock));
    let action = swap_action(&mock, native(), token_b(), fixed(1.0)).await;

    let running = {
        let orch = orch.clone();
        let action = action.clone();
        tokio::spawn(async move { orch.execute(action).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(orch.is_busy());

    let err = orch.execute(action.clone()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::TxBusy);

    let first = running.await.unwrap().unwrap();
    assert!(first.is_success());
    assert!(!orch.is_busy(), "flag released after success");

    mock.with(|s| {
        s.write_delay = None;
        s.reject_write = true;
    });
    let failed = orch.execute(action.clone()).await.unwrap();
    assert_eq!(failed.stage(), TxStage::Failed);
    assert!(!orch.is_busy(), "flag released after failure");
}

#[tokio::test]
async fn test_cross_chain_always_rejected() {
    let mock = MockChain::new();
    let action = TxAction::CrossChain {
        estimate: CrossChainEstimate {
            src_chain_id: CHAIN,
            dst_chain_id: OTHER_CHAIN,
            token_out: addr(0x0b),
            amount_in: units(1, 18),
            amount_out: units(1, 6),
            fee_tier: Some(500),
        },
    };
    let lifecycle = orchestrator(&mock).execute(action).await.unwrap();
    assert_eq!(lifecycle.failure_code(), Some(ErrorCode::CrossChainUnsupported));
    assert_eq!(lifecycle.failure.unwrap().message, "Cross-chain swaps are not yet supported");
    assert!(mock.events().is_empty());
}

#[tokio::test]
async fn test_add_liquidity_with_native() {
    let mock = MockChain::new();
    let lifecycle = orchestrator(&mock)
        .execute(TxAction::AddLiquidity {
            chain_id: CHAIN,
            token_a: token_a(),
            token_b: native(),
            amount_a: units(100, 18),
            amount_b: units(2, 18),
            slippage_pct: None,
        })
        .await
        .unwrap();
    assert!(lifecycle.is_success(), "failure: {:?}", lifecycle.failure);
    assert_eq!(mock.tx_events(), vec!["allowance", "approve", "wait", "simulate", "write", "wait"]);

    let sent = mock.written().pop().unwrap();
    assert_eq!(sent.value, units(2, 18));
    let call = addLiquidityETHCall::abi_decode(&sent.data, true).unwrap();
    assert_eq!(call.token, addr(0x0a));
    assert_eq!(call.amountTokenDesired, units(100, 18));
    assert_eq!(call.amountTokenMin, units(995, 17));
    assert_eq!(call.amountETHMin, units(199, 16));
}

#[tokio::test]
async fn test_remove_liquidity_approves_lp_token() {
    let mock = MockChain::new();
    let pair: Address = addr(0x77);
    let lifecycle = orchestrator(&mock)
        .execute(TxAction::RemoveLiquidity {
            chain_id: CHAIN,
            pair,
            token_a: addr(0x0a),
            token_b: addr(0x0b),
            liquidity: units(10, 18),
            expected_a: units(1_000, 18),
            expected_b: units(2_000, 6),
        })
        .await
        .unwrap();
    assert!(lifecycle.is_success());
    assert_eq!(lifecycle.action, ActionKind::RemoveLiquidity);

    let sent = mock.written().pop().unwrap();
    let call = removeLiquidityCall::abi_decode(&sent.data, true).unwrap();
    assert_eq!(call.liquidity, units(10, 18));
    assert_eq!(call.amountAMin, units(995, 18));
    assert_eq!(call.amountBMin, units(1_990, 6));
    assert_eq!(mock.tx_events(), vec!["allowance", "approve", "wait", "simulate", "write", "wait"]);
}

#[tokio::test]
async fn test_approving_stage_only_for_short_allowance() {
    let mock = MockChain::new();
    mock.set_allowance(addr(0x0a), user(), router(), U256::MAX);
    let orch = orchestrator(&mock);
    let mut stages = orch.subscribe();

    let lifecycle = orch
        .execute(TxAction::AddLiquidity {
            chain_id: CHAIN,
            token_a: token_a(),
            token_b: token_b(),
            amount_a: units(100, 18),
            amount_b: units(200, 6),
            slippage_pct: None,
        })
        .await
        .unwrap();

    assert!(lifecycle.is_success(), "failure: {:?}", lifecycle.failure);
    assert_eq!(
        mock.tx_events(),
        vec!["allowance", "allowance", "approve", "wait", "simulate", "write", "wait"]
    );
    let approving = lifecycle.stages.iter().filter(|s| **s == TxStage::Approving).count();
    assert_eq!(approving, 1);
    assert_eq!(lifecycle.approval_hashes.len(), 1);
    assert_eq!(*stages.borrow_and_update(), TxStage::Succeeded);
}
