//! Integration tests for liquidity reads and cross-chain estimates

mod common;

use alloy_primitives::U256;
use common::*;
use std::sync::Arc;

use ruster_swap::core::amm::MINIMUM_LIQUIDITY;
use ruster_swap::core::cross_chain::CrossChainEstimator;
use ruster_swap::core::liquidity::LiquidityReader;
use ruster_swap::models::errors::ErrorCode;

fn liquidity(mock: &MockChain) -> LiquidityReader {
    LiquidityReader::new(test_registry(), Arc::new(mock.clone()))
}

/// 1000 A / 4000 B, 2000 LP tokens outstanding
fn ab_pair(mock: &MockChain) {
    mock.add_pair(
        addr(0x77),
        addr(0x0a),
        addr(0x0b),
        units(1_000, 18),
        units(4_000, 6),
        units(2_000, 18),
    );
}

#[tokio::test]
async fn test_refresh_position() {
    let mock = MockChain::new();
    ab_pair(&mock);
    mock.set_lp_balance(addr(0x77), user(), units(100, 18));

    let pos = liquidity(&mock).refresh_position(CHAIN, user(), addr(0x77)).await.unwrap();

    assert_eq!(pos.token_a, addr(0x0a));
    assert_eq!(pos.token_b, addr(0x0b));
    assert_eq!(pos.amount_a, units(50, 18));
    assert_eq!(pos.amount_b, units(200, 6));
    assert_eq!(pos.share_pct(), 5.0);
    assert!(!pos.is_empty());
}

#[tokio::test]
async fn test_positions_skip_empty_and_unreadable() {
    let mock = MockChain::new();
    ab_pair(&mock);
    mock.add_pair(addr(0x78), addr(0x0c), addr(0x0d), units(1, 18), units(1, 18), units(1, 18));
    mock.set_lp_balance(addr(0x77), user(), units(1, 18));

    let positions = liquidity(&mock)
        .positions(CHAIN, user(), &[addr(0x77), addr(0x78), addr(0x79)])
        .await;

    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].pair, addr(0x77));
}

#[tokio::test]
async fn test_find_pair() {
    let mock = MockChain::new();
    ab_pair(&mock);
    let reader = liquidity(&mock);

    assert_eq!(reader.find_pair(CHAIN, addr(0x0b), addr(0x0a)).await.unwrap(), Some(addr(0x77)));
    assert_eq!(reader.find_pair(CHAIN, addr(0x0a), addr(0x0c)).await.unwrap(), None);

    let err = reader.find_pair(OTHER_CHAIN, addr(0x0a), addr(0x0b)).await.unwrap_err();
    assert!(err.is_config_gap());
}

#[tokio::test]
async fn test_estimate_add() {
    let mock = MockChain::new();
    ab_pair(&mock);
    let reader = liquidity(&mock);

    let est = reader
        .estimate_add(CHAIN, addr(0x0a), addr(0x0b), units(10, 18), units(40, 6))
        .await
        .unwrap();
    assert_eq!(est.liquidity, units(20, 18));
    assert!(est.share_pct > 0.9 && est.share_pct < 1.0);

    // argument order does not matter
    let flipped = reader
        .estimate_add(CHAIN, addr(0x0b), addr(0x0a), units(40, 6), units(10, 18))
        .await
        .unwrap();
    assert_eq!(flipped.liquidity, est.liquidity);

    // no pair yet: sqrt(a * b) minus the locked minimum, and the whole pool
    let fresh = reader
        .estimate_add(CHAIN, addr(0x0c), addr(0x0d), units(4, 18), units(9, 18))
        .await
        .unwrap();
    assert_eq!(fresh.liquidity, units(6, 18) - U256::from(MINIMUM_LIQUIDITY));
    assert_eq!(fresh.share_pct, 100.0);
}

#[tokio::test]
async fn test_paired_amount_follows_reserves() {
    let mock = MockChain::new();
    ab_pair(&mock);
    mock.add_pair(addr(0x78), addr(0x0c), addr(0x0d), U256::ZERO, U256::ZERO, U256::ZERO);
    let reader = liquidity(&mock);

    let b = reader.paired_amount(CHAIN, addr(0x0a), addr(0x0b), units(10, 18)).await.unwrap();
    assert_eq!(b, Some(units(40, 6)));
    let a = reader.paired_amount(CHAIN, addr(0x0b), addr(0x0a), units(40, 6)).await.unwrap();
    assert_eq!(a, Some(units(10, 18)));

    assert_eq!(reader.paired_amount(CHAIN, addr(0x0c), addr(0x0d), units(1, 18)).await.unwrap(), None);
    assert_eq!(reader.paired_amount(CHAIN, addr(0x0a), addr(0x0e), units(1, 18)).await.unwrap(), None);
}

#[tokio::test]
async fn test_list_pairs_pages() {
    let mock = MockChain::new();
    for n in 0..3u8 {
        mock.add_pair(addr(0x70 + n), addr(n + 1), addr(n + 0x21), units(1, 18), units(1, 18), units(1, 18));
    }
    let reader = liquidity(&mock);

    assert_eq!(reader.list_pairs(CHAIN, 0, 10).await.unwrap(), vec![addr(0x70), addr(0x71), addr(0x72)]);
    assert_eq!(reader.list_pairs(CHAIN, 1, 1).await.unwrap(), vec![addr(0x71)]);
    assert!(reader.list_pairs(CHAIN, 5, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cross_chain_estimate_picks_best_tier() {
    let mock = MockChain::new();
    let token = addr(0x0b);
    mock.add_v3_pool(addr(0xe1), token, 500, units(1_000, 18), units(1_000, 18));
    mock.add_v3_pool(addr(0xe1), token, 3000, units(1_000, 18), units(2_000, 18));
    let estimator = CrossChainEstimator::new(test_registry(), Arc::new(mock.clone()));

    let est = estimator.estimate(CHAIN, OTHER_CHAIN, token, units(1, 18)).await.unwrap();
    assert_eq!(est.fee_tier, Some(3000));
    assert_eq!(est.amount_out, units(1, 18) * units(2_000, 18) / (units(1_000, 18) + units(1, 18)));
    assert_eq!(est.execute().unwrap_err().code, ErrorCode::CrossChainUnsupported);

    let same = estimator.estimate(CHAIN, OTHER_CHAIN, addr(0xe1), units(3, 18)).await.unwrap();
    assert_eq!(same.amount_out, units(3, 18));
    assert_eq!(same.fee_tier, None);

    let none = estimator.estimate(CHAIN, OTHER_CHAIN, addr(0x0c), units(1, 18)).await.unwrap();
    assert_eq!(none.amount_out, U256::ZERO);
    assert_eq!(none.fee_tier, None);

    let err = estimator.estimate(CHAIN, 999, token, units(1, 18)).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigUnsupportedChain);
}
