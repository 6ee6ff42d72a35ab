//! API Request Handlers

use alloy_primitives::Address;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::types::*;
use crate::core::cross_chain::CrossChainEstimator;
use crate::core::quote::{QuoteEngine, QuoteRequest};
use crate::core::slippage::resolve;
use crate::core::tax::TaxDetector;
use crate::models::config::{ChainRegistry, EngineConfig};
use crate::models::errors::AppError;
use crate::models::types::TokenRef;
use crate::providers::client::ChainReader;
use crate::utils::cache::TaxCache;
use crate::utils::units::{format_units, parse_positive_units};

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

/// Shared application state
pub struct AppState {
    pub registry: Arc<ChainRegistry>,
    pub quotes: QuoteEngine,
    pub tax: TaxDetector,
    pub cross: CrossChainEstimator,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(registry: Arc<ChainRegistry>, reader: Arc<dyn ChainReader>, config: &EngineConfig) -> Self {
        let cache = TaxCache::with_ttl(config.tax_cache_ttl_secs);

        // Background task: cleanup expired tax readings every 60 seconds
        let cache_clone = cache.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let removed = cache_clone.cleanup_expired();
                if removed > 0 {
                    info!("🧹 Tax cache cleanup: {} expired entries removed", removed);
                }
            }
        });

        Self {
            quotes: QuoteEngine::new(registry.clone(), reader.clone()),
            tax: TaxDetector::with_cache(reader.clone(), cache),
            cross: CrossChainEstimator::new(registry.clone(), reader),
            registry,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Map an engine error to its HTTP status and envelope
fn reject(err: AppError, start: Instant) -> (StatusCode, Json<ApiResponse<()>>) {
    let status = StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        warn!("API error: {}", err);
    }
    (status, Json(ApiResponse::error(ApiError::from(&err), elapsed_ms(start))))
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();
    let stats = state.tax.cache_stats();

    let data = HealthData {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        chains: state.registry.len(),
        tax_cache_entries: stats.entries,
        tax_cache_hit_rate: stats.hit_rate,
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Chains
// ============================================

pub async fn list_chains(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<ChainSummary>>> {
    let start = Instant::now();
    let chains = state.registry.chains().map(ChainSummary::from).collect();
    Json(ApiResponse::success(chains, elapsed_ms(start)))
}

// ============================================
// Quote
// ============================================

pub async fn quote(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuoteApiRequest>,
) -> ApiResult<QuoteData> {
    let start = Instant::now();
    let cfg = state.registry.require(req.chain_id).map_err(|e| reject(e, start))?;

    let token_ref = |input: &TokenInput| match input.address.contract() {
        Some(addr) => TokenRef::erc20(
            req.chain_id,
            addr,
            input.symbol.clone().unwrap_or_default(),
            input.decimals,
        ),
        None => TokenRef::native(req.chain_id, cfg.native_symbol.clone()),
    };
    let token_in = token_ref(&req.token_in);
    let token_out = token_ref(&req.token_out);

    let (tax_in, tax_out) = tokio::join!(
        state.tax.detect_token(&token_in),
        state.tax.detect_token(&token_out)
    );
    let slippage = resolve(req.slippage_mode, req.slippage_pct, tax_in.combine(tax_out));
    let slippage_warning = slippage.validate().err().map(|e| e.message);

    let request = QuoteRequest {
        chain_id: req.chain_id,
        token_in,
        token_out,
        amount: req.amount,
        slippage_bps: slippage.bps,
        blind_min_out: slippage.is_blind(),
    };
    let quote = state.quotes.quote(&request).await.map_err(|e| reject(e, start))?;

    let decimals_out = request.token_out.decimals;
    let data = QuoteData {
        protocol: quote.protocol().as_str().to_string(),
        amount_out_formatted: format_units(quote.amount_out, decimals_out),
        amount_out_min_formatted: format_units(quote.amount_out_min, decimals_out),
        quote,
        slippage,
        slippage_warning,
    };
    Ok(Json(ApiResponse::success(data, elapsed_ms(start))))
}

// ============================================
// Tax
// ============================================

pub async fn get_tax(
    State(state): State<Arc<AppState>>,
    Path((chain_id, token)): Path<(u64, String)>,
) -> ApiResult<TaxData> {
    let start = Instant::now();
    state.registry.require(chain_id).map_err(|e| reject(e, start))?;

    let token: Address = token.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(
                ApiError::bad_request("Invalid token address format"),
                elapsed_ms(start),
            )),
        )
    })?;

    let reading = state.tax.detect(chain_id, token).await;
    Ok(Json(ApiResponse::success(
        TaxData {
            chain_id,
            token,
            reading,
        },
        elapsed_ms(start),
    )))
}

// ============================================
// Slippage
// ============================================

pub async fn resolve_slippage(Json(req): Json<SlippageResolveRequest>) -> Json<ApiResponse<SlippageResolveData>> {
    let start = Instant::now();
    let resolved = resolve(req.mode, req.user_pct, req.tax);
    let warning = resolved.validate().err().map(|e| e.message);

    Json(ApiResponse::success(
        SlippageResolveData {
            resolved,
            valid: warning.is_none(),
            warning,
        },
        elapsed_ms(start),
    ))
}

// ============================================
// Cross-chain
// ============================================

pub async fn cross_estimate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CrossEstimateRequest>,
) -> ApiResult<CrossEstimateData> {
    let start = Instant::now();
    let amount = parse_positive_units(&req.amount, req.decimals).map_err(|e| reject(e, start))?;

    let estimate = state
        .cross
        .estimate(req.src_chain_id, req.dst_chain_id, req.token_out, amount)
        .await
        .map_err(|e| reject(e, start))?;

    Ok(Json(ApiResponse::success(
        CrossEstimateData {
            src_chain_id: estimate.src_chain_id,
            dst_chain_id: estimate.dst_chain_id,
            token_out: estimate.token_out,
            amount_in: estimate.amount_in,
            amount_out: estimate.amount_out,
            fee_tier: estimate.fee_tier,
            executable: estimate.execute().is_ok(),
        },
        elapsed_ms(start),
    )))
}
