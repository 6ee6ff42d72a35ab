//! RusterSwap API Server
//!
//! REST API for multichain swap quotes, token tax detection and
//! slippage resolution.
//!
//! Usage:
//!   cargo run --bin ruster_swap_api
//!
//! Environment:
//!   PORT / RUSTER_PORT - Server port (default: 8080)
//!   RUSTER_HOST        - Server host (default: 0.0.0.0)
//!   <CHAIN>_HTTP_URL   - Per-chain RPC override (e.g. BSC_HTTP_URL)
//!   RUST_LOG           - Log filter (default: info)

use ruster_swap::api::{create_router, handlers::AppState, start_cleanup_task};
use ruster_swap::models::config::{ApiConfig, ChainRegistry, EngineConfig};
use ruster_swap::providers::RpcManager;
use ruster_swap::utils::constants::{APP_NAME, APP_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    print_banner();

    let engine = EngineConfig::default();
    let api = ApiConfig::default();

    let registry = Arc::new(ChainRegistry::builtin());
    let rpc = RpcManager::new().with_receipt_polling(engine.receipt_poll_interval, engine.receipt_timeout);
    for cfg in registry.chains() {
        if !rpc.is_supported(cfg.chain_id) {
            warn!("⚠️ No RPC for {} ({}); requests for it will fail", cfg.name, cfg.chain_id);
        }
    }
    info!("🔗 {} chains registered", registry.len());

    let state = Arc::new(AppState::new(registry, Arc::new(rpc), &engine));

    start_cleanup_task();
    info!("🧹 Background cleanup task started");

    let app = create_router(state);
    let addr: SocketAddr = api.bind_addr().parse()?;

    info!("🚀 {} API v{} starting on http://{}", APP_NAME, APP_VERSION, addr);
    info!("");
    info!("Endpoints:");
    info!("  GET  /v1/health               - Health check");
    info!("  GET  /v1/chains               - Supported chains");
    info!("  POST /v1/quote                - Best-route swap quote");
    info!("  GET  /v1/tax/:chain_id/:token - Token transfer tax");
    info!("  POST /v1/slippage/resolve     - Effective slippage");
    info!("  POST /v1/cross/estimate       - Indicative cross-chain output");
    info!("");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("👋 {} API shutdown complete", APP_NAME);
    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ╔══════════════════════════════════════════════╗
    ║                                              ║
    ║        R U S T E R   S W A P   v0.1.0        ║
    ║     Multichain quoting & execution engine    ║
    ║                                              ║
    ╚══════════════════════════════════════════════╝
    "#
    );
}
