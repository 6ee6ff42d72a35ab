//! Configuration module for the swap engine
//!
//! Chain data comes from utils/constants.rs; runtime knobs come from
//! environment variables with sane defaults.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::utils::constants::{
    get_chain_name, get_explorer_url, get_factory_v2, get_fee_tiers, get_native_symbol, get_public_rpc_fallback,
    get_quoter_v3, get_router_v2, get_rpc_env_key, get_stable_bridges, get_swap_router_v3,
    get_wrapped_native, is_testnet, DEFAULT_CACHE_TTL_SECS, DEFAULT_DEADLINE_MINUTES,
    DEFAULT_FEE_TIERS, DEFAULT_LP_SLIPPAGE_PCT, DEFAULT_RECEIPT_POLL_MS,
    DEFAULT_RECEIPT_TIMEOUT_SECS, REMOVE_LIQUIDITY_DEADLINE_MINUTES, SUPPORTED_CHAIN_IDS,
};

lazy_static::lazy_static! {
    /// Registry built from the constants table, shared by the API binary
    pub static ref BUILTIN_REGISTRY: ChainRegistry = ChainRegistry::builtin();
}

/// Deployment data for one network. Every contract is optional; callers
/// degrade the matching feature when it is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub native_symbol: String,
    pub wrapped_native: Option<Address>,
    pub router_v2: Option<Address>,
    pub factory_v2: Option<Address>,
    pub quoter_v3: Option<Address>,
    pub swap_router_v3: Option<Address>,
    pub fee_tiers: Vec<u32>,
    pub stable_bridges: Vec<Address>,
    pub testnet: bool,
    #[serde(default)]
    pub explorer_url: Option<String>,
}

impl ChainConfig {
    /// Bare chain with no contracts configured
    pub fn new(chain_id: u64, name: impl Into<String>, native_symbol: impl Into<String>) -> Self {
        Self {
            chain_id,
            name: name.into(),
            native_symbol: native_symbol.into(),
            wrapped_native: None,
            router_v2: None,
            factory_v2: None,
            quoter_v3: None,
            swap_router_v3: None,
            fee_tiers: Vec::new(),
            stable_bridges: Vec::new(),
            testnet: false,
            explorer_url: None,
        }
    }

    /// Load a chain from the constants table
    pub fn builtin(chain_id: u64) -> Option<Self> {
        if !SUPPORTED_CHAIN_IDS.contains(&chain_id) {
            return None;
        }
        let mut cfg = Self::new(chain_id, get_chain_name(chain_id), get_native_symbol(chain_id));
        cfg.wrapped_native = get_wrapped_native(chain_id);
        cfg.router_v2 = get_router_v2(chain_id);
        cfg.factory_v2 = get_factory_v2(chain_id);
        cfg.quoter_v3 = get_quoter_v3(chain_id);
        cfg.swap_router_v3 = get_swap_router_v3(chain_id);
        cfg.fee_tiers = get_fee_tiers(chain_id);
        cfg.testnet = is_testnet(chain_id);
        cfg.explorer_url = Some(get_explorer_url(chain_id).to_string());
        Some(cfg.with_stable_bridges(get_stable_bridges(chain_id)))
    }

    /// Explorer link for a transaction, when the chain has an explorer
    pub fn tx_url(&self, hash: impl std::fmt::Display) -> Option<String> {
        self.explorer_url
            .as_deref()
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), hash))
    }

    pub fn with_wrapped_native(mut self, addr: Address) -> Self {
        self.wrapped_native = Some(addr);
        self
    }

    pub fn with_router_v2(mut self, addr: Address) -> Self {
        self.router_v2 = Some(addr);
        self
    }

    pub fn with_factory_v2(mut self, addr: Address) -> Self {
        self.factory_v2 = Some(addr);
        self
    }

    pub fn with_quoter_v3(mut self, addr: Address) -> Self {
        self.quoter_v3 = Some(addr);
        self
    }

    pub fn with_swap_router_v3(mut self, addr: Address) -> Self {
        self.swap_router_v3 = Some(addr);
        self
    }

    pub fn with_fee_tiers(mut self, tiers: Vec<u32>) -> Self {
        let mut out: Vec<u32> = Vec::with_capacity(tiers.len());
        for tier in tiers {
            if !out.contains(&tier) {
                out.push(tier);
            }
        }
        self.fee_tiers = out;
        self
    }

    /// Stable bridges have set semantics; duplicates are dropped in order
    pub fn with_stable_bridges(mut self, stables: Vec<Address>) -> Self {
        let mut out: Vec<Address> = Vec::with_capacity(stables.len());
        for stable in stables {
            if !out.contains(&stable) {
                out.push(stable);
            }
        }
        self.stable_bridges = out;
        self
    }

    /// Configured fee tiers, or the default set when none are listed
    pub fn effective_fee_tiers(&self) -> Vec<u32> {
        if self.fee_tiers.is_empty() {
            DEFAULT_FEE_TIERS.to_vec()
        } else {
            self.fee_tiers.clone()
        }
    }

    pub fn is_wrapped_native(&self, addr: Address) -> bool {
        self.wrapped_native == Some(addr)
    }

    pub fn require_router_v2(&self) -> AppResult<Address> {
        self.router_v2
            .ok_or_else(|| AppError::router_not_configured(self.chain_id))
    }

    pub fn require_wrapped_native(&self) -> AppResult<Address> {
        self.wrapped_native
            .ok_or_else(|| AppError::missing_contract("Wrapped native token", self.chain_id))
    }

    pub fn require_factory_v2(&self) -> AppResult<Address> {
        self.factory_v2
            .ok_or_else(|| AppError::missing_contract("Factory V2", self.chain_id))
    }

    pub fn require_quoter_v3(&self) -> AppResult<Address> {
        self.quoter_v3
            .ok_or_else(|| AppError::missing_contract("Quoter V3", self.chain_id))
    }

    pub fn require_swap_router_v3(&self) -> AppResult<Address> {
        self.swap_router_v3
            .ok_or_else(|| AppError::router_not_configured(self.chain_id))
    }

    /// RPC URL: `<CHAIN>_HTTP_URL` override, else the public endpoint
    pub fn rpc_url(&self) -> Option<String> {
        get_rpc_env_key(self.chain_id)
            .and_then(|key| std::env::var(key).ok())
            .filter(|url| !url.is_empty())
            .or_else(|| get_public_rpc_fallback(self.chain_id).map(String::from))
    }
}

/// Immutable lookup table keyed by chain id
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<u64, ChainConfig>,
}

impl ChainRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every chain from the constants table
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for &chain_id in &SUPPORTED_CHAIN_IDS {
            if let Some(cfg) = ChainConfig::builtin(chain_id) {
                if let Err(e) = registry.insert(cfg) {
                    warn!("⚠️ Skipping chain {}: {}", chain_id, e);
                }
            }
        }
        info!("🔗 Chain registry loaded: {} chains", registry.len());
        registry
    }

    /// Add a chain; duplicate ids are rejected
    pub fn insert(&mut self, cfg: ChainConfig) -> AppResult<()> {
        if self.chains.contains_key(&cfg.chain_id) {
            return Err(AppError::new(
                ErrorCode::ConfigDuplicateChain,
                format!("Chain {} registered twice", cfg.chain_id),
            ));
        }
        self.chains.insert(cfg.chain_id, cfg);
        Ok(())
    }

    /// Build from a list, failing on the first duplicate
    pub fn from_configs(configs: impl IntoIterator<Item = ChainConfig>) -> AppResult<Self> {
        let mut registry = Self::new();
        for cfg in configs {
            registry.insert(cfg)?;
        }
        Ok(registry)
    }

    /// Pure lookup
    pub fn get(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.get(&chain_id)
    }

    /// Lookup that reports an unsupported chain
    pub fn require(&self, chain_id: u64) -> AppResult<&ChainConfig> {
        self.get(chain_id)
            .ok_or_else(|| AppError::unsupported_chain(chain_id))
    }

    pub fn chains(&self) -> impl Iterator<Item = &ChainConfig> {
        self.chains.values()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

/// Read an environment variable, falling back to `default` when unset or unparsable
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Runtime knobs for the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deadline for swaps and liquidity adds (minutes from now)
    pub deadline_minutes: u64,
    /// Deadline for liquidity removal (minutes from now)
    pub remove_deadline_minutes: u64,
    /// Receipt polling interval
    pub receipt_poll_interval: Duration,
    /// Give up waiting for a receipt after this long
    pub receipt_timeout: Duration,
    /// Tax detection cache TTL (seconds)
    pub tax_cache_ttl_secs: u64,
    /// Slippage applied to liquidity mins (percent)
    pub lp_slippage_pct: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deadline_minutes: env_or("SWAP_DEADLINE_MINUTES", DEFAULT_DEADLINE_MINUTES),
            remove_deadline_minutes: env_or(
                "SWAP_REMOVE_DEADLINE_MINUTES",
                REMOVE_LIQUIDITY_DEADLINE_MINUTES,
            ),
            receipt_poll_interval: Duration::from_millis(env_or(
                "SWAP_RECEIPT_POLL_MS",
                DEFAULT_RECEIPT_POLL_MS,
            )),
            receipt_timeout: Duration::from_secs(env_or(
                "SWAP_RECEIPT_TIMEOUT_SECS",
                DEFAULT_RECEIPT_TIMEOUT_SECS,
            )),
            tax_cache_ttl_secs: env_or("SWAP_TAX_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS),
            lp_slippage_pct: env_or("SWAP_LP_SLIPPAGE_PCT", DEFAULT_LP_SLIPPAGE_PCT),
        }
    }
}

/// HTTP service settings
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let port = std::env::var("PORT")
            .or_else(|_| std::env::var("RUSTER_PORT"))
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        Self {
            host: std::env::var("RUSTER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
        }
    }
}

impl ApiConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
