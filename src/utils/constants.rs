//! Constants Module - Single Source of Truth
//!
//! Every chain id, deployed contract address, fee tier and RPC endpoint used
//! by the engine is defined here. Other modules look these up through the
//! `get_*` helpers (or through `ChainRegistry`) and never hardcode them.

use alloy_primitives::Address;
use std::str::FromStr;

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "RusterSwap";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for HTTP requests
pub const USER_AGENT: &str = "RusterSwap/0.1.0";

// ============================================
// RPC CONSTANTS
// ============================================

/// Default timeout for RPC requests (seconds)
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;

/// Default tax cache TTL (seconds)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

// ============================================
// SWAP CONSTANTS
// ============================================

/// Default transaction deadline (minutes from now)
pub const DEFAULT_DEADLINE_MINUTES: u64 = 20;

/// Deadline used for liquidity removal (minutes from now)
pub const REMOVE_LIQUIDITY_DEADLINE_MINUTES: u64 = 15;

/// Default receipt polling interval (milliseconds)
pub const DEFAULT_RECEIPT_POLL_MS: u64 = 1_500;

/// Default receipt wait timeout (seconds)
pub const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 180;

/// Default slippage for liquidity provisioning (percent)
pub const DEFAULT_LP_SLIPPAGE_PCT: f64 = 0.5;

/// Upper bound for any slippage or tax percentage
pub const MAX_SLIPPAGE_PCT: f64 = 50.0;

/// Basis-point denominator
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Fee tiers used when a chain lists none
pub const DEFAULT_FEE_TIERS: [u32; 3] = [500, 2_500, 10_000];

/// Fee tiers assumed for a cross-chain destination without its own list
pub const DEFAULT_CROSS_CHAIN_FEE_TIERS: [u32; 3] = [500, 3_000, 10_000];

/// Balance refresh schedule after a confirmed transaction (milliseconds)
pub const REFRESH_BURST_SCHEDULE_MS: [u64; 4] = [0, 1_200, 3_000, 6_000];

/// SwapRouter02 sentinel recipient meaning "the router itself"
pub const ROUTER_ADDRESS_THIS: Address = Address::new([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2,
]);

// ============================================
// CHAIN IDS - Single Source of Truth
// ============================================

/// Ethereum Mainnet
pub const CHAIN_ID_ETHEREUM: u64 = 1;
/// BNB Smart Chain
pub const CHAIN_ID_BSC: u64 = 56;
/// BNB Smart Chain Testnet
pub const CHAIN_ID_BSC_TESTNET: u64 = 97;
/// Airon Testnet
pub const CHAIN_ID_AIRON_TESTNET: u64 = 2030;
/// Base
pub const CHAIN_ID_BASE: u64 = 8453;
/// Arbitrum One
pub const CHAIN_ID_ARBITRUM: u64 = 42161;
/// Base Sepolia
pub const CHAIN_ID_BASE_SEPOLIA: u64 = 84532;
/// Arbitrum Sepolia
pub const CHAIN_ID_ARBITRUM_SEPOLIA: u64 = 421614;
/// Ethereum Sepolia
pub const CHAIN_ID_SEPOLIA: u64 = 11155111;

/// All built-in chain IDs (mainnets first)
pub const SUPPORTED_CHAIN_IDS: [u64; 9] = [
    CHAIN_ID_BSC,
    CHAIN_ID_ETHEREUM,
    CHAIN_ID_ARBITRUM,
    CHAIN_ID_BASE,
    CHAIN_ID_BSC_TESTNET,
    CHAIN_ID_SEPOLIA,
    CHAIN_ID_ARBITRUM_SEPOLIA,
    CHAIN_ID_BASE_SEPOLIA,
    CHAIN_ID_AIRON_TESTNET,
];

/// Testnet chain IDs
pub const TESTNET_CHAIN_IDS: [u64; 5] = [
    CHAIN_ID_BSC_TESTNET,
    CHAIN_ID_SEPOLIA,
    CHAIN_ID_ARBITRUM_SEPOLIA,
    CHAIN_ID_BASE_SEPOLIA,
    CHAIN_ID_AIRON_TESTNET,
];

/// Parse a hex address literal from the tables below
#[inline]
fn parse_addr(addr: &str) -> Option<Address> {
    Address::from_str(addr).ok()
}

// ============================================
// WRAPPED NATIVE ADDRESSES
// ============================================

/// Get WETH/WBNB/wrapped-native address for a chain
pub fn get_wrapped_native(chain_id: u64) -> Option<Address> {
    let addr = match chain_id {
        CHAIN_ID_BSC => "0xBB4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c",
        CHAIN_ID_ETHEREUM => "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
        CHAIN_ID_ARBITRUM => "0x82af49447d8a07e3bd95bd0d56f35241523fbab1",
        CHAIN_ID_BASE => "0x4200000000000000000000000000000000000006",
        CHAIN_ID_BSC_TESTNET => "0xae13d989daC2f0dEbFf460aC112a837C89BAa7cd",
        CHAIN_ID_SEPOLIA => "0xfFf9976782d46CC05630D1f6eBAb18b2324d6B14",
        CHAIN_ID_ARBITRUM_SEPOLIA => "0x1bdc540dEB9Ed1fA29964DeEcCc524A8f5e2198e",
        CHAIN_ID_BASE_SEPOLIA => "0x4200000000000000000000000000000000000006",
        CHAIN_ID_AIRON_TESTNET => "0x11C43293631a7c810918A10164016cEe458ac64D",
        _ => return None,
    };
    parse_addr(addr)
}

// ============================================
// V2 ROUTER / FACTORY ADDRESSES
// ============================================

/// Get the constant-product (V2) router for a chain
pub fn get_router_v2(chain_id: u64) -> Option<Address> {
    let addr = match chain_id {
        CHAIN_ID_BSC => "0x10ED43C718714eb63d5aA57B78B54704E256024E",
        CHAIN_ID_ETHEREUM => "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D",
        CHAIN_ID_BASE | CHAIN_ID_ARBITRUM | CHAIN_ID_ARBITRUM_SEPOLIA | CHAIN_ID_BASE_SEPOLIA => {
            "0x8cFe327CEc66d1C090Dd72bd0FF11d690C33a2Eb"
        }
        CHAIN_ID_BSC_TESTNET => "0xD99D1c33F9fC3444f8101754aBC46c52416550D1",
        CHAIN_ID_SEPOLIA => "0xeE567Fe1712Faf6149d80dA1E6934E354124CfE3",
        CHAIN_ID_AIRON_TESTNET => "0x224cd6F72660fE1eFA650255a2bCa9670b4d38c1",
        _ => return None,
    };
    parse_addr(addr)
}

/// Get the V2 factory for a chain
pub fn get_factory_v2(chain_id: u64) -> Option<Address> {
    let addr = match chain_id {
        CHAIN_ID_BSC => "0xcA143Ce32Fe78f1f7019d7d551a6402fC5350c73",
        CHAIN_ID_ETHEREUM => "0x5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f",
        CHAIN_ID_BASE | CHAIN_ID_ARBITRUM | CHAIN_ID_ARBITRUM_SEPOLIA | CHAIN_ID_BASE_SEPOLIA => {
            "0x02a84c1b3BBD7401a5f7fa98a384EBC70bB5749E"
        }
        CHAIN_ID_BSC_TESTNET => "0x6725F303b657a9451d8BA641348b6761A6CC7a17",
        CHAIN_ID_SEPOLIA => "0xF62c03E08ada871A0bEb309762E260a7a6a880E6",
        CHAIN_ID_AIRON_TESTNET => "0xA65CB0c559aA59dcB40e256A2DBAAa403181Bd11",
        _ => return None,
    };
    parse_addr(addr)
}

// ============================================
// V3 QUOTER / SWAP ROUTER ADDRESSES
// ============================================

/// Get the concentrated-liquidity QuoterV2 for a chain
pub fn get_quoter_v3(chain_id: u64) -> Option<Address> {
    let addr = match chain_id {
        CHAIN_ID_ETHEREUM | CHAIN_ID_ARBITRUM => "0x61fFE014bA17989E743c5F6cB21Bf9697530B21e",
        CHAIN_ID_BASE => "0x3d4e44Eb1374240CE5F1B871ab261CD16335B76a",
        _ => return None,
    };
    parse_addr(addr)
}

/// Get the SwapRouter02 used to execute V3 routes
pub fn get_swap_router_v3(chain_id: u64) -> Option<Address> {
    let addr = match chain_id {
        CHAIN_ID_ETHEREUM | CHAIN_ID_ARBITRUM => "0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45",
        CHAIN_ID_BASE => "0x2626664c2603336E57B271c5C0b26F421741e481",
        _ => return None,
    };
    parse_addr(addr)
}

/// Get V3 fee tiers (hundredths of a bip) for a chain
pub fn get_fee_tiers(chain_id: u64) -> Vec<u32> {
    match chain_id {
        CHAIN_ID_BSC => vec![500, 2_500, 10_000],
        CHAIN_ID_ETHEREUM | CHAIN_ID_ARBITRUM | CHAIN_ID_BASE => vec![500, 3_000, 10_000],
        _ => vec![],
    }
}

// ============================================
// STABLE BRIDGE TOKENS
// ============================================

/// Get stablecoins used as intermediate hops for a chain
pub fn get_stable_bridges(chain_id: u64) -> Vec<Address> {
    let addrs: &[&str] = match chain_id {
        CHAIN_ID_BSC => &[
            "0x55d398326f99059fF775485246999027B3197955", // USDT
            "0x8ac76a51cc950d9822d68b83fe1ad97b32cd580d", // USDC
            "0xe9e7cea3dedca5984780bafc599bd69add087d56", // BUSD
        ],
        CHAIN_ID_ETHEREUM => &[
            "0xdAC17F958D2ee523a2206206994597C13D831ec7", // USDT
            "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", // USDC
        ],
        CHAIN_ID_ARBITRUM => &["0xFF970A61A04b1cA14834A43f5de4533ebDDB5CC8"], // USDC.e
        CHAIN_ID_BASE => &["0x833589fCD6EDB6E08f4c7C32D4f71B54B2689996"], // USDC
        _ => &[],
    };
    addrs.iter().filter_map(|a| parse_addr(a)).collect()
}

// ============================================
// PUBLIC RPC FALLBACKS
// ============================================

/// Get public RPC fallback URL for a chain
pub fn get_public_rpc_fallback(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        CHAIN_ID_BSC => Some("https://bsc-rpc.publicnode.com"),
        CHAIN_ID_ETHEREUM => Some("https://eth.drpc.org"),
        CHAIN_ID_ARBITRUM => Some("https://arb1.arbitrum.io/rpc"),
        CHAIN_ID_BASE => Some("https://base-rpc.publicnode.com"),
        CHAIN_ID_BSC_TESTNET => Some("https://bsc-testnet-rpc.publicnode.com"),
        CHAIN_ID_SEPOLIA => Some("https://sepolia.drpc.org"),
        CHAIN_ID_ARBITRUM_SEPOLIA => Some("https://sepolia-rollup.arbitrum.io/rpc"),
        CHAIN_ID_BASE_SEPOLIA => Some("https://sepolia.base.org"),
        CHAIN_ID_AIRON_TESTNET => Some("https://rpc-testnet.airon.network"),
        _ => None,
    }
}

/// Environment variable that overrides the RPC URL of a chain
pub fn get_rpc_env_key(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        CHAIN_ID_BSC => Some("BSC_HTTP_URL"),
        CHAIN_ID_ETHEREUM => Some("ETH_HTTP_URL"),
        CHAIN_ID_ARBITRUM => Some("ARBITRUM_HTTP_URL"),
        CHAIN_ID_BASE => Some("BASE_HTTP_URL"),
        CHAIN_ID_BSC_TESTNET => Some("BSC_TESTNET_HTTP_URL"),
        CHAIN_ID_SEPOLIA => Some("SEPOLIA_HTTP_URL"),
        CHAIN_ID_ARBITRUM_SEPOLIA => Some("ARBITRUM_SEPOLIA_HTTP_URL"),
        CHAIN_ID_BASE_SEPOLIA => Some("BASE_SEPOLIA_HTTP_URL"),
        CHAIN_ID_AIRON_TESTNET => Some("AIRON_HTTP_URL"),
        _ => None,
    }
}

// ============================================
// CHAIN METADATA
// ============================================

/// Get chain name
pub fn get_chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        CHAIN_ID_BSC => "BNB Chain",
        CHAIN_ID_ETHEREUM => "Ethereum",
        CHAIN_ID_ARBITRUM => "Arbitrum",
        CHAIN_ID_BASE => "Base",
        CHAIN_ID_BSC_TESTNET => "BNB Testnet",
        CHAIN_ID_SEPOLIA => "ETH Sepolia",
        CHAIN_ID_ARBITRUM_SEPOLIA => "ARB Testnet",
        CHAIN_ID_BASE_SEPOLIA => "Base Testnet",
        CHAIN_ID_AIRON_TESTNET => "Airon Testnet",
        _ => "Unknown",
    }
}

/// Get native token symbol
pub fn get_native_symbol(chain_id: u64) -> &'static str {
    match chain_id {
        CHAIN_ID_BSC => "BNB",
        CHAIN_ID_BSC_TESTNET => "tBNB",
        CHAIN_ID_AIRON_TESTNET => "tAIR",
        _ => "ETH",
    }
}

/// Get block explorer URL
pub fn get_explorer_url(chain_id: u64) -> &'static str {
    match chain_id {
        CHAIN_ID_ETHEREUM => "https://etherscan.io",
        CHAIN_ID_BSC => "https://bscscan.com",
        CHAIN_ID_BSC_TESTNET => "https://testnet.bscscan.com",
        CHAIN_ID_BASE => "https://basescan.org",
        CHAIN_ID_BASE_SEPOLIA => "https://sepolia.basescan.org",
        CHAIN_ID_ARBITRUM => "https://arbiscan.io",
        CHAIN_ID_ARBITRUM_SEPOLIA => "https://sepolia.arbiscan.io",
        CHAIN_ID_SEPOLIA => "https://sepolia.etherscan.io",
        CHAIN_ID_AIRON_TESTNET => "https://testnet.aironscan.com",
        _ => "https://etherscan.io",
    }
}

/// Check if chain ID is built in
#[inline]
pub fn is_chain_supported(chain_id: u64) -> bool {
    SUPPORTED_CHAIN_IDS.contains(&chain_id)
}

/// Check if chain ID is a testnet
#[inline]
pub fn is_testnet(chain_id: u64) -> bool {
    TESTNET_CHAIN_IDS.contains(&chain_id)
}
