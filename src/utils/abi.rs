//! Contract ABI module
//!
//! `sol!` declarations for every on-chain interface the engine touches
//! (ERC-20, WETH, V2 router/factory/pair, QuoterV2, SwapRouter02), plus
//! helpers for raw getter reads and V3 path packing.

use alloy_primitives::{keccak256, Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

use crate::models::errors::{AppError, AppResult};

sol! {
    // ---------------- ERC-20 ----------------
    function balanceOf(address owner) external view returns (uint256);
    function allowance(address owner, address spender) external view returns (uint256);
    function approve(address spender, uint256 amount) external returns (bool);
    function decimals() external view returns (uint8);
    function symbol() external view returns (string);
    function name() external view returns (string);
    function totalSupply() external view returns (uint256);

    // ---------------- WETH ----------------
    function deposit() external payable;
    function withdraw(uint256 wad) external;

    // ---------------- V2 router ----------------
    function getAmountsOut(
        uint256 amountIn,
        address[] calldata path
    ) external view returns (uint256[] memory amounts);

    function swapExactETHForTokensSupportingFeeOnTransferTokens(
        uint256 amountOutMin,
        address[] calldata path,
        address to,
        uint256 deadline
    ) external payable;

    function swapExactTokensForETHSupportingFeeOnTransferTokens(
        uint256 amountIn,
        uint256 amountOutMin,
        address[] calldata path,
        address to,
        uint256 deadline
    ) external;

    function swapExactTokensForTokensSupportingFeeOnTransferTokens(
        uint256 amountIn,
        uint256 amountOutMin,
        address[] calldata path,
        address to,
        uint256 deadline
    ) external;

    function addLiquidity(
        address tokenA,
        address tokenB,
        uint256 amountADesired,
        uint256 amountBDesired,
        uint256 amountAMin,
        uint256 amountBMin,
        address to,
        uint256 deadline
    ) external returns (uint256 amountA, uint256 amountB, uint256 liquidity);

    function addLiquidityETH(
        address token,
        uint256 amountTokenDesired,
        uint256 amountTokenMin,
        uint256 amountETHMin,
        address to,
        uint256 deadline
    ) external payable returns (uint256 amountToken, uint256 amountETH, uint256 liquidity);

    function removeLiquidity(
        address tokenA,
        address tokenB,
        uint256 liquidity,
        uint256 amountAMin,
        uint256 amountBMin,
        address to,
        uint256 deadline
    ) external returns (uint256 amountA, uint256 amountB);

    // ---------------- V2 factory ----------------
    function getPair(address tokenA, address tokenB) external view returns (address pair);
    function allPairsLength() external view returns (uint256);
    function allPairs(uint256 index) external view returns (address pair);

    // ---------------- V2 pair ----------------
    function getReserves() external view returns (
        uint112 reserve0,
        uint112 reserve1,
        uint32 blockTimestampLast
    );
    function token0() external view returns (address);
    function token1() external view returns (address);

    // ---------------- QuoterV2 ----------------
    struct QuoteExactInputSingleParams {
        address tokenIn;
        address tokenOut;
        uint256 amountIn;
        uint24 fee;
        uint160 sqrtPriceLimitX96;
    }

    function quoteExactInputSingle(
        QuoteExactInputSingleParams memory params
    ) external returns (
        uint256 amountOut,
        uint160 sqrtPriceX96After,
        uint32 initializedTicksCrossed,
        uint256 gasEstimate
    );

    // ---------------- SwapRouter02 ----------------
    struct ExactInputParams {
        bytes path;
        address recipient;
        uint256 amountIn;
        uint256 amountOutMinimum;
    }

    function exactInput(ExactInputParams calldata params) external payable returns (uint256 amountOut);
    function unwrapWETH9(uint256 amountMinimum, address recipient) external payable;
    function multicall(uint256 deadline, bytes[] calldata data) external payable returns (bytes[] memory results);
}

/// Encode a typed call into calldata bytes
#[inline]
pub fn encode<C: SolCall>(call: &C) -> Bytes {
    Bytes::from(call.abi_encode())
}

// ============================================
// Raw getter reads
// ============================================

/// 4-byte selector of a function signature such as `"totalTax()"`
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata for a zero-argument getter
pub fn getter_calldata(name: &str) -> Bytes {
    Bytes::copy_from_slice(&selector(&format!("{}()", name)))
}

/// Read the `index`-th 32-byte word of return data
pub fn word(data: &[u8], index: usize) -> Option<U256> {
    let start = index * 32;
    data.get(start..start + 32).map(U256::from_be_slice)
}

/// Read the first `count` words; `None` if the data is shorter
pub fn words(data: &[u8], count: usize) -> Option<Vec<U256>> {
    (0..count).map(|i| word(data, i)).collect()
}

// ============================================
// V3 path packing
// ============================================

/// Pack `token(20) fee(3) token(20) ...` for SwapRouter02 `exactInput`
pub fn encode_v3_path(tokens: &[Address], fees: &[u32]) -> AppResult<Bytes> {
    if tokens.len() < 2 || fees.len() + 1 != tokens.len() {
        return Err(AppError::invalid_path(format!(
            "V3 path needs one fee per hop ({} tokens, {} fees)",
            tokens.len(),
            fees.len()
        )));
    }
    let mut out = Vec::with_capacity(tokens.len() * 20 + fees.len() * 3);
    for (i, token) in tokens.iter().enumerate() {
        out.extend_from_slice(token.as_slice());
        if let Some(fee) = fees.get(i) {
            if *fee >= 1 << 24 {
                return Err(AppError::invalid_path(format!("Fee tier {} exceeds uint24", fee)));
            }
            out.extend_from_slice(&fee.to_be_bytes()[1..]);
        }
    }
    Ok(Bytes::from(out))
}
