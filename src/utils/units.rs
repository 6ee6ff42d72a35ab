//! Decimal string <-> raw integer amount conversion

use alloy_primitives::U256;

use crate::models::errors::{AppError, AppResult};

/// Parse a human decimal amount ("1.5") into raw units for `decimals`.
/// Digits beyond the token precision are truncated.
pub fn parse_units(amount: &str, decimals: u8) -> AppResult<U256> {
    let s = amount.trim();
    if s.is_empty() {
        return Err(AppError::invalid_amount("Amount is empty"));
    }
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(AppError::invalid_amount(format!("Invalid amount: {}", s)));
    }
    let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(AppError::invalid_amount(format!("Invalid amount: {}", s)));
    }

    let precision = decimals as usize;
    let mut digits = String::with_capacity(int_part.len() + precision);
    digits.push_str(int_part);
    let kept: String = frac_part.chars().take(precision).collect();
    digits.push_str(&kept);
    for _ in kept.len()..precision {
        digits.push('0');
    }
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10)
        .map_err(|_| AppError::invalid_amount(format!("Amount out of range: {}", s)))
}

/// Parse and require a strictly positive amount
pub fn parse_positive_units(amount: &str, decimals: u8) -> AppResult<U256> {
    let raw = parse_units(amount, decimals)?;
    if raw.is_zero() {
        return Err(AppError::invalid_amount("Amount must be greater than zero"));
    }
    Ok(raw)
}

/// Format raw units as a decimal string without trailing zeros
pub fn format_units(raw: U256, decimals: u8) -> String {
    let s = raw.to_string();
    let precision = decimals as usize;
    if precision == 0 {
        return s;
    }
    let padded = if s.len() <= precision {
        format!("{}{}", "0".repeat(precision - s.len() + 1), s)
    } else {
        s
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - precision);
    let frac = frac_part.trim_end_matches('0');
    if frac.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac)
    }
}
