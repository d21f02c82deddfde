//! Human decimal strings <-> integer base units, and address checks.

use crate::error::{BridgeError, Result};
use alloy_primitives::{Address, U256};

/// Parses `amount` into base units scaled by `10^decimals`, exactly.
pub fn parse_token_amount(amount: &str, decimals: u8) -> Result<U256> {
    let (whole_part, fraction_part) = split_decimal(amount)?;
    if fraction_part.len() > decimals as usize {
        return Err(BridgeError::PrecisionExceeded {
            amount: amount.trim().to_string(),
            decimals,
        });
    }

    let overflow = || invalid(amount, "amount does not fit in 256 bits");
    let base = pow10(u32::from(decimals)).ok_or_else(overflow)?;
    let whole = parse_digits(whole_part, amount)?;
    let mut value = whole.checked_mul(base).ok_or_else(overflow)?;

    if !fraction_part.is_empty() {
        let fraction = parse_digits(fraction_part, amount)?;
        let scale = pow10(u32::from(decimals) - fraction_part.len() as u32).ok_or_else(overflow)?;
        value = value
            .checked_add(fraction * scale)
            .ok_or_else(overflow)?;
    }

    Ok(value)
}

/// Syntax and sign check that needs no decimals, so it can run before any lookup.
pub fn validate_human_amount(amount: &str) -> Result<()> {
    let (whole_part, fraction_part) = split_decimal(amount)?;
    let non_zero = whole_part
        .bytes()
        .chain(fraction_part.bytes())
        .any(|digit| digit != b'0');
    if !non_zero {
        return Err(invalid(amount, "amount must be greater than zero"));
    }
    Ok(())
}

pub fn parse_positive_amount(amount: &str, decimals: u8) -> Result<U256> {
    validate_human_amount(amount)?;
    parse_token_amount(amount, decimals)
}

/// Format a base-unit value with the given decimals.
pub fn format_units(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let decimals = decimals as usize;
    let mut digits = value.to_string();
    if digits.len() <= decimals {
        let zeros = "0".repeat(decimals + 1 - digits.len());
        digits = format!("{zeros}{digits}");
    }
    let split = digits.len() - decimals;
    let mut out = format!("{}.{}", &digits[..split], &digits[split..]);
    while out.ends_with('0') {
        out.pop();
    }
    if out.ends_with('.') {
        out.pop();
    }
    out
}

/// Accepts `0x` + 40 hex digits. Mixed-case input must carry a valid EIP-55 checksum.
pub fn validate_address(address: &str) -> Result<Address> {
    let trimmed = address.trim();
    let Some(body) = trimmed.strip_prefix("0x") else {
        return Err(invalid_address(address, "missing 0x prefix"));
    };
    if body.len() != 40 {
        return Err(invalid_address(
            address,
            &format!("expected 40 hex digits, got {}", body.len()),
        ));
    }
    if !body.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return Err(invalid_address(address, "contains non-hex characters"));
    }

    let has_lower = body.bytes().any(|byte| byte.is_ascii_lowercase());
    let has_upper = body.bytes().any(|byte| byte.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(trimmed, None)
            .map_err(|_| invalid_address(address, "checksum mismatch"));
    }
    trimmed
        .parse::<Address>()
        .map_err(|err| invalid_address(address, &err.to_string()))
}

fn split_decimal(amount: &str) -> Result<(&str, &str)> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(invalid(amount, "amount is empty"));
    }
    let mut parts = trimmed.split('.');
    let whole_part = parts.next().unwrap_or_default();
    let fraction_part = parts.next().unwrap_or_default();
    if parts.next().is_some() {
        return Err(invalid(amount, "more than one decimal point"));
    }
    if whole_part.is_empty() && fraction_part.is_empty() {
        return Err(invalid(amount, "no digits"));
    }
    let all_digits = whole_part
        .bytes()
        .chain(fraction_part.bytes())
        .all(|byte| byte.is_ascii_digit());
    if !all_digits {
        return Err(invalid(amount, "not a decimal number"));
    }
    Ok((whole_part, fraction_part))
}

fn parse_digits(digits: &str, amount: &str) -> Result<U256> {
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).map_err(|_| invalid(amount, "amount does not fit in 256 bits"))
}

fn pow10(exp: u32) -> Option<U256> {
    let mut value = U256::from(1u64);
    for _ in 0..exp {
        value = value.checked_mul(U256::from(10u64))?;
    }
    Some(value)
}

fn invalid(amount: &str, reason: &str) -> BridgeError {
    BridgeError::InvalidAmount {
        amount: amount.to_string(),
        reason: reason.to_string(),
    }
}

fn invalid_address(address: &str, reason: &str) -> BridgeError {
    BridgeError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    }
}
