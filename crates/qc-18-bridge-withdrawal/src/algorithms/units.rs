//! # Base Unit Conversion
//!
//! Decimal text to on-chain integer amounts without floating point.

use crate::domain::EncodingError;
use primitive_types::U256;

/// Scale a decimal amount by `decimals`.
///
/// The fractional part is padded or truncated to exactly `decimals` digits,
/// concatenated with the integer part and parsed as a 256-bit integer.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256, EncodingError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(EncodingError::new("amount", "empty"));
    }
    if trimmed.starts_with('-') {
        return Err(EncodingError::new("amount", "negative value"));
    }

    let (integer, fraction) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };
    if integer.is_empty() && fraction.is_empty() {
        return Err(EncodingError::new("amount", "no digits"));
    }
    if !integer.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(EncodingError::new(
            "amount",
            format!("'{}' is not a decimal number", trimmed),
        ));
    }

    let scale = decimals as usize;
    let mut digits = String::with_capacity(integer.len() + scale);
    digits.push_str(integer);
    if fraction.len() >= scale {
        digits.push_str(&fraction[..scale]);
    } else {
        digits.push_str(fraction);
        digits.extend(std::iter::repeat('0').take(scale - fraction.len()));
    }

    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_dec_str(significant)
        .map_err(|_| EncodingError::new("amount", format!("'{}' overflows uint256", trimmed)))
}

/// Render base units as a decimal amount, trailing zeros trimmed.
pub fn from_base_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let scale = decimals as usize;
    if scale == 0 {
        return digits;
    }
    let padded = if digits.len() <= scale {
        format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
    } else {
        digits
    };
    let (integer, fraction) = padded.split_at(padded.len() - scale);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{}.{}", integer, fraction)
    }
}
