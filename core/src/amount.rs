//! Exact fixed-point amount codec
//!
//! Human amounts are `rust_decimal::Decimal` values (base-10, never binary
//! floating point). On-ledger amounts are integers scaled by `10^decimals`.
//! Any conversion that would lose precision is an error, never a rounding.

use rust_decimal::Decimal;

use crate::error::PayError;
use crate::traits::PayResult;

/// Parse a plain decimal string (`<digits>` or `<digits>.<digits>`)
///
/// Signs, exponents, whitespace and bare separators are rejected.
pub fn parse_amount(s: &str) -> PayResult<Decimal> {
    let (whole, frac) = match s.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (s, None),
    };

    let digits_only = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !digits_only(whole) || !frac.map_or(true, digits_only) {
        return Err(PayError::InvalidAmount(s.to_string()));
    }

    Decimal::from_str_exact(s).map_err(|_| PayError::InvalidAmount(s.to_string()))
}

/// Render an amount without trailing fractional zeros
///
/// The rendered string re-parses to the same scaled integer for any
/// `decimals` the original amount satisfied.
pub fn format_amount(amount: &Decimal) -> String {
    amount.normalize().to_string()
}

/// Number of significant fractional digits in `amount`
pub fn fractional_digits(amount: &Decimal) -> u32 {
    amount.normalize().scale()
}

/// Convert a human amount into base units for an asset with `decimals`
pub fn to_base_units(amount: &Decimal, decimals: u8) -> PayResult<u64> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(PayError::InvalidAmount(format!("{} is negative", amount)));
    }

    let normalized = amount.normalize();
    let scale = normalized.scale();
    if scale > u32::from(decimals) {
        return Err(PayError::InvalidAmount(format!(
            "{} has {} fractional digits, asset allows {}",
            amount, scale, decimals
        )));
    }

    let factor = 10i128
        .checked_pow(u32::from(decimals) - scale)
        .ok_or_else(|| PayError::InvalidAmount(format!("{} overflows base units", amount)))?;

    normalized
        .mantissa()
        .checked_mul(factor)
        .and_then(|units| u64::try_from(units).ok())
        .ok_or_else(|| PayError::InvalidAmount(format!("{} overflows base units", amount)))
}

/// Convert base units back into a human amount; exact inverse of [`to_base_units`]
pub fn from_base_units(units: u64, decimals: u8) -> PayResult<Decimal> {
    Decimal::try_from_i128_with_scale(i128::from(units), u32::from(decimals))
        .map_err(|e| PayError::InvalidAmount(format!("{} decimals unsupported: {}", decimals, e)))
}
