//! Conversions between token atoms ([`U256`] amounts carrying an implicit
//! number of decimals) and fixed-precision decimals used for USD and price
//! arithmetic.
//!
//! All decimal math in the filler goes through [`rust_decimal::Decimal`]
//! (28 significant digits, banker's rounding) rather than floating point, so
//! repeated conversions do not drift.

use {
    alloy_primitives::U256,
    rust_decimal::{Decimal, prelude::ToPrimitive},
    thiserror::Error,
};

/// Basis-point denominator: 10_000 bps = 100 %.
pub const BPS_DENOMINATOR: u64 = 10_000;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConversionError {
    #[error("amount does not fit the decimal type")]
    Overflow,
    #[error("decimal count {0} exceeds the supported precision")]
    UnsupportedScale(u8),
}

/// Rescales a token amount from one decimal count to another.
///
/// Widening multiplies by a power of ten; narrowing divides and truncates
/// (sub-atom precision is dropped, matching on-chain integer semantics).
pub fn adjust_decimals(amount: U256, from: u8, to: u8) -> U256 {
    match from.cmp(&to) {
        std::cmp::Ordering::Equal => amount,
        std::cmp::Ordering::Less => amount * pow10(to - from),
        std::cmp::Ordering::Greater => amount / pow10(from - to),
    }
}

/// Converts token atoms into a decimal in whole-token units.
pub fn to_decimal(amount: U256, decimals: u8) -> Result<Decimal, ConversionError> {
    if decimals > 28 {
        return Err(ConversionError::UnsupportedScale(decimals));
    }
    let atoms = i128::try_from(amount).map_err(|_| ConversionError::Overflow)?;
    Decimal::try_from_i128_with_scale(atoms, u32::from(decimals))
        .map_err(|_| ConversionError::Overflow)
}

/// Converts a decimal in whole-token units into token atoms, truncating any
/// precision below one atom.
pub fn from_decimal(value: Decimal, decimals: u8) -> Result<U256, ConversionError> {
    if decimals > 28 {
        return Err(ConversionError::UnsupportedScale(decimals));
    }
    let scale = Decimal::from(10u128.pow(u32::from(decimals)));
    let atoms = value
        .checked_mul(scale)
        .ok_or(ConversionError::Overflow)?
        .trunc();
    let atoms = atoms.to_i128().ok_or(ConversionError::Overflow)?;
    let atoms = u128::try_from(atoms).map_err(|_| ConversionError::Overflow)?;
    Ok(U256::from(atoms))
}

fn pow10(exp: u8) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}
