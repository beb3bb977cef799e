//! Fixed-point helpers for currency and hour values.
//!
//! Internal arithmetic always keeps full `Decimal` precision. Rounding happens
//! only when a value leaves the process (JSON, rendered documents).

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};

use crate::errors::DomainError;

/// Largest device or unit quantity accepted on any single request.
pub const MAX_QUANTITY: u32 = 1_000_000;

/// Largest absolute price, rate, hour figure or line amount accepted from callers.
///
/// Bounded inputs keep every product and sum in the cost pipeline far below
/// `Decimal::MAX`, so the arithmetic itself never has to fail.
pub fn max_amount() -> Decimal {
    Decimal::new(1_000_000_000_000, 0)
}

/// `value` must lie within `0..=max_amount()`.
pub fn ensure_amount(field: &str, value: Decimal) -> Result<(), DomainError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(DomainError::out_of_range(field, "must not be negative"));
    }
    if value > max_amount() {
        return Err(DomainError::out_of_range(field, format!("must be at most {}", max_amount())));
    }
    Ok(())
}

pub fn ensure_quantity(field: &str, value: u64) -> Result<(), DomainError> {
    if value > u64::from(MAX_QUANTITY) {
        return Err(DomainError::out_of_range(field, format!("must be at most {MAX_QUANTITY}")));
    }
    Ok(())
}

/// Round half-up (away from zero) to cents, always carrying two places.
pub fn round_currency(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Hours are displayed with the same two-place precision as money.
pub fn round_hours(value: Decimal) -> Decimal {
    round_currency(value)
}

/// `1,234.50` style rendering used by printable documents.
pub fn format_currency(value: Decimal) -> String {
    let rounded = round_currency(value);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let mut magnitude = rounded.abs();
    magnitude.rescale(2);
    let text = magnitude.to_string();
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if negative {
        format!("-{grouped}.{cents}")
    } else {
        format!("{grouped}.{cents}")
    }
}

pub fn serialize_currency<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    Serialize::serialize(&round_currency(*value), serializer)
}

pub fn serialize_hours<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    Serialize::serialize(&round_hours(*value), serializer)
}
