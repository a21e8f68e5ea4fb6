//! # Money
//!
//! Whole-unit VND amounts for every number on the price box.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  backend JSON              Money            price box                   │
//! │  ────────────────────      ─────────        ──────────────────          │
//! │  "price": "100000.00"  ──► Money(100000) ──► "100,000 đ"                │
//! │  "discount_amount": 20000 ► Money(20000)                                │
//! │  "discount_amount": -5  ──► rejected while decoding                     │
//! │                                                                         │
//! │  VND has no minor unit in practice, so the fraction the backend         │
//! │  serializes is dropped and all arithmetic stays in i64.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use mmo_core::money::Money;
//!
//! let price = Money::from_units(100_000);
//! let subtotal = price.multiply_quantity(2);
//! assert_eq!(subtotal.units(), 200_000);
//! assert_eq!(subtotal.to_string(), "200,000 đ");
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Money Type
// =============================================================================

/// An amount in whole currency units.
///
/// Signed so that `subtotal - discount` can be computed before clamping.
/// Quantity multiplication saturates instead of overflowing.
///
/// ## Where Money is Used
/// ```text
/// Product.price ──► PriceBreakdown.unit_price ──► subtotal (× quantity)
///                                                     │
///               voucher check discount_amount ────────┤
///                                                     ▼
///                                               final_total
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole currency units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units)
    }

    /// Returns the value in whole currency units.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity, saturating at the i64 bounds.
    ///
    /// ## Example
    /// ```rust
    /// use mmo_core::money::Money;
    ///
    /// let unit_price = Money::from_units(50_000);
    /// assert_eq!(unit_price.multiply_quantity(3).units(), 150_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Returns `percent_bps` basis points of this amount, truncated toward
    /// zero (1000 bps = 10%).
    ///
    /// Truncation matches the backend's `int(total * percent / 100)`.
    ///
    /// ## Example
    /// ```rust
    /// use mmo_core::money::Money;
    ///
    /// let subtotal = Money::from_units(200_000);
    /// assert_eq!(subtotal.percentage(1000).units(), 20_000);
    /// assert_eq!(Money::from_units(999).percentage(1000).units(), 99);
    /// ```
    pub fn percentage(&self, percent_bps: u32) -> Money {
        let part = self.0 as i128 * percent_bps as i128 / 10_000;
        Money(part as i64)
    }

    /// Restricts the value to `[min, max]`.
    #[inline]
    pub fn clamp_to(self, min: Money, max: Money) -> Money {
        Money(self.0.clamp(min.0, max.0.max(min.0)))
    }

    /// Parses a backend decimal string such as `"100000.00"`.
    ///
    /// ## Rules
    /// - Optional leading `-`
    /// - At least one integer digit
    /// - Optional `.` followed by digits; the fraction is dropped
    ///
    /// ## Example
    /// ```rust
    /// use mmo_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("100000.00").unwrap().units(), 100_000);
    /// assert_eq!(Money::parse_decimal(" 42 ").unwrap().units(), 42);
    /// assert!(Money::parse_decimal("12a").is_err());
    /// ```
    pub fn parse_decimal(raw: &str) -> CoreResult<Money> {
        let text = raw.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(fraction) {
            return Err(CoreError::InvalidAmount {
                reason: format!("'{}' is not a decimal number", raw),
            });
        }

        let value: i64 = whole.parse().map_err(|_| CoreError::InvalidAmount {
            reason: format!("'{}' is out of range", raw),
        })?;

        Ok(Money(if negative { -value } else { value }))
    }
}

// =============================================================================
// Backend Amount Deserialization
// =============================================================================

/// Amount shapes the backend is known to send.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Deserializes a backend amount that may arrive as an integer, a float or
/// a decimal string.
///
/// ## Usage
/// ```rust,ignore
/// #[serde(deserialize_with = "crate::money::deserialize_amount")]
/// pub price: Money,
/// ```
pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<Money, D::Error>
where
    D: Deserializer<'de>,
{
    match RawAmount::deserialize(deserializer)? {
        RawAmount::Int(units) => Ok(Money(units)),
        RawAmount::Float(value) if value.is_finite() => Ok(Money(value.trunc() as i64)),
        RawAmount::Float(value) => Err(serde::de::Error::custom(format!(
            "amount {} is not finite",
            value
        ))),
        RawAmount::Text(text) => Money::parse_decimal(&text).map_err(serde::de::Error::custom),
    }
}

/// Like [`deserialize_amount`], but rejects negative values.
///
/// Used for discounts: a negative discount from a misbehaving backend is a
/// malformed payload, not a surcharge.
pub fn deserialize_non_negative_amount<'de, D>(deserializer: D) -> Result<Money, D::Error>
where
    D: Deserializer<'de>,
{
    let amount = deserialize_amount(deserializer)?;
    if amount.is_negative() {
        return Err(serde::de::Error::custom(format!(
            "amount {} must not be negative",
            amount.units()
        )));
    }
    Ok(amount)
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display groups thousands the way the mobile price box does:
/// `200,000 đ`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{} đ", sign, grouped)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Priced {
        #[serde(deserialize_with = "deserialize_amount")]
        price: Money,
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_units(200_000).to_string(), "200,000 đ");
        assert_eq!(Money::from_units(999).to_string(), "999 đ");
        assert_eq!(Money::from_units(1_000).to_string(), "1,000 đ");
        assert_eq!(Money::from_units(0).to_string(), "0 đ");
        assert_eq!(Money::from_units(-20_000).to_string(), "-20,000 đ");
        assert_eq!(Money::from_units(1_234_567).to_string(), "1,234,567 đ");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_units(1000);
        let b = Money::from_units(400);
        assert_eq!((a + b).units(), 1400);
        assert_eq!((a - b).units(), 600);

        let mut c = a;
        c -= b;
        c += Money::from_units(1);
        assert_eq!(c.units(), 601);
    }

    #[test]
    fn test_multiply_quantity_saturates() {
        let price = Money::from_units(i64::MAX / 2);
        assert_eq!(price.multiply_quantity(3).units(), i64::MAX);
    }

    #[test]
    fn test_percentage_truncates() {
        assert_eq!(Money::from_units(200_000).percentage(1000).units(), 20_000);
        assert_eq!(Money::from_units(15).percentage(1000).units(), 1);
        assert_eq!(Money::from_units(100).percentage(0).units(), 0);
    }

    #[test]
    fn test_clamp_to() {
        let lo = Money::zero();
        let hi = Money::from_units(500);
        assert_eq!(Money::from_units(-3).clamp_to(lo, hi), lo);
        assert_eq!(Money::from_units(900).clamp_to(lo, hi), hi);
        assert_eq!(Money::from_units(42).clamp_to(lo, hi).units(), 42);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(Money::parse_decimal("100000.00").unwrap().units(), 100_000);
        assert_eq!(Money::parse_decimal("7").unwrap().units(), 7);
        assert_eq!(Money::parse_decimal("-5.5").unwrap().units(), -5);
        assert!(Money::parse_decimal("").is_err());
        assert!(Money::parse_decimal(".50").is_err());
        assert!(Money::parse_decimal("1,000").is_err());
    }

    #[test]
    fn test_deserialize_amount_shapes() {
        let from_text: Priced = serde_json::from_str(r#"{"price":"100000.00"}"#).unwrap();
        assert_eq!(from_text.price.units(), 100_000);

        let from_int: Priced = serde_json::from_str(r#"{"price":20000}"#).unwrap();
        assert_eq!(from_int.price.units(), 20_000);

        let from_float: Priced = serde_json::from_str(r#"{"price":1500.0}"#).unwrap();
        assert_eq!(from_float.price.units(), 1_500);

        assert!(serde_json::from_str::<Priced>(r#"{"price":"abc"}"#).is_err());
        assert!(serde_json::from_str::<Priced>(r#"{"price":null}"#).is_err());
    }
}
