//! # Pricing Module
//!
//! The price box on the product screen: unit price, subtotal, discount and
//! the amount actually paid.
//!
//! ## Recompute Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  unit_price ──┐                                                         │
//! │               ├──► subtotal = unit_price × quantity                     │
//! │  quantity ────┘          │                                              │
//! │                          ▼                                              │
//! │  discount (server) ──► clamp to [0, subtotal]                           │
//! │                          │                                              │
//! │                          ▼                                              │
//! │                 final_total = subtotal − discount                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The voucher discount itself is computed by the backend. This module only
//! combines the server's answer with the quantity it was requested for.
//!
//! ## Clamp Policy
//! A discount larger than the subtotal is clamped down to the subtotal, and
//! a negative discount is treated as zero, so `final_total` is never
//! negative and never exceeds `subtotal`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

/// The four figures shown in the price box.
///
/// ## Invariants
/// - `subtotal == unit_price × quantity`
/// - `0 <= discount <= subtotal`
/// - `final_total == subtotal − discount`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub unit_price: Money,
    pub quantity: i64,
    pub subtotal: Money,
    pub discount: Money,
    pub final_total: Money,
}

impl PriceBreakdown {
    /// Breakdown shown when the product screen opens: one unit, no voucher.
    pub fn initial(unit_price: Money) -> Self {
        recompute(unit_price, 1, Money::zero())
    }

    /// Returns true if a voucher discount is applied.
    #[inline]
    pub fn has_discount(&self) -> bool {
        self.discount.is_positive()
    }
}

/// Computes the breakdown for `quantity` units with a server-provided
/// `discount`.
///
/// ## Example
/// ```rust
/// use mmo_core::money::Money;
/// use mmo_core::pricing::recompute;
///
/// let b = recompute(Money::from_units(50_000), 1, Money::zero());
/// assert_eq!(b.final_total.units(), 50_000);
///
/// // A discount larger than the subtotal is clamped.
/// let b = recompute(Money::from_units(10_000), 1, Money::from_units(15_000));
/// assert_eq!(b.discount.units(), 10_000);
/// assert!(b.final_total.is_zero());
/// ```
pub fn recompute(unit_price: Money, quantity: i64, discount: Money) -> PriceBreakdown {
    let subtotal = unit_price.multiply_quantity(quantity);
    let discount = clamp_discount(subtotal, discount);
    PriceBreakdown {
        unit_price,
        quantity,
        subtotal,
        discount,
        final_total: subtotal - discount,
    }
}

/// Applies the clamp policy to a raw server discount.
#[inline]
pub fn clamp_discount(subtotal: Money, discount: Money) -> Money {
    discount.clamp_to(Money::zero(), subtotal)
}

// =============================================================================
// Pricing State
// =============================================================================

/// Everything the product screen renders about the price.
///
/// `quantity` and `voucher_code` are the inputs the breakdown was requested
/// for. While a voucher check is in flight `pending` is set and `breakdown`
/// still describes the previous, fully answered request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricingState {
    /// Latest requested quantity.
    pub quantity: i64,
    /// Latest committed voucher code (after debounce), `None` when blank.
    pub voucher_code: Option<String>,
    /// Latest consistent figures.
    pub breakdown: PriceBreakdown,
    /// True while a voucher check for the latest inputs is outstanding.
    pub pending: bool,
}

impl PricingState {
    /// State seeded from the product's unit price.
    pub fn new(unit_price: Money) -> Self {
        PricingState {
            quantity: 1,
            voucher_code: None,
            breakdown: PriceBreakdown::initial(unit_price),
            pending: false,
        }
    }

    /// Returns true if `breakdown` answers the latest inputs.
    pub fn is_settled(&self) -> bool {
        !self.pending && self.breakdown.quantity == self.quantity
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
