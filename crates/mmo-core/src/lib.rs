//! # mmo-core: Pure Business Logic for the MMO Market Client
//!
//! This crate holds everything the marketplace client can compute without
//! touching the network: domain types, integer money, the price breakdown
//! shown on the product screen, input coercion and listing merges.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     MMO Market Client Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Mobile / CLI front end                          │   │
//! │  │   Product list ──► Product detail ──► Price box ──► Order       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                        mmo-client                               │   │
//! │  │   PricingReconciler, CatalogFeed, Checkout, Session, HttpApi    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 ★ mmo-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ recompute │  │ quantity  │  │   │
//! │  │   │  Order    │  │           │  │ Breakdown │  │ target url│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO TIMERS • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types and backend DTOs (Product, Order, Page, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`pricing`] - The price breakdown and its clamp policy
//! - [`listing`] - Paged list merging with deduplication by code
//! - [`validation`] - Input coercion and business rule validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use mmo_core::money::Money;
//! use mmo_core::pricing::recompute;
//!
//! let breakdown = recompute(Money::from_units(100_000), 2, Money::from_units(20_000));
//! assert_eq!(breakdown.subtotal.units(), 200_000);
//! assert_eq!(breakdown.final_total.units(), 180_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod listing;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use pricing::PriceBreakdown;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Quiescence window before a typed voucher code is committed.
pub const VOUCHER_DEBOUNCE_MS: u64 = 1000;

/// Quiescence window for list search and filter inputs.
pub const SEARCH_DEBOUNCE_MS: u64 = 500;

/// Maximum quantity accepted for a single order line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 10000 instead of 100).
/// Larger service packages are sold as separate products.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Page size used by the backend product paginator.
pub const DEFAULT_PAGE_SIZE: u32 = 10;
