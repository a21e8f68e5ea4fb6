//! # Domain Errors
//!
//! Failures the pure layer can detect on its own, before any request is
//! made or after a payload has been decoded.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ValidationError ──► what the user typed is unusable                    │
//! │        │              (quantity field, search box, target link)         │
//! │        ▼                                                                │
//! │  CoreError ────────► a marketplace rule says no                         │
//! │        │              (stock, unknown product type, bad amount)         │
//! │        ▼                                                                │
//! │  ClientError (mmo-client) ──► notice on screen / CLI exit message       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Input problems on the price box are usually coerced rather than raised;
//! the coercion still reports the [`ValidationError`] it recovered from so
//! callers can log it.

use thiserror::Error;

/// Shorthand for results of domain checks.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Core Error
// =============================================================================

#[derive(Debug, Error)]
pub enum CoreError {
    /// A `type` tag outside account/service/software/course.
    #[error("Unknown product type: {0}")]
    UnknownProductType(String),

    /// A status filter outside the backend's order lifecycle.
    #[error("Unknown order status: {0}")]
    UnknownOrderStatus(String),

    /// The order asks for more stock rows than the product has left.
    ///
    /// Service products are fulfilled against a link and never raise this.
    #[error("Only {available} of {product_code} left, {requested} requested")]
    InsufficientStock {
        product_code: String,
        available: i64,
        requested: i64,
    },

    /// An amount from the backend could not be read as whole currency units.
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// A rejected or coerced user input. `field` names the input box.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} is limited to {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be at least 1")]
    MustBePositive { field: String },

    #[error("{field}: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// The input box this error belongs to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}
