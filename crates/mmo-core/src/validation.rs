//! # Validation Module
//!
//! Input coercion and validation for the product screen and the catalog.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (client, before any request)                     │
//! │  ├── Quantity text → positive integer (coerced, never rejected)        │
//! │  ├── Voucher text → trimmed code or nothing                            │
//! │  └── Service target URL → http(s) link (rejected)                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Backend serializers (authoritative)                          │
//! │  ├── Voucher expiry, remaining uses, store match                       │
//! │  └── Stock availability, order ownership                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum accepted search query length.
const MAX_SEARCH_LEN: usize = 100;

// =============================================================================
// Coercion
// =============================================================================

/// A value recovered from user input, plus what was wrong with the input
/// if it had to be repaired.
#[derive(Debug)]
pub struct Coerced<T> {
    pub value: T,
    pub issue: Option<ValidationError>,
}

impl<T> Coerced<T> {
    fn clean(value: T) -> Self {
        Coerced { value, issue: None }
    }

    fn repaired(value: T, issue: ValidationError) -> Self {
        Coerced {
            value,
            issue: Some(issue),
        }
    }
}

/// Turns the quantity text field into a usable quantity.
///
/// ## Rules
/// - Empty or non-numeric input becomes 1
/// - Zero or negative input becomes 1
/// - Fractions are truncated (`"2.7"` → 2, then the rules above apply)
/// - Values above `MAX_ITEM_QUANTITY` become `MAX_ITEM_QUANTITY`
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product screen: quantity field                                        │
/// │                                                                         │
/// │  "2"   ──► 2                                                           │
/// │  ""    ──► 1   (issue: Required)                                       │
/// │  "-3"  ──► 1   (issue: MustBePositive)                                 │
/// │  "abc" ──► 1   (issue: InvalidFormat)                                  │
/// │  "5000"──► 999 (issue: OutOfRange)                                     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// ## Example
/// ```rust
/// use mmo_core::validation::coerce_quantity;
///
/// assert_eq!(coerce_quantity("3").value, 3);
/// assert_eq!(coerce_quantity("-3").value, 1);
/// assert_eq!(coerce_quantity("").value, 1);
/// ```
pub fn coerce_quantity(raw: &str) -> Coerced<i64> {
    let text = raw.trim();
    if text.is_empty() {
        return Coerced::repaired(
            1,
            ValidationError::Required {
                field: "quantity".to_string(),
            },
        );
    }

    let parsed = text.parse::<i64>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc().clamp(i64::MIN as f64, i64::MAX as f64) as i64)
    });

    match parsed {
        None => Coerced::repaired(
            1,
            ValidationError::InvalidFormat {
                field: "quantity".to_string(),
                reason: format!("'{}' is not a number", text),
            },
        ),
        Some(qty) if qty <= 0 => Coerced::repaired(
            1,
            ValidationError::MustBePositive {
                field: "quantity".to_string(),
            },
        ),
        Some(qty) if qty > MAX_ITEM_QUANTITY => Coerced::repaired(
            MAX_ITEM_QUANTITY,
            ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: MAX_ITEM_QUANTITY,
            },
        ),
        Some(qty) => Coerced::clean(qty),
    }
}

/// Clamps an already numeric quantity into `1..=MAX_ITEM_QUANTITY`.
pub fn clamp_quantity(qty: i64) -> i64 {
    qty.clamp(1, MAX_ITEM_QUANTITY)
}

/// Normalizes voucher text into a code to check, or `None` when blank.
///
/// ## Example
/// ```rust
/// use mmo_core::validation::normalize_voucher_code;
///
/// assert_eq!(normalize_voucher_code("  SALE10 ").as_deref(), Some("SALE10"));
/// assert_eq!(normalize_voucher_code("   "), None);
/// ```
pub fn normalize_voucher_code(raw: &str) -> Option<String> {
    let code = raw.trim();
    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}

// =============================================================================
// Validators
// =============================================================================

/// Validates the link a service order is fulfilled against.
///
/// ## Rules
/// - Must not be empty
/// - Must start with `http://` or `https://` and have a host part
/// - Must not contain whitespace
///
/// ## Returns
/// The trimmed URL.
///
/// ## Example
/// ```rust
/// use mmo_core::validation::validate_target_url;
///
/// assert!(validate_target_url("https://www.tiktok.com/@shop/video/1").is_ok());
/// assert!(validate_target_url("tiktok.com/@shop").is_err());
/// assert!(validate_target_url("").is_err());
/// ```
pub fn validate_target_url(raw: &str) -> ValidationResult<String> {
    let url = raw.trim();

    if url.is_empty() {
        return Err(ValidationError::Required {
            field: "target_url".to_string(),
        });
    }

    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));

    match rest {
        Some(rest) if !rest.is_empty() && !rest.chars().any(char::is_whitespace) => {
            Ok(url.to_string())
        }
        _ => Err(ValidationError::InvalidFormat {
            field: "target_url".to_string(),
            reason: "must be a full http(s) link".to_string(),
        }),
    }
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns all results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_SEARCH_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_SEARCH_LEN,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================
