//! # Domain Types
//!
//! Core domain types and backend DTOs used throughout the market client.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Order       │   │   Page<T>       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  product_code   │   │  order_code     │   │  count          │       │
//! │  │  price          │   │  status         │   │  next/previous  │       │
//! │  │  product_type   │   │  voucher        │   │  results        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  ProductType    │   │  OrderStatus    │   │ VoucherCheck*   │       │
//! │  │  Account        │   │  Processing     │   │  request with   │       │
//! │  │  Service        │   │  Delivered ...  │   │  total_amount,  │       │
//! │  │  Software/Course│   │  Completed      │   │  discount reply │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Business Codes
//! Every backend entity is keyed by a short generated code (`PR0001`,
//! `OD0042`, ...). The client never invents codes; it only echoes them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{deserialize_amount, deserialize_non_negative_amount, Money};

// =============================================================================
// Product Type
// =============================================================================

/// What a product delivers.
///
/// `service` products (follower boosts, view packages, ...) are fulfilled
/// against a target URL and have no stock; every other type is delivered
/// from stock rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Account,
    Service,
    Software,
    Course,
}

impl ProductType {
    /// All product types, in the order the category picker shows them.
    pub const ALL: [ProductType; 4] = [
        ProductType::Account,
        ProductType::Service,
        ProductType::Software,
        ProductType::Course,
    ];

    /// Wire tag used in query strings and payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Account => "account",
            ProductType::Service => "service",
            ProductType::Software => "software",
            ProductType::Course => "course",
        }
    }

    /// Returns true for products fulfilled against a target URL.
    #[inline]
    pub fn is_service(&self) -> bool {
        matches!(self, ProductType::Service)
    }

    /// Which order line endpoint accepts this product.
    pub fn order_line_kind(&self) -> OrderLineKind {
        if self.is_service() {
            OrderLineKind::Service
        } else {
            OrderLineKind::Stock
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "account" => Ok(ProductType::Account),
            "service" => Ok(ProductType::Service),
            "software" => Ok(ProductType::Software),
            "course" => Ok(ProductType::Course),
            other => Err(CoreError::UnknownProductType(other.to_string())),
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// The store a product belongs to (as embedded in product payloads).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StoreSummary {
    pub store_code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// Product
// =============================================================================

/// A product listed on the marketplace.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Business identifier (e.g. `PR0001`).
    pub product_code: String,

    /// Owning store, absent in some trimmed list payloads.
    #[serde(default)]
    pub store: Option<StoreSummary>,

    pub name: String,

    /// Image URL.
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub description: String,

    /// Unit price in whole currency units.
    #[serde(deserialize_with = "deserialize_amount")]
    pub price: Money,

    /// Delivery format hint shown to buyers, e.g. `TK|MK|Email|OTP`.
    #[serde(default)]
    pub format: String,

    #[serde(rename = "type")]
    pub product_type: ProductType,

    /// Unsold stock rows. Meaningless for `service` products.
    #[serde(default)]
    pub available_quantity: i64,

    #[serde(default)]
    pub warranty_days: i64,

    #[serde(default)]
    pub is_approved: bool,

    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_date: Option<DateTime<Utc>>,
}

impl Product {
    /// Returns the unit price.
    #[inline]
    pub fn price(&self) -> Money {
        self.price
    }

    /// Returns true for products fulfilled against a target URL.
    #[inline]
    pub fn is_service(&self) -> bool {
        self.product_type.is_service()
    }

    /// Checks that enough stock exists for `quantity`.
    ///
    /// Service products have no stock and always pass.
    pub fn check_stock(&self, quantity: i64) -> CoreResult<()> {
        if self.is_service() || quantity <= self.available_quantity {
            return Ok(());
        }
        Err(CoreError::InsufficientStock {
            product_code: self.product_code.clone(),
            available: self.available_quantity,
            requested: quantity,
        })
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Backend pagination envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Total number of rows across all pages.
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Returns true when the backend advertises a following page.
    #[inline]
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

// =============================================================================
// Vouchers
// =============================================================================

/// Body of the voucher check call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherCheckRequest {
    pub code: String,
    /// Subtotal the discount is computed against.
    pub total_amount: i64,
    pub product_code: String,
}

/// Successful voucher check reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherCheckResponse {
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(deserialize_with = "deserialize_non_negative_amount")]
    pub discount_amount: Money,
    #[serde(default)]
    pub final_amount: Option<i64>,
}

fn default_valid() -> bool {
    true
}

/// Voucher as embedded in order payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherSummary {
    pub code: String,
    #[serde(default)]
    pub discount_percent: Option<f64>,
}

// =============================================================================
// Orders
// =============================================================================

/// Lifecycle of an order, driven entirely by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Processing,
    Delivered,
    Complained,
    Refunded,
    Completed,
}

impl OrderStatus {
    /// All statuses, in the order the order history filter shows them.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Processing,
        OrderStatus::Delivered,
        OrderStatus::Complained,
        OrderStatus::Refunded,
        OrderStatus::Completed,
    ];

    /// Wire tag used in the `status` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "processing",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Complained => "complained",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or(CoreError::UnknownOrderStatus(wanted))
    }
}

/// An order as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_code: String,
    #[serde(default)]
    pub voucher: Option<VoucherSummary>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
}

/// Body of the create-order call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Committed voucher code, `null` when none.
    pub code: Option<String>,
}

/// Which order line endpoint a product is attached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderLineKind {
    /// Account / software / course: delivered from stock rows.
    Stock,
    /// Service: fulfilled against a target URL.
    Service,
}

/// Extra fields carried by service order lines.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServiceDetails {
    #[serde(default)]
    pub note: String,
    pub target_url: String,
}

/// Body of the add-order-line call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    /// Order code.
    pub order: String,
    /// Product code.
    pub product: String,
    pub quantity: i64,
    #[serde(flatten)]
    pub extra: Option<ServiceDetails>,
}

// =============================================================================
// Favorites
// =============================================================================

/// Answer of the favorite toggle call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteToggle {
    /// Whether the product is a favorite after the call.
    pub favourited: bool,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Users
// =============================================================================

/// The signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_code: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub is_verified: bool,
}

// =============================================================================
// Error Payloads
// =============================================================================

/// Error body shapes the backend uses (`{"error": ...}` from custom views,
/// `{"detail": ...}` from the framework).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorBody {
    /// Human-readable reason, if the server gave one.
    pub fn reason(&self) -> Option<String> {
        self.error
            .clone()
            .or_else(|| self.detail.clone())
            .filter(|r| !r.trim().is_empty())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product_json(kind: &str) -> String {
        format!(
            r#"{{
                "product_code": "PR0001",
                "store": {{"store_code": "ST01", "name": "Acc Shop"}},
                "name": "Netflix 1 month",
                "price": "100000.00",
                "type": "{}",
                "available_quantity": 3,
                "warranty_days": 7,
                "created_date": "2025-01-02T03:04:05Z"
            }}"#,
            kind
        )
    }

    #[test]
    fn test_product_type_parsing() {
        assert_eq!("account".parse::<ProductType>().unwrap(), ProductType::Account);
        assert_eq!(" Service ".parse::<ProductType>().unwrap(), ProductType::Service);
        assert!("gift".parse::<ProductType>().is_err());
        assert_eq!(ProductType::Course.to_string(), "course");
    }

    #[test]
    fn test_order_status_parsing() {
        assert_eq!("Refunded".parse::<OrderStatus>().unwrap(), OrderStatus::Refunded);
        assert!(matches!(
            "cancel".parse::<OrderStatus>(),
            Err(CoreError::UnknownOrderStatus(ref s)) if s == "cancel"
        ));
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
        let order: Order =
            serde_json::from_str(r#"{"order_code": "OD0003", "status": "complained"}"#).unwrap();
        assert_eq!(order.status, OrderStatus::Complained);
    }

    #[test]
    fn test_order_line_kind() {
        assert_eq!(ProductType::Service.order_line_kind(), OrderLineKind::Service);
        for kind in [ProductType::Account, ProductType::Software, ProductType::Course] {
            assert_eq!(kind.order_line_kind(), OrderLineKind::Stock);
        }
    }

    #[test]
    fn test_product_deserializes_backend_payload() {
        let product: Product = serde_json::from_str(&product_json("account")).unwrap();
        assert_eq!(product.price().units(), 100_000);
        assert_eq!(product.product_type, ProductType::Account);
        assert_eq!(product.store.as_ref().map(|s| s.name.as_str()), Some("Acc Shop"));
        assert!(product.created_date.is_some());
    }

    #[test]
    fn test_check_stock() {
        let product: Product = serde_json::from_str(&product_json("account")).unwrap();
        assert!(product.check_stock(3).is_ok());
        assert!(matches!(
            product.check_stock(4),
            Err(CoreError::InsufficientStock { available: 3, requested: 4, .. })
        ));

        let service: Product = serde_json::from_str(&product_json("service")).unwrap();
        assert!(service.check_stock(10_000).is_ok());
    }

    #[test]
    fn test_voucher_response_rejects_negative_discount() {
        let ok: VoucherCheckResponse =
            serde_json::from_str(r#"{"valid":true,"discount_amount":20000,"final_amount":180000}"#)
                .unwrap();
        assert_eq!(ok.discount_amount.units(), 20_000);

        let bad = serde_json::from_str::<VoucherCheckResponse>(r#"{"discount_amount":-1}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_order_line_request_flattens_service_details() {
        let stock = OrderLineRequest {
            order: "OD01".into(),
            product: "PR01".into(),
            quantity: 2,
            extra: None,
        };
        let json = serde_json::to_value(&stock).unwrap();
        assert!(json.get("target_url").is_none());

        let service = OrderLineRequest {
            extra: Some(ServiceDetails {
                note: "fast please".into(),
                target_url: "https://tiktok.com/@me".into(),
            }),
            ..stock
        };
        let json = serde_json::to_value(&service).unwrap();
        assert_eq!(json["target_url"], "https://tiktok.com/@me");
        assert_eq!(json["note"], "fast please");
        assert_eq!(json["quantity"], 2);
    }

    #[test]
    fn test_error_body_reason() {
        let body: ErrorBody = serde_json::from_str(r#"{"error":"Voucher expired"}"#).unwrap();
        assert_eq!(body.reason().as_deref(), Some("Voucher expired"));

        let body: ErrorBody = serde_json::from_str(r#"{"detail":"Not found."}"#).unwrap();
        assert_eq!(body.reason().as_deref(), Some("Not found."));

        assert_eq!(ErrorBody::default().reason(), None);
    }

    #[test]
    fn test_page_has_next() {
        let page: Page<String> =
            serde_json::from_str(r#"{"count":12,"next":"http://x/?page=2","results":["a"]}"#)
                .unwrap();
        assert!(page.has_next());
        assert_eq!(page.count, 12);
    }
}
