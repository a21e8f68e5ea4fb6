//! # Checkout
//!
//! Turns the product screen's settled price box into an order.
//!
//! ## Order Placement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        place_order()                                    │
//! │                                                                         │
//! │  1. Session signed in? ─────────── no ──► NotAuthenticated              │
//! │  2. Service product? ── yes ──► target_url is http(s)? ── no ──►       │
//! │                                                    Validation error     │
//! │  3. Enough stock? (non-service) ── no ──► InsufficientStock            │
//! │  4. POST /orders/ {code} ──────────────► order_code                    │
//! │  5. POST /acc-orders-detail/      (account, software, course)          │
//! │     POST /service-orders-detail/  (service, + note, target_url)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Failures are returned as they are. Nothing is retried: a retry after a
//! timeout could create a second order.

use tracing::{error, info};

use mmo_core::pricing::PricingState;
use mmo_core::validation::{clamp_quantity, validate_target_url};
use mmo_core::{Order, OrderLineKind, OrderLineRequest, Product, ServiceDetails};

use crate::api::MarketplaceApi;
use crate::error::{ClientError, ClientResult};
use crate::session::Session;

/// Places an order for `product` at the quantity and voucher of `pricing`.
///
/// `service` is required for service products and ignored otherwise.
pub async fn place_order(
    api: &dyn MarketplaceApi,
    session: &Session,
    product: &Product,
    pricing: &PricingState,
    service: Option<&ServiceDetails>,
) -> ClientResult<Order> {
    if !session.is_authenticated().await {
        return Err(ClientError::NotAuthenticated);
    }

    let quantity = clamp_quantity(pricing.quantity);
    let kind = product.product_type.order_line_kind();

    let extra = match kind {
        OrderLineKind::Service => {
            let details = service.cloned().unwrap_or_default();
            Some(ServiceDetails {
                note: details.note.trim().to_string(),
                target_url: validate_target_url(&details.target_url)?,
            })
        }
        OrderLineKind::Stock => {
            product.check_stock(quantity)?;
            None
        }
    };

    let voucher_code = pricing.voucher_code.as_deref();
    let order = api.create_order(voucher_code).await?;
    info!(
        order = %order.order_code,
        product = %product.product_code,
        quantity,
        voucher = ?voucher_code,
        total = pricing.breakdown.final_total.units(),
        "Order created"
    );

    let line = OrderLineRequest {
        order: order.order_code.clone(),
        product: product.product_code.clone(),
        quantity,
        extra,
    };
    if let Err(e) = api.add_order_line(kind, &line).await {
        error!(order = %order.order_code, error = %e, "Failed to attach order line");
        return Err(e);
    }

    info!(order = %order.order_code, kind = ?kind, "Order line attached");
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::session::TokenInfo;
    use crate::test_support::{product, ScriptedApi};
    use mmo_core::pricing::recompute;
    use mmo_core::{CoreError, Money, ProductType, ValidationError};
    use std::time::Duration;

    async fn signed_in() -> Session {
        let session = Session::new(&ClientConfig::default()).unwrap();
        session
            .store(TokenInfo {
                access_token: "tok".into(),
                refresh_token: None,
                expires_at: tokio::time::Instant::now() + Duration::from_secs(3600),
            })
            .await;
        session
    }

    fn pricing(unit: i64, qty: i64, code: Option<&str>) -> PricingState {
        let mut state = PricingState::new(Money::from_units(unit));
        state.quantity = qty;
        state.voucher_code = code.map(str::to_string);
        state.breakdown = recompute(Money::from_units(unit), qty, Money::zero());
        state
    }

    #[tokio::test]
    async fn test_requires_session() {
        let api = ScriptedApi::new();
        let session = Session::new(&ClientConfig::default()).unwrap();
        let p = product("PR0001", ProductType::Account, 10_000);

        let err = place_order(&api, &session, &p, &pricing(10_000, 1, None), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
        assert!(api.orders().is_empty());
    }

    #[tokio::test]
    async fn test_stock_product_uses_account_endpoint() {
        let api = ScriptedApi::new();
        let session = signed_in().await;
        let p = product("PR0001", ProductType::Software, 10_000);

        let order = place_order(&api, &session, &p, &pricing(10_000, 2, Some("SALE10")), None)
            .await
            .unwrap();
        assert_eq!(order.order_code, "OD0001");
        assert_eq!(api.orders(), vec![Some("SALE10".to_string())]);

        let lines = api.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, OrderLineKind::Stock);
        assert_eq!(lines[0].1.quantity, 2);
        assert_eq!(lines[0].1.extra, None);
    }

    #[tokio::test]
    async fn test_service_product_requires_valid_url() {
        let api = ScriptedApi::new();
        let session = signed_in().await;
        let p = product("PR0009", ProductType::Service, 5_000);
        let state = pricing(5_000, 1, None);

        let err = place_order(&api, &session, &p, &state, None).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::Required { .. })
        ));

        let bad = ServiceDetails {
            note: String::new(),
            target_url: "tiktok.com/@shop".into(),
        };
        let err = place_order(&api, &session, &p, &state, Some(&bad))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::InvalidFormat { .. })
        ));
        assert!(api.orders().is_empty());

        let good = ServiceDetails {
            note: "  1000 followers ".into(),
            target_url: "https://www.tiktok.com/@shop".into(),
        };
        place_order(&api, &session, &p, &state, Some(&good))
            .await
            .unwrap();

        let lines = api.lines();
        assert_eq!(lines[0].0, OrderLineKind::Service);
        let extra = lines[0].1.extra.clone().unwrap();
        assert_eq!(extra.note, "1000 followers");
        assert_eq!(extra.target_url, "https://www.tiktok.com/@shop");
        assert_eq!(api.orders(), vec![None]);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rejected_before_ordering() {
        let api = ScriptedApi::new();
        let session = signed_in().await;
        let mut p = product("PR0001", ProductType::Account, 10_000);
        p.available_quantity = 1;

        let err = place_order(&api, &session, &p, &pricing(10_000, 3, None), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Core(CoreError::InsufficientStock { .. })
        ));
        assert!(api.orders().is_empty());
    }
}
