//! # Marketplace API
//!
//! The backend contract the client depends on, and its REST implementation.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         REST Endpoints                                  │
//! │                                                                         │
//! │  Operation           Method  Path                      Auth             │
//! │  ─────────────────   ──────  ───────────────────────   ─────────        │
//! │  validate_voucher    POST    /vouchers/check/          required         │
//! │  create_order        POST    /orders/                  required         │
//! │  add_order_line      POST    /acc-orders-detail/       required         │
//! │                      POST    /service-orders-detail/   required         │
//! │  list_products       GET     /products/?search&type&page  optional      │
//! │  current_user        GET     /users/current-user/      required         │
//! │  toggle_favorite     POST    /favorites/{code}/toggle/ required         │
//! │  list_favorites      GET     /favorites/my-favorites/?search  required  │
//! │  list_orders         GET     /orders/my-orders/?status&search&page      │
//! │                                                        required         │
//! │                                                                         │
//! │  Errors: 4xx bodies are {"error": "..."} or {"detail": "..."}          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything above this module talks to `dyn MarketplaceApi`, so tests
//! swap in a scripted fake and the CLI uses [`HttpApi`].

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use mmo_core::{
    CreateOrderRequest, ErrorBody, FavoriteToggle, Money, Order, OrderLineKind, OrderLineRequest,
    OrderStatus, Page, Product, ProductType, User, VoucherCheckRequest, VoucherCheckResponse,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::Session;

/// Longest raw error body echoed into an error reason.
const MAX_RAW_REASON_LEN: usize = 200;

// =============================================================================
// Queries
// =============================================================================

/// Parameters of one product list request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductQuery {
    /// Free text matched against product names; empty means everything.
    pub search: String,
    /// Category filter; `None` means all types.
    pub product_type: Option<ProductType>,
    /// 1-based page number.
    pub page: u32,
}

impl ProductQuery {
    /// Query string pairs, omitting empty filters.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(3);
        if !self.search.is_empty() {
            params.push(("search", self.search.clone()));
        }
        if let Some(kind) = self.product_type {
            params.push(("type", kind.as_str().to_string()));
        }
        params.push(("page", self.page.max(1).to_string()));
        params
    }
}

/// Parameters of one order history request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderQuery {
    /// Status filter; `None` means every status.
    pub status: Option<OrderStatus>,
    /// Matched against order codes; empty means everything.
    pub search: String,
    /// 1-based page number.
    pub page: u32,
}

impl OrderQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(3);
        if let Some(status) = self.status {
            params.push(("status", status.as_str().to_string()));
        }
        let search = self.search.trim();
        if !search.is_empty() {
            params.push(("search", search.to_string()));
        }
        params.push(("page", self.page.max(1).to_string()));
        params
    }
}

/// List endpoints that may or may not be paginated.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Bare(Vec<T>),
    Paged(Page<T>),
}

impl<T> ListBody<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            ListBody::Bare(items) => items,
            ListBody::Paged(page) => page.results,
        }
    }
}

// =============================================================================
// API Trait
// =============================================================================

/// Backend operations used by the reconcilers and checkout.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// Asks the backend what `code` takes off `total_amount` for
    /// `product_code`.
    ///
    /// ## Returns
    /// The discount amount (never negative).
    ///
    /// ## Errors
    /// - `VoucherRejected` if the backend refuses the code
    /// - `Network` / `Timeout` if no verdict was obtained
    async fn validate_voucher(
        &self,
        code: &str,
        total_amount: Money,
        product_code: &str,
    ) -> ClientResult<Money>;

    /// Creates an empty order, optionally bound to a voucher code.
    async fn create_order(&self, voucher_code: Option<&str>) -> ClientResult<Order>;

    /// Attaches one line to an order through the endpoint for `kind`.
    async fn add_order_line(&self, kind: OrderLineKind, line: &OrderLineRequest)
        -> ClientResult<()>;

    /// Fetches one page of the product catalog.
    async fn list_products(&self, query: &ProductQuery) -> ClientResult<Page<Product>>;

    /// Returns the signed-in user.
    async fn current_user(&self) -> ClientResult<User>;

    /// Adds `product_code` to the user's favorites, or removes it if it is
    /// already there.
    ///
    /// ## Returns
    /// Whether the product is a favorite after the call.
    async fn toggle_favorite(&self, product_code: &str) -> ClientResult<bool>;

    /// The user's favorite products whose name contains `search`.
    async fn list_favorites(&self, search: &str) -> ClientResult<Vec<Product>>;

    /// Fetches one page of the user's orders, newest first.
    async fn list_orders(&self, query: &OrderQuery) -> ClientResult<Page<Order>>;
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// [`MarketplaceApi`] over the backend's REST interface.
#[derive(Debug, Clone)]
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl HttpApi {
    /// Creates the API on top of `session`, sharing its HTTP client.
    pub fn new(config: &ClientConfig, session: Session) -> Self {
        HttpApi {
            http: session.http().clone(),
            base_url: config.base_url().to_string(),
            session,
        }
    }

    /// The session authenticating this API.
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attaches the bearer token, failing fast when signed out.
    async fn authorized(&self, req: RequestBuilder) -> ClientResult<RequestBuilder> {
        let token = self.session.bearer().await?;
        Ok(req.bearer_auth(token))
    }
}

#[async_trait]
impl MarketplaceApi for HttpApi {
    async fn validate_voucher(
        &self,
        code: &str,
        total_amount: Money,
        product_code: &str,
    ) -> ClientResult<Money> {
        let body = VoucherCheckRequest {
            code: code.to_string(),
            total_amount: total_amount.units(),
            product_code: product_code.to_string(),
        };

        let req = self.http.post(self.endpoint("/vouchers/check/")).json(&body);
        let resp = self.authorized(req).await?.send().await?;
        let status = resp.status();

        if status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND {
            let reason = read_reason(resp).await;
            debug!(code = %code, status = status.as_u16(), reason = ?reason, "Voucher rejected");
            return Err(ClientError::VoucherRejected { reason });
        }

        let check: VoucherCheckResponse = decode(resp).await?;
        if !check.valid {
            return Err(ClientError::VoucherRejected { reason: None });
        }

        if let Some(server_final) = check.final_amount {
            let expected = total_amount.units() - check.discount_amount.units();
            if server_final != expected {
                warn!(
                    code = %code,
                    server_final,
                    expected,
                    "Voucher check final_amount disagrees with discount_amount"
                );
            }
        }

        Ok(check.discount_amount)
    }

    async fn create_order(&self, voucher_code: Option<&str>) -> ClientResult<Order> {
        let body = CreateOrderRequest {
            code: voucher_code.map(str::to_string),
        };
        let req = self.http.post(self.endpoint("/orders/")).json(&body);
        let resp = self.authorized(req).await?.send().await?;
        decode(resp).await
    }

    async fn add_order_line(
        &self,
        kind: OrderLineKind,
        line: &OrderLineRequest,
    ) -> ClientResult<()> {
        let path = match kind {
            OrderLineKind::Stock => "/acc-orders-detail/",
            OrderLineKind::Service => "/service-orders-detail/",
        };
        let req = self.http.post(self.endpoint(path)).json(line);
        let resp = self.authorized(req).await?.send().await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(error_from(resp).await)
        }
    }

    async fn list_products(&self, query: &ProductQuery) -> ClientResult<Page<Product>> {
        let mut req = self
            .http
            .get(self.endpoint("/products/"))
            .query(&query.to_params());
        if let Some(token) = self.session.optional_bearer().await {
            req = req.bearer_auth(token);
        }
        decode(req.send().await?).await
    }

    async fn current_user(&self) -> ClientResult<User> {
        let req = self.http.get(self.endpoint("/users/current-user/"));
        let resp = self.authorized(req).await?.send().await?;
        decode(resp).await
    }

    async fn toggle_favorite(&self, product_code: &str) -> ClientResult<bool> {
        let path = format!("/favorites/{}/toggle/", product_code);
        let req = self.http.post(self.endpoint(&path));
        let resp = self.authorized(req).await?.send().await?;
        let toggle: FavoriteToggle = decode(resp).await?;
        debug!(
            product = %product_code,
            favourited = toggle.favourited,
            message = ?toggle.message,
            "Favorite toggled"
        );
        Ok(toggle.favourited)
    }

    async fn list_favorites(&self, search: &str) -> ClientResult<Vec<Product>> {
        let mut req = self.http.get(self.endpoint("/favorites/my-favorites/"));
        let search = search.trim();
        if !search.is_empty() {
            req = req.query(&[("search", search)]);
        }
        let resp = self.authorized(req).await?.send().await?;
        let body: ListBody<Product> = decode(resp).await?;
        Ok(body.into_items())
    }

    async fn list_orders(&self, query: &OrderQuery) -> ClientResult<Page<Order>> {
        let req = self
            .http
            .get(self.endpoint("/orders/my-orders/"))
            .query(&query.to_params());
        let resp = self.authorized(req).await?.send().await?;
        decode(resp).await
    }
}

// =============================================================================
// Response Helpers
// =============================================================================

/// Decodes a success body, or maps the failure status to an error.
async fn decode<T: DeserializeOwned>(resp: Response) -> ClientResult<T> {
    if resp.status().is_success() {
        Ok(resp.json::<T>().await?)
    } else {
        Err(error_from(resp).await)
    }
}

/// Maps a non-success response to a [`ClientError`].
async fn error_from(resp: Response) -> ClientError {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED {
        return ClientError::NotAuthenticated;
    }
    let reason = read_reason(resp).await;
    ClientError::Http {
        status: status.as_u16(),
        reason,
    }
}

/// Extracts the server's reason from an error body.
///
/// Known shapes are `{"error": ...}` and `{"detail": ...}`; field errors
/// (`{"target_url": [...]}`) are passed through as raw text.
async fn read_reason(resp: Response) -> Option<String> {
    let text = resp.text().await.ok()?;
    if let Ok(body) = serde_json::from_str::<ErrorBody>(&text) {
        if let Some(reason) = body.reason() {
            return Some(reason);
        }
    }
    let raw = text.trim();
    if raw.is_empty() || raw.len() > MAX_RAW_REASON_LEN {
        None
    } else {
        Some(raw.to_string())
    }
}
