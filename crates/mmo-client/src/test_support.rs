//! Shared fixtures for the crate's tests: an axum stub server and a
//! scripted in-memory [`MarketplaceApi`].

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;

use mmo_core::listing::total_pages;
use mmo_core::{
    Money, Order, OrderLineKind, OrderLineRequest, OrderStatus, Page, Product, ProductType,
    StoreSummary, User,
};

use crate::api::{MarketplaceApi, OrderQuery, ProductQuery};
use crate::error::{ClientError, ClientResult};

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn spawn_stub(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn product(code: &str, kind: ProductType, price: i64) -> Product {
    Product {
        product_code: code.to_string(),
        store: Some(StoreSummary {
            store_code: "ST01".into(),
            name: "Test Store".into(),
            description: None,
        }),
        name: format!("Product {}", code),
        image: None,
        description: String::new(),
        price: Money::from_units(price),
        format: String::new(),
        product_type: kind,
        available_quantity: 50,
        warranty_days: 0,
        is_approved: true,
        created_date: None,
    }
}

/// What the fake backend answers for a voucher code.
#[derive(Debug, Clone)]
pub enum VoucherScript {
    /// Percentage of `total_amount`, truncated like the backend.
    Percent(u32),
    /// A fixed discount, whatever the total.
    Fixed(i64),
    Reject(Option<String>),
    NetworkDown,
}

/// Scripted backend with per-call delays and a call log.
#[derive(Default)]
pub struct ScriptedApi {
    vouchers: Mutex<HashMap<String, (Duration, VoucherScript)>>,
    voucher_calls: Mutex<Vec<(String, i64)>>,
    catalog: Mutex<Vec<Product>>,
    catalog_delays: Mutex<HashMap<String, Duration>>,
    catalog_down: Mutex<bool>,
    catalog_next_override: Mutex<Option<bool>>,
    page_size: u32,
    list_calls: Mutex<Vec<ProductQuery>>,
    orders: Mutex<Vec<Option<String>>>,
    lines: Mutex<Vec<(OrderLineKind, OrderLineRequest)>>,
    favorites: Mutex<Vec<String>>,
    history: Mutex<Vec<Order>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        ScriptedApi {
            page_size: 10,
            ..Default::default()
        }
    }

    pub fn with_page_size(page_size: u32) -> Self {
        ScriptedApi {
            page_size,
            ..Default::default()
        }
    }

    pub fn voucher(&self, code: &str, delay: Duration, script: VoucherScript) {
        self.vouchers
            .lock()
            .unwrap()
            .insert(code.to_string(), (delay, script));
    }

    pub fn voucher_calls(&self) -> Vec<(String, i64)> {
        self.voucher_calls.lock().unwrap().clone()
    }

    pub fn set_catalog(&self, products: Vec<Product>) {
        *self.catalog.lock().unwrap() = products;
    }

    pub fn catalog_delay(&self, search: &str, delay: Duration) {
        self.catalog_delays
            .lock()
            .unwrap()
            .insert(search.to_string(), delay);
    }

    pub fn set_catalog_down(&self, down: bool) {
        *self.catalog_down.lock().unwrap() = down;
    }

    /// Forces the `next` link presence regardless of the real remainder.
    pub fn force_next(&self, next: Option<bool>) {
        *self.catalog_next_override.lock().unwrap() = next;
    }

    pub fn list_calls(&self) -> Vec<ProductQuery> {
        self.list_calls.lock().unwrap().clone()
    }

    pub fn orders(&self) -> Vec<Option<String>> {
        self.orders.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<(OrderLineKind, OrderLineRequest)> {
        self.lines.lock().unwrap().clone()
    }

    /// Past orders served by `list_orders`, newest first.
    pub fn set_history(&self, orders: Vec<Order>) {
        *self.history.lock().unwrap() = orders;
    }
}

pub fn order(code: &str, status: OrderStatus) -> Order {
    Order {
        order_code: code.to_string(),
        voucher: None,
        is_paid: true,
        status,
        created_date: None,
    }
}

#[async_trait]
impl MarketplaceApi for ScriptedApi {
    async fn validate_voucher(
        &self,
        code: &str,
        total_amount: Money,
        _product_code: &str,
    ) -> ClientResult<Money> {
        self.voucher_calls
            .lock()
            .unwrap()
            .push((code.to_string(), total_amount.units()));

        let scripted = self.vouchers.lock().unwrap().get(code).cloned();
        let (delay, script) = scripted.unwrap_or((
            Duration::ZERO,
            VoucherScript::Reject(Some("Voucher is not valid".into())),
        ));
        tokio::time::sleep(delay).await;

        match script {
            VoucherScript::Percent(p) => Ok(total_amount.percentage(p * 100)),
            VoucherScript::Fixed(units) => Ok(Money::from_units(units)),
            VoucherScript::Reject(reason) => Err(ClientError::VoucherRejected { reason }),
            VoucherScript::NetworkDown => Err(ClientError::Network("connection refused".into())),
        }
    }

    async fn create_order(&self, voucher_code: Option<&str>) -> ClientResult<Order> {
        let mut orders = self.orders.lock().unwrap();
        orders.push(voucher_code.map(str::to_string));
        Ok(Order {
            order_code: format!("OD{:04}", orders.len()),
            voucher: None,
            is_paid: false,
            status: OrderStatus::Processing,
            created_date: None,
        })
    }

    async fn add_order_line(
        &self,
        kind: OrderLineKind,
        line: &OrderLineRequest,
    ) -> ClientResult<()> {
        self.lines.lock().unwrap().push((kind, line.clone()));
        Ok(())
    }

    async fn list_products(&self, query: &ProductQuery) -> ClientResult<Page<Product>> {
        self.list_calls.lock().unwrap().push(query.clone());

        let delay = self
            .catalog_delays
            .lock()
            .unwrap()
            .get(&query.search)
            .copied()
            .unwrap_or(Duration::ZERO);
        tokio::time::sleep(delay).await;

        if *self.catalog_down.lock().unwrap() {
            return Err(ClientError::Network("connection refused".into()));
        }

        let needle = query.search.to_lowercase();
        let matching: Vec<Product> = self
            .catalog
            .lock()
            .unwrap()
            .iter()
            .filter(|p| query.product_type.map_or(true, |t| p.product_type == t))
            .filter(|p| needle.is_empty() || p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();

        let count = matching.len() as u64;
        let page = query.page.max(1);
        let start = ((page - 1) * self.page_size) as usize;
        let results: Vec<Product> = matching
            .into_iter()
            .skip(start)
            .take(self.page_size as usize)
            .collect();

        let has_next = self
            .catalog_next_override
            .lock()
            .unwrap()
            .unwrap_or(page < total_pages(count, self.page_size));

        Ok(Page {
            count,
            next: has_next.then(|| format!("/products/?page={}", page + 1)),
            previous: None,
            results,
        })
    }

    async fn toggle_favorite(&self, product_code: &str) -> ClientResult<bool> {
        let mut favorites = self.favorites.lock().unwrap();
        if let Some(at) = favorites.iter().position(|c| c == product_code) {
            favorites.remove(at);
            Ok(false)
        } else {
            favorites.push(product_code.to_string());
            Ok(true)
        }
    }

    async fn list_favorites(&self, search: &str) -> ClientResult<Vec<Product>> {
        let favorites = self.favorites.lock().unwrap().clone();
        let needle = search.trim().to_lowercase();
        Ok(self
            .catalog
            .lock()
            .unwrap()
            .iter()
            .filter(|p| favorites.contains(&p.product_code))
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn list_orders(&self, query: &OrderQuery) -> ClientResult<Page<Order>> {
        let matching: Vec<Order> = self
            .history
            .lock()
            .unwrap()
            .iter()
            .filter(|o| query.status.map_or(true, |s| o.status == s))
            .filter(|o| o.order_code.contains(query.search.trim()))
            .cloned()
            .collect();

        let count = matching.len() as u64;
        let page = query.page.max(1);
        let start = ((page - 1) * self.page_size) as usize;
        let has_next = page < total_pages(count, self.page_size);
        Ok(Page {
            count,
            next: has_next.then(|| format!("/orders/my-orders/?page={}", page + 1)),
            previous: None,
            results: matching
                .into_iter()
                .skip(start)
                .take(self.page_size as usize)
                .collect(),
        })
    }

    async fn current_user(&self) -> ClientResult<User> {
        Ok(User {
            user_code: "US01".into(),
            username: "alice".into(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            role: "buyer".into(),
            is_verified: true,
        })
    }
}
