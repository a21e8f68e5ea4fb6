//! # Account Lists
//!
//! The signed-in user's own lists: past orders and favorite products.
//!
//! ```text
//! load_order_history(status, search, pages)
//!     page 1 ──► page 2 ──► ... until `pages` or no next link
//!     each page appended, dedup by order_code
//!
//! set_favorite(code, wanted)
//!     toggle ──► already as wanted? ── no ──► toggle again
//! ```
//!
//! The backend only offers a toggle for favorites. `set_favorite` turns it
//! into an idempotent "make it so", which is what a command line wants.

use tracing::{debug, info, warn};

use mmo_core::listing::{merge_dedup, MergeMode};
use mmo_core::{Order, OrderStatus};

use crate::api::{MarketplaceApi, OrderQuery};
use crate::error::ClientResult;

/// Orders loaded so far for one status filter.
#[derive(Debug, Clone, Default)]
pub struct OrderHistory {
    pub orders: Vec<Order>,
    /// Last page loaded.
    pub page: u32,
    /// Total orders matching the filter, across all pages.
    pub count: u64,
    pub has_next: bool,
}

/// Loads up to `pages` pages of the user's orders, newest first.
///
/// Stops early when the backend stops advertising a next page. A failure
/// on any page after the first returns what was loaded so far.
pub async fn load_order_history(
    api: &dyn MarketplaceApi,
    status: Option<OrderStatus>,
    search: &str,
    pages: u32,
) -> ClientResult<OrderHistory> {
    let mut history = OrderHistory::default();
    let mut query = OrderQuery {
        status,
        search: search.to_string(),
        page: 1,
    };

    while query.page <= pages.max(1) {
        let page = match api.list_orders(&query).await {
            Ok(page) => page,
            Err(e) if query.page > 1 => {
                warn!(page = query.page, error = %e, "Stopped loading order history");
                break;
            }
            Err(e) => return Err(e),
        };

        history.has_next = page.has_next();
        history.count = page.count;
        history.page = query.page;
        let mode = if query.page == 1 {
            MergeMode::Replace
        } else {
            MergeMode::Append
        };
        history.orders = merge_dedup(std::mem::take(&mut history.orders), page.results, mode);

        if !history.has_next {
            break;
        }
        query.page += 1;
    }

    debug!(
        status = ?status,
        page = history.page,
        loaded = history.orders.len(),
        count = history.count,
        "Order history loaded"
    );
    Ok(history)
}

/// Makes `product_code` a favorite (`wanted = true`) or not.
///
/// ## Returns
/// The favorite flag after the call, which equals `wanted` unless the
/// backend changed its mind between the two toggles.
pub async fn set_favorite(
    api: &dyn MarketplaceApi,
    product_code: &str,
    wanted: bool,
) -> ClientResult<bool> {
    let mut favourited = api.toggle_favorite(product_code).await?;
    if favourited != wanted {
        debug!(product = %product_code, wanted, "Toggle went the other way, toggling back");
        favourited = api.toggle_favorite(product_code).await?;
    }
    info!(product = %product_code, favourited, "Favorite updated");
    Ok(favourited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{order, product, ScriptedApi};
    use mmo_core::ProductType;

    fn history(n: usize) -> Vec<Order> {
        let statuses = [OrderStatus::Completed, OrderStatus::Refunded];
        (0..n)
            .map(|i| order(&format!("OD{:04}", i), statuses[i % 2]))
            .collect()
    }

    #[tokio::test]
    async fn test_history_walks_pages_until_last() {
        let api = ScriptedApi::with_page_size(5);
        api.set_history(history(12));

        let loaded = load_order_history(&api, None, "", 10).await.unwrap();
        assert_eq!(loaded.orders.len(), 12);
        assert_eq!(loaded.page, 3);
        assert_eq!(loaded.count, 12);
        assert!(!loaded.has_next);

        let first = load_order_history(&api, None, "", 1).await.unwrap();
        assert_eq!(first.orders.len(), 5);
        assert!(first.has_next);
    }

    #[tokio::test]
    async fn test_history_status_filter() {
        let api = ScriptedApi::with_page_size(5);
        api.set_history(history(12));

        let refunded = load_order_history(&api, Some(OrderStatus::Refunded), "", 5)
            .await
            .unwrap();
        assert_eq!(refunded.count, 6);
        assert!(refunded
            .orders
            .iter()
            .all(|o| o.status == OrderStatus::Refunded));

        let one = load_order_history(&api, None, "OD0007", 5).await.unwrap();
        assert_eq!(one.orders.len(), 1);
        assert_eq!(one.orders[0].order_code, "OD0007");
    }

    #[tokio::test]
    async fn test_set_favorite_is_idempotent() {
        let api = ScriptedApi::new();
        let mut netflix = product("PR0001", ProductType::Account, 90_000);
        netflix.name = "Netflix Premium".into();
        api.set_catalog(vec![netflix, product("PR0002", ProductType::Course, 10_000)]);

        assert!(set_favorite(&api, "PR0001", true).await.unwrap());
        assert!(set_favorite(&api, "PR0001", true).await.unwrap());
        assert!(set_favorite(&api, "PR0002", true).await.unwrap());
        assert_eq!(api.list_favorites("").await.unwrap().len(), 2);
        assert_eq!(api.list_favorites("netflix").await.unwrap().len(), 1);

        assert!(!set_favorite(&api, "PR0002", false).await.unwrap());
        let left = api.list_favorites("").await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].product_code, "PR0001");
    }
}
