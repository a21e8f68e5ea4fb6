//! # mmo-client: Marketplace Client for the MMO Market
//!
//! Everything in the client that talks to the backend or waits on a timer:
//! the REST API, the signed-in session, and the two reactive screens that
//! have to stay consistent while the user keeps typing.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Client Architecture                             │
//! │                                                                         │
//! │   Product list screen            Product detail screen                  │
//! │   ┌──────────────────┐           ┌──────────────────────────────────┐  │
//! │   │   CatalogHandle  │           │          PricingHandle           │  │
//! │   │ search, category │           │   quantity, voucher input        │  │
//! │   │ load_more,refresh│           │   watch<PricingState>            │  │
//! │   └────────┬─────────┘           └────────────────┬─────────────────┘  │
//! │            │ mpsc                                  │ mpsc               │
//! │   ┌────────▼─────────┐           ┌────────────────▼─────────────────┐  │
//! │   │ CatalogFeed actor│           │   PricingReconciler actor        │  │
//! │   │ debounce + seq   │           │   debounce + seq + abort         │  │
//! │   └────────┬─────────┘           └────────────────┬─────────────────┘  │
//! │            │                                       │                    │
//! │            └──────────────┬────────────────────────┘                    │
//! │                           ▼                                             │
//! │   ┌──────────────────────────────────────┐    ┌──────────────────────┐ │
//! │   │  MarketplaceApi (trait) ── HttpApi   │◄───│ Session (OAuth2)     │ │
//! │   └──────────────────────────────────────┘    └──────────────────────┘ │
//! │                           ▲                                             │
//! │        place_order() (checkout)   order history, favorites (account)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`api`] - `MarketplaceApi` trait and its reqwest implementation
//! - [`session`] - OAuth2 password login and bearer tokens
//! - [`config`] - Client configuration (TOML file + environment)
//! - [`reconciler`] - Price box actor for the product detail screen
//! - [`catalog`] - Paged product feed actor for the list screen
//! - [`checkout`] - Order creation from a settled price box
//! - [`account`] - Order history and favorites of the signed-in user
//! - [`debounce`] - Latest-value-wins timer shared by both actors
//! - [`notice`] - Non-blocking user notices
//! - [`error`] - Client error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mmo_client::{ClientConfig, HttpApi, PricingReconciler, Session};
//!
//! let config = ClientConfig::load_or_default(None);
//! let session = Session::new(&config)?;
//! session.login("alice", "secret").await?;
//!
//! let api = Arc::new(HttpApi::new(&config, session.clone()));
//! let pricing = PricingReconciler::new(&product, api, &config).start();
//!
//! pricing.set_quantity("2").await?;
//! pricing.set_voucher_input("SALE10").await?;
//! let settled = pricing.wait_for(|s| !s.pending).await?;
//! println!("Total: {}", settled.breakdown.final_total);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod account;
pub mod api;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod debounce;
pub mod error;
pub mod notice;
pub mod reconciler;
pub mod session;

#[cfg(test)]
mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use account::{load_order_history, set_favorite, OrderHistory};
pub use api::{HttpApi, MarketplaceApi, OrderQuery, ProductQuery};
pub use catalog::{CatalogFeed, CatalogHandle, FeedState};
pub use checkout::place_order;
pub use config::ClientConfig;
pub use debounce::Debouncer;
pub use error::{ClientError, ClientResult};
pub use notice::{CollectedNotices, NoOpNotices, Notice, NoticeKind, NoticeSink};
pub use reconciler::{PricingHandle, PricingReconciler};
pub use session::{Session, TokenInfo};
