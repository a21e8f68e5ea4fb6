//! # Catalog Feed
//!
//! The product list screen: debounced search and category filter, infinite
//! scroll, pull to refresh.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Catalog Feed                                   │
//! │                                                                         │
//! │  set_search("net") ─┐                                                   │
//! │  set_category(..) ──┴──► Debouncer (500 ms) ──► load page 1 (replace)   │
//! │                                                                         │
//! │  refresh() ─────────────────────────────────► load page 1 (replace)   │
//! │                                                                         │
//! │  load_more() ──► page < total_pages && !loading ──► load page N+1     │
//! │                                                      (append)           │
//! │                                                                         │
//! │  every merge: dedup by product_code, first occurrence wins             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Loads carry the same sequence guard as the pricing reconciler: a newer
//! load aborts the older one and late answers are dropped.
//!
//! A new search or category only becomes the committed query once its page 1
//! arrives. If that load fails, the list, the paging counters and the query
//! all stay on the previous query, so `load_more` keeps paging the rows that
//! are on screen.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mmo_core::listing::{merge_dedup, total_pages, MergeMode};
use mmo_core::validation::validate_search_query;
use mmo_core::{Page, Product, ProductType};

use crate::api::{MarketplaceApi, ProductQuery};
use crate::config::ClientConfig;
use crate::debounce::Debouncer;
use crate::error::{ClientError, ClientResult};
use crate::notice::{NoOpNotices, Notice, NoticeSink};

const COMMAND_BUFFER: usize = 64;

// =============================================================================
// Feed State
// =============================================================================

/// Everything the product list renders.
#[derive(Debug, Clone, Serialize)]
pub struct FeedState {
    /// Search text of the query `items` belong to.
    pub search: String,
    /// Category of the query `items` belong to, `None` for all.
    pub category: Option<ProductType>,
    /// Merged, deduplicated rows.
    pub items: Vec<Product>,
    /// Last page successfully loaded (0 before the first load).
    pub page: u32,
    pub total_pages: u32,
    /// False once the backend stops advertising a next page.
    pub has_next: bool,
    pub loading: bool,
}

impl Default for FeedState {
    fn default() -> Self {
        FeedState {
            search: String::new(),
            category: None,
            items: Vec::new(),
            page: 0,
            total_pages: 1,
            has_next: false,
            loading: false,
        }
    }
}

impl FeedState {
    /// Returns true if `load_more` would fetch another page.
    pub fn can_load_more(&self) -> bool {
        !self.loading && self.has_next && self.page < self.total_pages
    }
}

// =============================================================================
// Commands
// =============================================================================

#[derive(Debug)]
enum FeedCommand {
    SetSearch(String),
    SetCategory(Option<ProductType>),
    LoadMore,
    Refresh,
    Shutdown,
}

#[derive(Debug)]
struct LoadOutcome {
    seq: u64,
    page: u32,
    mode: MergeMode,
    query: QueryInput,
    result: ClientResult<Page<Product>>,
}

/// A search and category pair, typed or committed.
#[derive(Debug, Clone, Default)]
struct QueryInput {
    search: String,
    category: Option<ProductType>,
}

// =============================================================================
// Handle
// =============================================================================

/// Handle for driving a running catalog feed.
#[derive(Clone)]
pub struct CatalogHandle {
    cmd_tx: mpsc::Sender<FeedCommand>,
    state_rx: watch::Receiver<FeedState>,
}

impl CatalogHandle {
    pub async fn set_search(&self, text: impl Into<String>) -> ClientResult<()> {
        self.send(FeedCommand::SetSearch(text.into())).await
    }

    pub async fn set_category(&self, category: Option<ProductType>) -> ClientResult<()> {
        self.send(FeedCommand::SetCategory(category)).await
    }

    /// Loads the next page if there is one and nothing is loading.
    pub async fn load_more(&self) -> ClientResult<()> {
        self.send(FeedCommand::LoadMore).await
    }

    /// Reloads page 1 right away.
    pub async fn refresh(&self) -> ClientResult<()> {
        self.send(FeedCommand::Refresh).await
    }

    pub async fn shutdown(&self) -> ClientResult<()> {
        self.send(FeedCommand::Shutdown).await
    }

    pub fn snapshot(&self) -> FeedState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state_rx.clone()
    }

    /// Waits until the published state satisfies `predicate`.
    pub async fn wait_for<F>(&self, mut predicate: F) -> ClientResult<FeedState>
    where
        F: FnMut(&FeedState) -> bool,
    {
        let mut rx = self.state_rx.clone();
        let state = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| ClientError::ChannelClosed("Catalog feed stopped".into()))?;
        Ok(state.clone())
    }

    async fn send(&self, cmd: FeedCommand) -> ClientResult<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| ClientError::ChannelClosed("Catalog feed channel closed".into()))
    }
}

// =============================================================================
// Feed
// =============================================================================

/// Product list state machine for one open list screen.
pub struct CatalogFeed {
    api: Arc<dyn MarketplaceApi>,
    notices: Arc<dyn NoticeSink>,
    config: ClientConfig,
}

impl CatalogFeed {
    pub fn new(api: Arc<dyn MarketplaceApi>, config: &ClientConfig) -> Self {
        Self::with_notices(api, config, Arc::new(NoOpNotices))
    }

    pub fn with_notices(
        api: Arc<dyn MarketplaceApi>,
        config: &ClientConfig,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        CatalogFeed {
            api,
            notices,
            config: config.clone(),
        }
    }

    /// Starts the actor, which immediately loads page 1.
    pub fn start(self) -> CatalogHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (state_tx, state_rx) = watch::channel(FeedState::default());
        let (outcome_tx, outcome_rx) = mpsc::channel(COMMAND_BUFFER);

        let actor = FeedActor {
            view_id: Uuid::new_v4(),
            api: self.api,
            notices: self.notices,
            page_size: self.config.timing.page_size.max(1),
            input: QueryInput::default(),
            query_changes: Debouncer::new(self.config.search_debounce()),
            state: FeedState::default(),
            state_tx,
            seq: 0,
            in_flight: None,
            outcome_tx,
        };
        tokio::spawn(actor.run(cmd_rx, outcome_rx));

        CatalogHandle { cmd_tx, state_rx }
    }
}

// =============================================================================
// Actor
// =============================================================================

struct FeedActor {
    view_id: Uuid,
    api: Arc<dyn MarketplaceApi>,
    notices: Arc<dyn NoticeSink>,
    page_size: u32,
    input: QueryInput,
    query_changes: Debouncer<()>,
    state: FeedState,
    state_tx: watch::Sender<FeedState>,
    seq: u64,
    in_flight: Option<JoinHandle<()>>,
    outcome_tx: mpsc::Sender<LoadOutcome>,
}

impl FeedActor {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<FeedCommand>,
        mut outcome_rx: mpsc::Receiver<LoadOutcome>,
    ) {
        info!(
            view = %self.view_id,
            page_size = self.page_size,
            debounce_ms = self.query_changes.window().as_millis() as u64,
            "Catalog feed started"
        );
        self.load(1, MergeMode::Replace, self.committed_query());

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(FeedCommand::SetSearch(text)) => {
                        self.input.search = text;
                        self.query_changes.push(());
                    }
                    Some(FeedCommand::SetCategory(category)) => {
                        self.input.category = category;
                        self.query_changes.push(());
                    }
                    Some(FeedCommand::LoadMore) => self.load_more(),
                    Some(FeedCommand::Refresh) => {
                        self.query_changes.cancel();
                        self.commit_query();
                    }
                    Some(FeedCommand::Shutdown) | None => break,
                },
                () = self.query_changes.ready(), if self.query_changes.is_armed() => {
                    self.commit_query();
                }
                Some(outcome) = outcome_rx.recv() => self.apply(outcome),
            }
        }

        self.query_changes.cancel();
        self.abort_in_flight();
        info!(view = %self.view_id, "Catalog feed stopped");
    }

    /// Loads page 1 for the typed inputs. They are adopted in `apply` once
    /// that page arrives.
    fn commit_query(&mut self) {
        let search = match validate_search_query(&self.input.search) {
            Ok(search) => search,
            Err(e) => {
                warn!(view = %self.view_id, error = %e, "Search text rejected");
                self.notices.notify(Notice::catalog(e.to_string()));
                self.state.search.clone()
            }
        };
        let query = QueryInput {
            search,
            category: self.input.category,
        };
        self.load(1, MergeMode::Replace, query);
    }

    fn committed_query(&self) -> QueryInput {
        QueryInput {
            search: self.state.search.clone(),
            category: self.state.category,
        }
    }

    fn load_more(&mut self) {
        if !self.state.can_load_more() {
            debug!(
                view = %self.view_id,
                page = self.state.page,
                total_pages = self.state.total_pages,
                loading = self.state.loading,
                "Nothing more to load"
            );
            return;
        }
        self.load(self.state.page + 1, MergeMode::Append, self.committed_query());
    }

    fn load(&mut self, page: u32, mode: MergeMode, query: QueryInput) {
        self.seq += 1;
        self.abort_in_flight();

        let seq = self.seq;
        let request = ProductQuery {
            search: query.search.clone(),
            product_type: query.category,
            page,
        };
        debug!(view = %self.view_id, seq, page, search = %request.search, category = ?request.product_type, "Loading products");

        self.state.loading = true;
        self.publish();

        let api = Arc::clone(&self.api);
        let outcome_tx = self.outcome_tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = api.list_products(&request).await;
            let _ = outcome_tx
                .send(LoadOutcome {
                    seq,
                    page,
                    mode,
                    query,
                    result,
                })
                .await;
        }));
    }

    fn apply(&mut self, outcome: LoadOutcome) {
        if outcome.seq != self.seq {
            debug!(view = %self.view_id, seq = outcome.seq, latest = self.seq, "Discarding stale product page");
            return;
        }
        self.in_flight = None;
        self.state.loading = false;

        match outcome.result {
            Ok(page) => {
                let has_next = page.has_next();
                if outcome.mode == MergeMode::Replace {
                    self.state.search = outcome.query.search;
                    self.state.category = outcome.query.category;
                }
                let items = std::mem::take(&mut self.state.items);
                self.state.items = merge_dedup(items, page.results, outcome.mode);
                self.state.page = outcome.page;
                self.state.total_pages = total_pages(page.count, self.page_size);
                self.state.has_next = has_next;
                debug!(
                    view = %self.view_id,
                    page = outcome.page,
                    total_pages = self.state.total_pages,
                    items = self.state.items.len(),
                    "Products loaded"
                );
            }
            Err(e) => {
                warn!(
                    view = %self.view_id,
                    page = outcome.page,
                    search = %outcome.query.search,
                    error = %e,
                    "Failed to load products, keeping previous query"
                );
                self.notices.notify(Notice::catalog(e.user_message()));
            }
        }

        self.publish();
    }

    fn abort_in_flight(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}
