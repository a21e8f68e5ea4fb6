//! # Pricing Reconciler
//!
//! Keeps the product screen's price box consistent with the latest quantity
//! and voucher code without a backend call per keystroke.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Pricing Reconciler                               │
//! │                                                                         │
//! │  PricingHandle                                                          │
//! │  ├── set_quantity("3") ─────────────┐                                   │
//! │  └── set_voucher_input("SA") ──┐    │        mpsc                       │
//! │                                ▼    ▼                                   │
//! │                      ┌───────────────────────┐                          │
//! │                      │     actor task        │                          │
//! │                      │                       │                          │
//! │                      │  Debouncer (1000 ms)  │──► commit voucher_code   │
//! │                      │  seq: u64             │                          │
//! │                      │  in_flight: JoinHandle│──► validate_voucher(...) │
//! │                      │                       │◄── (seq, outcome)        │
//! │                      └──────────┬────────────┘                          │
//! │                                 │ watch                                 │
//! │                                 ▼                                       │
//! │                         PricingState (snapshot)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering
//! Every voucher check carries a sequence number. Issuing a new check aborts
//! the previous one, and an outcome whose number is not the latest is
//! discarded. The published breakdown therefore always answers the most
//! recent (quantity, voucher code) pair that was fully answered.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mmo_core::pricing::{recompute, PricingState};
use mmo_core::validation::{coerce_quantity, normalize_voucher_code};
use mmo_core::{Money, Product};

use crate::api::MarketplaceApi;
use crate::config::ClientConfig;
use crate::debounce::Debouncer;
use crate::error::{ClientError, ClientResult};
use crate::notice::{NoOpNotices, Notice, NoticeSink};

/// Command channel capacity.
const COMMAND_BUFFER: usize = 64;

// =============================================================================
// Commands & Outcomes
// =============================================================================

#[derive(Debug)]
enum PricingCommand {
    /// Raw text of the quantity field.
    SetQuantity(String),
    /// Raw text of the voucher field, on every keystroke.
    SetVoucherInput(String),
    Shutdown,
}

/// Result of one voucher check, tagged with the request it answers.
#[derive(Debug)]
struct CheckOutcome {
    seq: u64,
    quantity: i64,
    code: String,
    result: ClientResult<Money>,
}

/// The (quantity, committed code) pair a breakdown is computed for.
type PricingKey = (i64, Option<String>);

// =============================================================================
// Handle
// =============================================================================

/// Handle for driving a running reconciler.
///
/// Dropping every clone of the handle stops the actor.
#[derive(Clone)]
pub struct PricingHandle {
    cmd_tx: mpsc::Sender<PricingCommand>,
    state_rx: watch::Receiver<PricingState>,
}

impl PricingHandle {
    /// Feeds the quantity field. Bad input is coerced, never rejected.
    pub async fn set_quantity(&self, raw: impl Into<String>) -> ClientResult<()> {
        self.send(PricingCommand::SetQuantity(raw.into())).await
    }

    /// Feeds the voucher field. The code is committed once typing pauses.
    pub async fn set_voucher_input(&self, raw: impl Into<String>) -> ClientResult<()> {
        self.send(PricingCommand::SetVoucherInput(raw.into())).await
    }

    /// Stops the reconciler, clearing its timer and in-flight check.
    pub async fn shutdown(&self) -> ClientResult<()> {
        self.send(PricingCommand::Shutdown).await
    }

    /// Latest published state.
    pub fn snapshot(&self) -> PricingState {
        self.state_rx.borrow().clone()
    }

    /// Receiver that observes every published state.
    pub fn subscribe(&self) -> watch::Receiver<PricingState> {
        self.state_rx.clone()
    }

    /// Waits until the published state satisfies `predicate`.
    pub async fn wait_for<F>(&self, mut predicate: F) -> ClientResult<PricingState>
    where
        F: FnMut(&PricingState) -> bool,
    {
        let mut rx = self.state_rx.clone();
        let state = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| ClientError::ChannelClosed("Pricing reconciler stopped".into()))?;
        Ok(state.clone())
    }

    async fn send(&self, cmd: PricingCommand) -> ClientResult<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| ClientError::ChannelClosed("Pricing reconciler channel closed".into()))
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// Price box state machine for one open product screen.
pub struct PricingReconciler {
    product_code: String,
    unit_price: Money,
    api: Arc<dyn MarketplaceApi>,
    notices: Arc<dyn NoticeSink>,
    voucher_window: Duration,
}

impl PricingReconciler {
    /// Creates a reconciler for `product` that drops notices.
    pub fn new(product: &Product, api: Arc<dyn MarketplaceApi>, config: &ClientConfig) -> Self {
        Self::with_notices(product, api, config, Arc::new(NoOpNotices))
    }

    /// Creates a reconciler reporting through `notices`.
    pub fn with_notices(
        product: &Product,
        api: Arc<dyn MarketplaceApi>,
        config: &ClientConfig,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        PricingReconciler {
            product_code: product.product_code.clone(),
            unit_price: product.price(),
            api,
            notices,
            voucher_window: config.voucher_debounce(),
        }
    }

    /// Starts the actor and returns its handle.
    pub fn start(self) -> PricingHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (state_tx, state_rx) = watch::channel(PricingState::new(self.unit_price));
        let (outcome_tx, outcome_rx) = mpsc::channel(COMMAND_BUFFER);

        let actor = PricingActor::new(self, state_tx, outcome_tx);
        tokio::spawn(actor.run(cmd_rx, outcome_rx));

        PricingHandle { cmd_tx, state_rx }
    }
}

// =============================================================================
// Actor
// =============================================================================

struct PricingActor {
    view_id: Uuid,
    product_code: String,
    unit_price: Money,
    api: Arc<dyn MarketplaceApi>,
    notices: Arc<dyn NoticeSink>,
    state: PricingState,
    state_tx: watch::Sender<PricingState>,
    voucher_input: Debouncer<String>,
    /// Pair the published breakdown answers.
    displayed: PricingKey,
    seq: u64,
    in_flight: Option<JoinHandle<()>>,
    outcome_tx: mpsc::Sender<CheckOutcome>,
}

impl PricingActor {
    fn new(
        reconciler: PricingReconciler,
        state_tx: watch::Sender<PricingState>,
        outcome_tx: mpsc::Sender<CheckOutcome>,
    ) -> Self {
        let state = state_tx.borrow().clone();
        PricingActor {
            view_id: Uuid::new_v4(),
            product_code: reconciler.product_code,
            unit_price: reconciler.unit_price,
            api: reconciler.api,
            notices: reconciler.notices,
            displayed: (state.quantity, state.voucher_code.clone()),
            state,
            state_tx,
            voucher_input: Debouncer::new(reconciler.voucher_window),
            seq: 0,
            in_flight: None,
            outcome_tx,
        }
    }

    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<PricingCommand>,
        mut outcome_rx: mpsc::Receiver<CheckOutcome>,
    ) {
        info!(
            view = %self.view_id,
            product = %self.product_code,
            unit_price = self.unit_price.units(),
            debounce_ms = self.voucher_input.window().as_millis() as u64,
            "Pricing reconciler started"
        );

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(PricingCommand::SetQuantity(raw)) => self.set_quantity(&raw),
                    Some(PricingCommand::SetVoucherInput(raw)) => self.voucher_input.push(raw),
                    Some(PricingCommand::Shutdown) | None => break,
                },
                raw = self.voucher_input.ready(), if self.voucher_input.is_armed() => {
                    self.commit_voucher(&raw);
                }
                Some(outcome) = outcome_rx.recv() => self.apply(outcome),
            }
        }

        self.teardown();
        info!(view = %self.view_id, "Pricing reconciler stopped");
    }

    fn set_quantity(&mut self, raw: &str) {
        let coerced = coerce_quantity(raw);
        if let Some(issue) = &coerced.issue {
            debug!(view = %self.view_id, raw = %raw, coerced = coerced.value, %issue, "Quantity input coerced");
        }
        if coerced.value == self.state.quantity {
            return;
        }
        self.state.quantity = coerced.value;
        self.reconcile();
    }

    fn commit_voucher(&mut self, raw: &str) {
        let code = normalize_voucher_code(raw);
        if code == self.state.voucher_code {
            return;
        }
        debug!(view = %self.view_id, code = ?code, "Voucher code committed");
        self.state.voucher_code = code;
        self.reconcile();
    }

    /// Brings the breakdown in line with the current inputs.
    fn reconcile(&mut self) {
        self.seq += 1;
        self.abort_in_flight();

        let key: PricingKey = (self.state.quantity, self.state.voucher_code.clone());
        if key == self.displayed {
            debug!(view = %self.view_id, seq = self.seq, "Inputs match displayed breakdown");
            self.state.pending = false;
            self.publish();
            return;
        }

        match self.state.voucher_code.clone() {
            None => {
                self.state.breakdown = recompute(self.unit_price, self.state.quantity, Money::zero());
                self.state.pending = false;
                self.displayed = key;
                self.publish();
            }
            Some(code) => {
                self.state.pending = true;
                self.publish();
                self.issue_check(code);
            }
        }
    }

    fn issue_check(&mut self, code: String) {
        let seq = self.seq;
        let quantity = self.state.quantity;
        let subtotal = self.unit_price.multiply_quantity(quantity);
        let api = Arc::clone(&self.api);
        let product_code = self.product_code.clone();
        let outcome_tx = self.outcome_tx.clone();

        debug!(view = %self.view_id, seq, code = %code, quantity, subtotal = subtotal.units(), "Checking voucher");

        self.in_flight = Some(tokio::spawn(async move {
            let result = api.validate_voucher(&code, subtotal, &product_code).await;
            let _ = outcome_tx
                .send(CheckOutcome {
                    seq,
                    quantity,
                    code,
                    result,
                })
                .await;
        }));
    }

    fn apply(&mut self, outcome: CheckOutcome) {
        if outcome.seq != self.seq {
            let stale = ClientError::StaleResponse { seq: outcome.seq };
            debug!(view = %self.view_id, latest = self.seq, code = %outcome.code, "{}", stale);
            return;
        }
        self.in_flight = None;

        let discount = match outcome.result {
            Ok(discount) => discount,
            Err(e) => {
                debug!(view = %self.view_id, seq = outcome.seq, code = %outcome.code, error = %e, "Voucher not applied");
                self.notices.notify(Notice::voucher(e.user_message()));
                Money::zero()
            }
        };

        let breakdown = recompute(self.unit_price, outcome.quantity, discount);
        if breakdown.discount != discount {
            warn!(
                view = %self.view_id,
                code = %outcome.code,
                server_discount = discount.units(),
                subtotal = breakdown.subtotal.units(),
                "Discount clamped to subtotal"
            );
        }

        self.state.breakdown = breakdown;
        self.state.pending = false;
        self.displayed = (outcome.quantity, Some(outcome.code));
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

    fn teardown(&mut self) {
        self.voucher_input.cancel();
        self.abort_in_flight();
    }
}
