//! # Debouncer
//!
//! A single cancel-and-restart timer holding the latest pending value.
//!
//! ```text
//!  push("A")   push("AB")  push("ABC")
//!     │           │           │
//!     ▼           ▼           ▼
//!  ───┬───────────┬───────────┬──────────────── window ──────────┬──►
//!     └ restart   └ restart   └ restart                          │
//!                                                      ready() ──► "ABC"
//! ```
//!
//! Owned by an actor and polled from its `select!` loop behind an
//! `is_armed()` guard. `ready()` is cancel safe: if another branch wins,
//! the pending value stays put. Dropping the debouncer drops the timer, so
//! nothing can fire after the owning view is gone.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

/// Latest-value-wins timer.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Debouncer {
            window,
            pending: None,
        }
    }

    /// Replaces the pending value and restarts the window.
    pub fn push(&mut self, value: T) {
        self.pending = Some((value, Instant::now() + self.window));
    }

    /// Clears the pending value, returning it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    /// Returns true if a value is waiting for its window to elapse.
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Quiet period a value has to survive before it fires.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Waits for the window to elapse and yields the pending value.
    ///
    /// Never resolves while nothing is pending.
    pub async fn ready(&mut self) -> T {
        let deadline = match &self.pending {
            Some((_, deadline)) => *deadline,
            None => std::future::pending().await,
        };
        sleep_until(deadline).await;

        match self.pending.take() {
            Some((value, _)) => value,
            None => std::future::pending().await,
        }
    }
}
