//! # Notices
//!
//! Non-blocking messages for the user ("voucher expired", "could not load
//! products"). The reconcilers never fail a command because of a backend
//! problem; they recover locally and report through a [`NoticeSink`].

use std::sync::Mutex;

use serde::Serialize;

/// Which part of the screen a notice belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Voucher,
    Catalog,
    Checkout,
}

/// A message to show without interrupting the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn voucher(message: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Voucher,
            message: message.into(),
        }
    }

    pub fn catalog(message: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Catalog,
            message: message.into(),
        }
    }

    pub fn checkout(message: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Checkout,
            message: message.into(),
        }
    }
}

/// Receiver of notices (a toast in the app, stderr in the CLI).
pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Drops every notice.
pub struct NoOpNotices;

impl NoticeSink for NoOpNotices {
    fn notify(&self, _notice: Notice) {}
}

/// Keeps notices in memory until drained.
#[derive(Default)]
pub struct CollectedNotices {
    notices: Mutex<Vec<Notice>>,
}

impl CollectedNotices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns everything collected so far.
    pub fn drain(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl NoticeSink for CollectedNotices {
    fn notify(&self, notice: Notice) {
        match self.notices.lock() {
            Ok(mut guard) => guard.push(notice),
            Err(poisoned) => poisoned.into_inner().push(notice),
        }
    }
}
