// SPDX-License-Identifier: MPL-2.0

//! Toast and alert stores the screens use to surface action outcomes.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::watch;

pub const TOAST_TIMEOUT: Duration = Duration::from_secs(3);
/// Errors stay up longer
pub const ERROR_TOAST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Info,
    Error,
}

impl ToastKind {
    fn timeout(self) -> Duration {
        match self {
            Self::Error => ERROR_TOAST_TIMEOUT,
            Self::Success | Self::Info => TOAST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
    pub expires_at: Instant,
}

#[derive(Clone)]
pub struct ToastStore {
    toasts: Arc<watch::Sender<Vec<Toast>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for ToastStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastStore {
    pub fn new() -> Self {
        let (toasts, _) = watch::channel(Vec::new());
        Self {
            toasts: Arc::new(toasts),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Toast>> {
        self.toasts.subscribe()
    }

    pub fn visible(&self) -> Vec<Toast> {
        self.toasts.borrow().clone()
    }

    pub fn show(&self, kind: ToastKind, message: impl Into<String>) -> u64 {
        self.show_at(kind, message, Instant::now())
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.show(ToastKind::Success, message)
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.show(ToastKind::Info, message)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.show(ToastKind::Error, message)
    }

    fn show_at(&self, kind: ToastKind, message: impl Into<String>, now: Instant) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let toast = Toast {
            id,
            kind,
            message: message.into(),
            expires_at: now + kind.timeout(),
        };
        tracing::debug!(id, ?kind, message = %toast.message, "toast");
        self.toasts.send_modify(|t| t.push(toast));
        id
    }

    pub fn reset(&self) {
        self.toasts.send_replace(Vec::new());
    }

    pub fn dismiss(&self, id: u64) {
        self.toasts.send_if_modified(|t| {
            let before = t.len();
            t.retain(|toast| toast.id != id);
            t.len() != before
        });
    }

    /// Drop every toast that has expired by `now`.
    pub fn prune(&self, now: Instant) {
        self.toasts.send_if_modified(|t| {
            let before = t.len();
            t.retain(|toast| toast.expires_at > now);
            t.len() != before
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlertState {
    pub current: Option<Alert>,
    pub queued: VecDeque<Alert>,
}

/// One modal alert at a time; later alerts wait their turn.
#[derive(Clone)]
pub struct AlertStore {
    state: Arc<watch::Sender<AlertState>>,
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(AlertState::default());
        Self {
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AlertState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> Option<Alert> {
        self.state.borrow().current.clone()
    }

    pub fn pending(&self) -> usize {
        self.state.borrow().queued.len()
    }

    pub fn show(&self, alert: Alert) {
        tracing::debug!(title = %alert.title, "alert");
        self.state.send_modify(|s| {
            if s.current.is_none() {
                s.current = Some(alert);
            } else {
                s.queued.push_back(alert);
            }
        });
    }

    /// Drop the visible alert and everything queued behind it.
    pub fn reset(&self) {
        self.state.send_replace(AlertState::default());
    }

    /// Close the visible alert and bring up the next queued one.
    pub fn dismiss(&self) {
        self.state.send_if_modified(|s| {
            if s.current.is_none() {
                return false;
            }
            s.current = s.queued.pop_front();
            true
        });
    }
}
