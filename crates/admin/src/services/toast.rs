//! Transient operator notifications.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

/// How long a toast stays visible.
pub const TOAST_LIFETIME: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
    shown_at: Instant,
}

impl Toast {
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.shown_at) >= TOAST_LIFETIME
    }
}

#[derive(Debug, Default)]
struct ToastState {
    next_id: u64,
    toasts: Vec<Toast>,
}

/// Toasts currently on screen. Expired toasts are pruned on read.
#[derive(Debug, Clone, Default)]
pub struct Toasts {
    state: Arc<RwLock<ToastState>>,
}

impl Toasts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, kind: ToastKind, message: impl Into<String>) -> u64 {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let toast = Toast {
            id: state.next_id,
            kind,
            message: message.into(),
            shown_at: Instant::now(),
        };
        tracing::debug!(toast_id = toast.id, kind = ?kind, message = %toast.message, "toast");
        state.toasts.push(toast);
        state.next_id
    }

    pub async fn success(&self, message: impl Into<String>) -> u64 {
        self.push(ToastKind::Success, message).await
    }

    pub async fn error(&self, message: impl Into<String>) -> u64 {
        self.push(ToastKind::Error, message).await
    }

    pub async fn info(&self, message: impl Into<String>) -> u64 {
        self.push(ToastKind::Info, message).await
    }

    /// Visible toasts, oldest first.
    pub async fn active(&self) -> Vec<Toast> {
        let now = Instant::now();
        let mut state = self.state.write().await;
        state.toasts.retain(|t| !t.is_expired(now));
        state.toasts.clone()
    }

    /// Close a toast early.
    pub async fn dismiss(&self, id: u64) {
        self.state.write().await.toasts.retain(|t| t.id != id);
    }
}
