//! Order history, tracking and cancellation.

use std::sync::Arc;
use std::time::Duration;

use apparel_core::{Order, OrderId, OrderItem, OrderStatus, StepState, timeline};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, instrument};

use crate::backend::{BackendClient, BackendError};
use crate::poller::Poller;
use crate::services::auth::AuthStore;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("sign-in required")]
    AuthRequired,

    #[error("order not found: {0}")]
    NotFound(OrderId),

    #[error("order is {0} and can no longer be cancelled")]
    NotCancellable(OrderStatus),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl OrderError {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthRequired => "Please log in to continue".to_string(),
            Self::NotFound(_) => "Order not found".to_string(),
            Self::NotCancellable(status) => {
                format!("This order is {status} and can no longer be cancelled")
            }
            Self::Backend(e) => e.user_message(),
        }
    }
}

/// One product line of an order, as the order list renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub item: OrderItem,
}

impl OrderLine {
    #[must_use]
    pub const fn can_cancel(&self) -> bool {
        self.status.can_cancel()
    }

    /// Tracking steps, `None` for a cancelled order.
    #[must_use]
    pub fn timeline(&self) -> Option<[(OrderStatus, StepState); 4]> {
        timeline(self.status)
    }
}

/// Flatten orders into one line per ordered product, newest order first.
#[must_use]
pub fn flatten(orders: &[Order]) -> Vec<OrderLine> {
    let mut sorted: Vec<&Order> = orders.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted
        .into_iter()
        .flat_map(|order| {
            order.items.iter().map(|item| OrderLine {
                order_id: order.id.clone(),
                status: order.status,
                created_at: order.created_at,
                item: item.clone(),
            })
        })
        .collect()
}

/// A status difference seen between two refreshes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
}

#[derive(Debug, Default)]
struct TrackerState {
    orders: Vec<Order>,
    selected: Option<OrderId>,
}

/// The signed-in customer's orders.
#[derive(Clone)]
pub struct OrderTracker {
    client: BackendClient,
    auth: AuthStore,
    state: Arc<RwLock<TrackerState>>,
}

impl OrderTracker {
    #[must_use]
    pub fn new(auth: AuthStore) -> Self {
        Self {
            client: auth.client().clone(),
            auth,
            state: Arc::new(RwLock::new(TrackerState::default())),
        }
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.state.read().await.orders.clone()
    }

    pub async fn lines(&self) -> Vec<OrderLine> {
        flatten(&self.state.read().await.orders)
    }

    /// Reload orders. Returns the status changes since the last load.
    ///
    /// An open detail view whose order disappeared is closed.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::AuthRequired` when signed out, or the backend
    /// error; previous orders are kept on failure.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Vec<StatusChange>, OrderError> {
        if !self.auth.is_authenticated().await {
            return Err(OrderError::AuthRequired);
        }
        let fresh = self.client.my_orders().await?;

        let mut state = self.state.write().await;
        let changes: Vec<StatusChange> = fresh
            .iter()
            .filter_map(|order| {
                let previous = state.orders.iter().find(|o| o.id == order.id)?;
                (previous.status != order.status).then(|| StatusChange {
                    order_id: order.id.clone(),
                    from: previous.status,
                    to: order.status,
                })
            })
            .collect();

        if let Some(selected) = &state.selected
            && !fresh.iter().any(|o| &o.id == selected)
        {
            debug!(order_id = %selected, "selected order no longer listed");
            state.selected = None;
        }
        state.orders = fresh;

        for change in &changes {
            info!(order_id = %change.order_id, from = %change.from, to = %change.to, "order status changed");
        }
        Ok(changes)
    }

    /// Open the detail view for an order. Returns the order if it is known.
    pub async fn select(&self, id: &OrderId) -> Option<Order> {
        let mut state = self.state.write().await;
        let order = state.orders.iter().find(|o| &o.id == id).cloned();
        state.selected = order.as_ref().map(|o| o.id.clone());
        order
    }

    /// The order in the open detail view, if it still exists.
    pub async fn selected(&self) -> Option<Order> {
        let state = self.state.read().await;
        let id = state.selected.as_ref()?;
        state.orders.iter().find(|o| &o.id == id).cloned()
    }

    pub async fn close(&self) {
        self.state.write().await.selected = None;
    }

    /// Cancel a pending order, then reload.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` or `OrderError::NotCancellable`
    /// without calling the backend, or the backend error.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn cancel(&self, id: &OrderId) -> Result<(), OrderError> {
        let status = {
            let state = self.state.read().await;
            state
                .orders
                .iter()
                .find(|o| &o.id == id)
                .map(|o| o.status)
                .ok_or_else(|| OrderError::NotFound(id.clone()))?
        };
        if !status.can_cancel() {
            return Err(OrderError::NotCancellable(status));
        }

        self.client.cancel_order(id).await?;
        info!("order cancelled");
        self.refresh().await?;
        Ok(())
    }

    /// Reload orders every `interval` until the returned poller is dropped.
    #[must_use]
    pub fn start_polling(&self, interval: Duration) -> Poller {
        let tracker = self.clone();
        Poller::spawn("order-tracker", interval, move || {
            let tracker = tracker.clone();
            async move { tracker.refresh().await.map(drop) }
        })
    }

    /// Poll like [`OrderTracker::start_polling`] and forward every status
    /// change to the returned receiver. Polling stops with the poller; the
    /// receiver then drains and closes.
    #[must_use]
    pub fn watch(&self, interval: Duration) -> (Poller, mpsc::UnboundedReceiver<StatusChange>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let tracker = self.clone();
        let poller = Poller::spawn("order-watch", interval, move || {
            let tracker = tracker.clone();
            let tx = tx.clone();
            async move {
                for change in tracker.refresh().await? {
                    // Receiver gone means nobody is watching any more.
                    let _ = tx.send(change);
                }
                Ok::<(), OrderError>(())
            }
        });
        (poller, rx)
    }
}
