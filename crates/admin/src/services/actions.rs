//! Confirmation queue for destructive admin actions.
//!
//! Deleting a product, changing an order's status and switching a pincode's
//! delivery flag are never executed directly:
//! 1. The action is enqueued and gets an id
//! 2. The operator is shown [`AdminAction::describe`] and asked to confirm
//! 3. On approval the action runs against the backend; on rejection it is
//!    dropped without a request

use std::sync::Arc;

use apparel_core::{Order, OrderStatus, ProductId};
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::client::AdminClient;
use crate::error::AdminError;

/// A mutation that needs explicit confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminAction {
    DeleteProduct {
        id: ProductId,
        name: String,
    },
    ChangeOrderStatus {
        order: Box<Order>,
        next: OrderStatus,
    },
    SetPincodeDelivery {
        pincode: String,
        deliverable: bool,
    },
}

impl AdminAction {
    /// Confirmation prompt shown to the operator.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::DeleteProduct { name, .. } => format!("Delete product \"{name}\"?"),
            Self::ChangeOrderStatus { order, next } => {
                format!("Change order {} from {} to {next}?", order.id, order.status)
            }
            Self::SetPincodeDelivery {
                pincode,
                deliverable: true,
            } => format!("Enable delivery to {pincode}?"),
            Self::SetPincodeDelivery {
                pincode,
                deliverable: false,
            } => format!("Disable delivery to {pincode}?"),
        }
    }

    /// Text for the success toast once the action has run.
    #[must_use]
    pub fn success_message(&self) -> String {
        match self {
            Self::DeleteProduct { name, .. } => format!("Deleted {name}"),
            Self::ChangeOrderStatus { order, next } => {
                format!("Order {} marked {next}", order.id)
            }
            Self::SetPincodeDelivery {
                pincode,
                deliverable,
            } => {
                let state = if *deliverable { "enabled" } else { "disabled" };
                format!("Delivery {state} for {pincode}")
            }
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::DeleteProduct { .. } => "delete_product",
            Self::ChangeOrderStatus { .. } => "change_order_status",
            Self::SetPincodeDelivery { .. } => "set_pincode_delivery",
        }
    }

    /// Run the action. Status changes are validated before the request.
    async fn execute(&self, client: &AdminClient) -> Result<(), AdminError> {
        match self {
            Self::DeleteProduct { id, .. } => client.delete_product(id).await,
            Self::ChangeOrderStatus { order, next } => {
                client.update_order_status(order, *next).await
            }
            Self::SetPincodeDelivery {
                pincode,
                deliverable,
            } => client.set_pincode_delivery(pincode, *deliverable).await,
        }
    }
}

/// An enqueued action awaiting confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub id: u64,
    pub action: AdminAction,
}

#[derive(Debug, Default)]
struct QueueState {
    next_id: u64,
    pending: Vec<PendingAction>,
}

/// In-memory queue of actions awaiting confirmation.
#[derive(Debug, Clone, Default)]
pub struct ActionQueue {
    state: Arc<Mutex<QueueState>>,
}

impl ActionQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an action for confirmation.
    ///
    /// Order status changes that are not allowed edges are refused here so
    /// the operator is never asked to confirm something that cannot run.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Transition` for a disallowed status change.
    #[instrument(skip(self, action), fields(kind = action.kind()))]
    pub async fn enqueue(&self, action: AdminAction) -> Result<PendingAction, AdminError> {
        if let AdminAction::ChangeOrderStatus { order, next } = &action {
            order.status.admin_transition(*next)?;
        }

        let mut state = self.state.lock().await;
        state.next_id += 1;
        let pending = PendingAction {
            id: state.next_id,
            action,
        };
        state.pending.push(pending.clone());
        info!(action_id = pending.id, "Queued admin action");
        Ok(pending)
    }

    /// Actions still awaiting confirmation, oldest first.
    pub async fn pending(&self) -> Vec<PendingAction> {
        self.state.lock().await.pending.clone()
    }

    /// Confirm and execute an action.
    ///
    /// The action leaves the queue whether or not it succeeds.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NoPendingAction` for an unknown id, or the
    /// error from executing the action.
    #[instrument(skip(self, client))]
    pub async fn approve(&self, id: u64, client: &AdminClient) -> Result<AdminAction, AdminError> {
        let action = self.take(id).await?;
        action.execute(client).await?;
        info!(action_id = id, kind = action.kind(), "Admin action executed");
        Ok(action)
    }

    /// Drop an action without running it.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NoPendingAction` for an unknown id.
    #[instrument(skip(self))]
    pub async fn reject(&self, id: u64) -> Result<AdminAction, AdminError> {
        let action = self.take(id).await?;
        info!(action_id = id, kind = action.kind(), "Admin action rejected");
        Ok(action)
    }

    async fn take(&self, id: u64) -> Result<AdminAction, AdminError> {
        let mut state = self.state.lock().await;
        let index = state
            .pending
            .iter()
            .position(|p| p.id == id)
            .ok_or(AdminError::NoPendingAction(id))?;
        Ok(state.pending.remove(index).action)
    }
}
