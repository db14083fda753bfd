//! Status enums and small closed vocabularies shared with the backend.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when an order status change is not an allowed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("order cannot move from {from} to {to}")]
pub struct StatusTransitionError {
    /// Current status.
    pub from: OrderStatus,
    /// Requested status.
    pub to: OrderStatus,
}

/// Order lifecycle status.
///
/// ```text
/// pending -> confirmed -> shipped -> delivered
///    |           |
///    +-----------+--> cancelled
/// ```
///
/// Customers may only cancel a `pending` order. The admin console may move
/// an order forward one step at a time, or cancel it before it ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// The happy-path progression shown in the tracking timeline.
    pub const FLOW: [Self; 4] = [Self::Pending, Self::Confirmed, Self::Shipped, Self::Delivered];

    /// Whether a customer may cancel an order in this status.
    #[must_use]
    pub const fn can_cancel(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Position in [`Self::FLOW`], `None` for `cancelled`.
    #[must_use]
    pub const fn flow_index(self) -> Option<usize> {
        match self {
            Self::Pending => Some(0),
            Self::Confirmed => Some(1),
            Self::Shipped => Some(2),
            Self::Delivered => Some(3),
            Self::Cancelled => None,
        }
    }

    /// Whether the admin console may move an order from `self` to `next`.
    #[must_use]
    pub const fn admin_can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed | Self::Cancelled)
                | (Self::Confirmed, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
        )
    }

    /// Validate an admin transition.
    ///
    /// # Errors
    ///
    /// Returns [`StatusTransitionError`] if the edge is not allowed.
    pub const fn admin_transition(self, next: Self) -> Result<Self, StatusTransitionError> {
        if self.admin_can_transition_to(next) {
            Ok(next)
        } else {
            Err(StatusTransitionError {
                from: self,
                to: next,
            })
        }
    }

    /// Wire / display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Rendering state of one step in the order tracking timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    /// Step reached before the current one.
    Done,
    /// The order's current status.
    Current,
    /// Not reached yet.
    Upcoming,
}

/// Timeline for an order, or `None` when the order was cancelled (the
/// tracking bar is hidden for cancelled orders).
#[must_use]
pub fn timeline(status: OrderStatus) -> Option<[(OrderStatus, StepState); 4]> {
    let current = status.flow_index()?;
    Some(OrderStatus::FLOW.map(|step| {
        let idx = step.flow_index().unwrap_or_default();
        let state = match idx.cmp(&current) {
            core::cmp::Ordering::Less => StepState::Done,
            core::cmp::Ordering::Equal => StepState::Current,
            core::cmp::Ordering::Greater => StepState::Upcoming,
        };
        (step, state)
    }))
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
    Owner,
}

impl Role {
    /// Whether this role may use the admin console.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Owner)
    }
}

/// Address label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AddressKind {
    #[default]
    Home,
    Work,
}

/// Payment method. Only cash on delivery is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "COD")]
    CashOnDelivery,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_only_pending_orders_can_be_cancelled() {
        assert!(OrderStatus::Pending.can_cancel());
        for status in [
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert!(!status.can_cancel(), "{status} must not be cancellable");
        }
    }

    #[test]
    fn test_admin_transitions_move_forward_one_step() {
        assert!(OrderStatus::Pending.admin_can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Confirmed.admin_can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.admin_can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Pending.admin_can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Delivered.admin_can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_admin_cannot_cancel_after_shipping() {
        let err = OrderStatus::Shipped
            .admin_transition(OrderStatus::Cancelled)
            .unwrap_err();
        assert_eq!(err.to_string(), "order cannot move from shipped to cancelled");
        assert!(OrderStatus::Confirmed.admin_transition(OrderStatus::Cancelled).is_ok());
    }

    #[test]
    fn test_timeline_marks_current_step() {
        let steps = timeline(OrderStatus::Shipped).unwrap();
        let states: Vec<_> = steps.iter().map(|(_, s)| *s).collect();
        assert_eq!(
            states,
            [StepState::Done, StepState::Done, StepState::Current, StepState::Upcoming]
        );
        assert!(timeline(OrderStatus::Cancelled).is_none());
    }

    #[test]
    fn test_status_wire_format() {
        let status: OrderStatus = serde_json::from_str("\"shipped\"").unwrap();
        assert_eq!(status, OrderStatus::Shipped);
        assert_eq!("Delivered".parse::<OrderStatus>(), Ok(OrderStatus::Delivered));
        assert_eq!(
            serde_json::to_string(&PaymentMethod::CashOnDelivery).unwrap(),
            "\"COD\""
        );
    }

    #[test]
    fn test_staff_roles() {
        assert!(Role::Owner.is_staff());
        assert!(Role::Admin.is_staff());
        assert!(!Role::Customer.is_staff());
    }
}
