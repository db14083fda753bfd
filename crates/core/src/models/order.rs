//! Placed orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Address;
use crate::types::{AddressId, OrderId, OrderStatus, PaymentMethod, ProductId, Rupees};

/// One ordered product line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    /// Product name when the backend populated the reference.
    pub name: Option<String>,
    pub image: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: u32,
    /// Unit price charged.
    pub price: Rupees,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Rupees {
        self.price * self.quantity
    }
}

/// Delivery address reference, bare or populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderAddress {
    Id(AddressId),
    Full(Box<Address>),
}

impl OrderAddress {
    #[must_use]
    pub fn id(&self) -> &AddressId {
        match self {
            Self::Id(id) => id,
            Self::Full(address) => &address.id,
        }
    }
}

/// An order as the client sees it. Immutable apart from cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub items: Vec<OrderItem>,
    pub address: Option<OrderAddress>,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub total_amount: Rupees,
    pub created_at: Option<DateTime<Utc>>,
    /// Customer display name, present on admin listings.
    pub customer: Option<String>,
}

impl Order {
    /// Whether the customer-facing cancel action is offered.
    #[must_use]
    pub const fn can_cancel(&self) -> bool {
        self.status.can_cancel()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: OrderStatus) -> Order {
        Order {
            id: OrderId::new("o1"),
            items: vec![OrderItem {
                product_id: ProductId::new("p1"),
                name: Some("Tee".into()),
                image: None,
                size: Some("M".into()),
                color: Some("Black".into()),
                quantity: 2,
                price: Rupees::from(499),
            }],
            address: Some(OrderAddress::Id(AddressId::new("a1"))),
            payment_method: PaymentMethod::CashOnDelivery,
            status,
            total_amount: Rupees::from(1097),
            created_at: None,
            customer: None,
        }
    }

    #[test]
    fn test_cancel_gate_follows_status() {
        assert!(order(OrderStatus::Pending).can_cancel());
        assert!(!order(OrderStatus::Shipped).can_cancel());
    }

    #[test]
    fn test_line_total_and_units() {
        let o = order(OrderStatus::Pending);
        assert_eq!(o.items.first().map(OrderItem::line_total), Some(Rupees::from(998)));
        assert_eq!(o.unit_count(), 2);
        assert_eq!(o.address.as_ref().map(|a| a.id().as_str()), Some("a1"));
    }
}
