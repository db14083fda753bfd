//! Cart and wishlist entries.
//!
//! Membership in either list is keyed by product id, never by entry id:
//! "is this product in my cart" is a set query over product ids.

use serde::{Deserialize, Serialize};

use crate::models::Product;
use crate::types::{CartItemId, ProductId};

/// What an entry knows about its product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShopProduct {
    /// Inserted optimistically before the backend confirmed the change.
    /// Only good for membership checks; carries no name or price.
    Placeholder(ProductId),
    /// Fully populated record from the backend.
    Detailed(Box<Product>),
}

impl ShopProduct {
    #[must_use]
    pub fn product_id(&self) -> &ProductId {
        match self {
            Self::Placeholder(id) => id,
            Self::Detailed(product) => &product.id,
        }
    }
}

/// One line of the cart or wishlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopEntry {
    /// Backend entry id, absent for placeholders.
    pub id: Option<CartItemId>,
    pub product: ShopProduct,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: u32,
}

impl ShopEntry {
    /// Minimal entry wrapping just a product id.
    #[must_use]
    pub const fn placeholder(product_id: ProductId) -> Self {
        Self {
            id: None,
            product: ShopProduct::Placeholder(product_id),
            size: None,
            color: None,
            quantity: 1,
        }
    }

    #[must_use]
    pub fn product_id(&self) -> &ProductId {
        self.product.product_id()
    }

    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        matches!(self.product, ShopProduct::Placeholder(_))
    }

    /// The populated product, `None` for placeholders.
    #[must_use]
    pub fn details(&self) -> Option<&Product> {
        match &self.product {
            ShopProduct::Placeholder(_) => None,
            ShopProduct::Detailed(product) => Some(product),
        }
    }
}

/// A cart or wishlist snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShopList {
    entries: Vec<ShopEntry>,
}

impl ShopList {
    #[must_use]
    pub const fn new(entries: Vec<ShopEntry>) -> Self {
        Self { entries }
    }

    /// Whether any entry references `product_id`.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.entries.iter().any(|e| e.product_id() == product_id)
    }

    /// Insert a placeholder if absent, or remove every entry for the product
    /// if present. Returns whether the product was a member before the flip.
    pub fn flip(&mut self, product_id: &ProductId) -> bool {
        let was_member = self.contains(product_id);
        if was_member {
            self.entries.retain(|e| e.product_id() != product_id);
        } else {
            self.entries.push(ShopEntry::placeholder(product_id.clone()));
        }
        was_member
    }

    /// Every entry, placeholders included.
    #[must_use]
    pub fn entries(&self) -> &[ShopEntry] {
        &self.entries
    }

    /// Entries fit for display: placeholders and products that have lost
    /// their name (removed upstream) are skipped.
    pub fn visible(&self) -> impl Iterator<Item = (&ShopEntry, &Product)> {
        self.entries.iter().filter_map(|entry| {
            entry
                .details()
                .filter(|p| p.is_displayable())
                .map(|p| (entry, p))
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Product ids in list order.
    pub fn product_ids(&self) -> impl Iterator<Item = &ProductId> {
        self.entries.iter().map(ShopEntry::product_id)
    }
}

impl FromIterator<ShopEntry> for ShopList {
    fn from_iter<I: IntoIterator<Item = ShopEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rupees;

    fn detailed(id: &str, name: &str) -> ShopEntry {
        ShopEntry {
            id: Some(CartItemId::new(format!("item-{id}"))),
            product: ShopProduct::Detailed(Box::new(Product {
                id: ProductId::new(id),
                name: name.into(),
                price: Rupees::from(499),
                mrp: None,
                category: None,
                sub_category: None,
                description: None,
                images: vec![],
                variants: vec![],
                stock: None,
            })),
            size: Some("M".into()),
            color: None,
            quantity: 1,
        }
    }

    #[test]
    fn test_flip_inserts_then_removes() {
        let mut list = ShopList::default();
        let id = ProductId::new("p1");

        assert!(!list.flip(&id));
        assert!(list.contains(&id));
        assert!(list.entries().first().is_some_and(ShopEntry::is_placeholder));

        assert!(list.flip(&id));
        assert!(list.is_empty());
    }

    #[test]
    fn test_membership_is_by_product_id_not_entry_id() {
        let list: ShopList = [detailed("p1", "Tee")].into_iter().collect();
        assert!(list.contains(&ProductId::new("p1")));
        assert!(!list.contains(&ProductId::new("item-p1")));
    }

    #[test]
    fn test_visible_skips_placeholders_and_nameless_products() {
        let list: ShopList = [
            detailed("p1", "Tee"),
            ShopEntry::placeholder(ProductId::new("p2")),
            detailed("p3", "  "),
        ]
        .into_iter()
        .collect();

        let names: Vec<_> = list.visible().map(|(_, p)| p.name.as_str()).collect();
        assert_eq!(names, ["Tee"]);
        assert_eq!(list.len(), 3);
    }
}
