//! Wire records as the backend sends and expects them.
//!
//! These tolerate the backend's historical shapes (legacy `imageUrl`,
//! misspelled `descraption`, product references that are sometimes a bare
//! id and sometimes a populated object). They are converted into the
//! canonical `apparel_core` models before leaving the `backend` module.

use apparel_core::{Address, OrderStatus, Rupees, ServiceArea, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit `null` like a missing field.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Envelope payloads
// =============================================================================

/// Response that carries nothing beyond the envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPageResponse {
    #[serde(default, deserialize_with = "null_default")]
    pub products: Vec<WireProduct>,
    #[serde(default)]
    pub has_next_page: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleProductResponse {
    #[serde(default, alias = "product")]
    pub find_product: Option<WireProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductsResponse {
    #[serde(default, deserialize_with = "null_default")]
    pub products: Vec<WireProduct>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub has_next_page: Option<bool>,
}

/// Cart or wishlist listing; the backend has used several key names.
#[derive(Debug, Deserialize)]
pub struct ShopListResponse {
    #[serde(
        default,
        alias = "likeList",
        alias = "wishlist",
        alias = "cartList",
        alias = "cart",
        deserialize_with = "null_default"
    )]
    pub items: Vec<WireShopItem>,
}

#[derive(Debug, Deserialize)]
pub struct AddressesResponse {
    #[serde(default, deserialize_with = "null_default")]
    pub addresses: Vec<Address>,
}

#[derive(Debug, Deserialize)]
pub struct AreasResponse {
    #[serde(default, deserialize_with = "null_default")]
    pub areas: Vec<ServiceArea>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersResponse {
    #[serde(default, deserialize_with = "null_default")]
    pub orders: Vec<WireOrder>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub has_next_page: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    #[serde(default)]
    pub order: Option<WireOrder>,
    #[serde(default)]
    pub order_id: Option<String>,
}

// =============================================================================
// Products
// =============================================================================

/// Product in any of the shapes the backend has produced.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireProduct {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Rupees>,
    #[serde(default)]
    pub mrp: Option<Rupees>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sub_category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Legacy misspelling of `description`.
    #[serde(default)]
    pub descraption: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub images: Vec<WireImage>,
    /// Legacy single image.
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub variants: Vec<WireVariant>,
    #[serde(default)]
    pub stock: Option<i64>,
}

/// Image entry: a bare URL or an upload record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireImage {
    Url(String),
    Hosted {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        secure_url: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireVariant {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub stock: Option<i64>,
}

/// A product reference, bare or populated.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireProductRef {
    Id(String),
    Populated(Box<WireProduct>),
}

// =============================================================================
// Cart / wishlist
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireShopItem {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    /// `null` when the product was deleted upstream.
    #[serde(default)]
    pub product_id: Option<WireProductRef>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireOrder {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub items: Vec<WireOrderItem>,
    #[serde(default)]
    pub address_id: Option<WireAddressRef>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default, alias = "status")]
    pub order_status: OrderStatus,
    #[serde(default)]
    pub total_amount: Option<Rupees>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "userId")]
    pub user: Option<WireCustomer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireOrderItem {
    #[serde(default)]
    pub product_id: Option<WireProductRef>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub price: Option<Rupees>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireAddressRef {
    Id(String),
    Populated(Box<Address>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireCustomer {
    Id(String),
    Populated {
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        email: Option<String>,
    },
}

/// One line of an order placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: String,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Order placement payload.
///
/// The single-item fields are what the buy-now endpoint reads; they are only
/// sent when the order has exactly one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub address_id: String,
    pub payment_method: apparel_core::PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub items: Vec<OrderLineRequest>,
}

impl OrderRequest {
    /// Build a cash-on-delivery payload, filling the single-item fields when
    /// there is exactly one line.
    #[must_use]
    pub fn cash_on_delivery(address_id: String, items: Vec<OrderLineRequest>) -> Self {
        let single = match items.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        };
        Self {
            address_id,
            payment_method: apparel_core::PaymentMethod::CashOnDelivery,
            product_id: single.as_ref().map(|l| l.product_id.clone()),
            single_quantity: single.as_ref().map(|l| l.quantity),
            size: single.as_ref().and_then(|l| l.size.clone()),
            color: single.and_then(|l| l.color),
            items,
        }
    }
}
