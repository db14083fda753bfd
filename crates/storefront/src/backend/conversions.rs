//! Normalization from wire records to canonical models.

use apparel_core::{
    AddressId, CartItemId, Order, OrderAddress, OrderId, OrderItem, PaymentMethod, Product,
    ProductId, Rupees, ShopEntry, ShopList, ShopProduct, Variant, normalize_image_url,
};

use super::types::{
    WireAddressRef, WireCustomer, WireImage, WireOrder, WireOrderItem, WireProduct,
    WireProductRef, WireShopItem, WireVariant,
};

fn clamp_stock(stock: Option<i64>) -> u32 {
    stock.map_or(0, |s| u32::try_from(s.max(0)).unwrap_or(u32::MAX))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

impl WireImage {
    fn into_url(self) -> Option<String> {
        let raw = match self {
            Self::Url(url) => Some(url),
            Self::Hosted { url, secure_url } => secure_url.or(url),
        };
        non_blank(raw).map(|u| normalize_image_url(&u))
    }
}

impl From<WireVariant> for Variant {
    fn from(wire: WireVariant) -> Self {
        Self {
            color: wire.color.unwrap_or_default().trim().to_owned(),
            size: wire.size.unwrap_or_default().trim().to_owned(),
            stock: clamp_stock(wire.stock),
        }
    }
}

impl From<WireProduct> for Product {
    fn from(wire: WireProduct) -> Self {
        let mut images: Vec<String> = wire
            .images
            .into_iter()
            .filter_map(WireImage::into_url)
            .collect();
        if images.is_empty()
            && let Some(url) = non_blank(wire.image_url)
        {
            images.push(normalize_image_url(&url));
        }

        Self {
            id: ProductId::new(wire.id),
            name: wire.name.unwrap_or_default(),
            price: wire.price.unwrap_or(Rupees::ZERO),
            mrp: wire.mrp,
            category: non_blank(wire.category),
            sub_category: non_blank(wire.sub_category),
            description: non_blank(wire.description).or_else(|| non_blank(wire.descraption)),
            images,
            variants: wire.variants.into_iter().map(Variant::from).collect(),
            stock: wire.stock.map(|s| clamp_stock(Some(s))),
        }
    }
}

impl From<WireProductRef> for ShopProduct {
    fn from(wire: WireProductRef) -> Self {
        match wire {
            WireProductRef::Id(id) => Self::Placeholder(ProductId::new(id)),
            WireProductRef::Populated(product) => Self::Detailed(Box::new((*product).into())),
        }
    }
}

impl WireShopItem {
    /// Canonical entry, `None` when the product reference is gone.
    #[must_use]
    pub fn into_entry(self) -> Option<ShopEntry> {
        let product = ShopProduct::from(self.product_id?);
        Some(ShopEntry {
            id: self.id.map(CartItemId::new),
            product,
            size: non_blank(self.size),
            color: non_blank(self.color),
            quantity: self.quantity.unwrap_or(1).max(1),
        })
    }
}

/// Build a list snapshot, dropping entries whose product no longer exists.
pub(crate) fn shop_list(items: Vec<WireShopItem>) -> ShopList {
    items.into_iter().filter_map(WireShopItem::into_entry).collect()
}

impl WireOrderItem {
    fn into_item(self) -> Option<OrderItem> {
        let (product_id, name, image, fallback_price) = match self.product_id? {
            WireProductRef::Id(id) => (ProductId::new(id), None, None, None),
            WireProductRef::Populated(wire) => {
                let product = Product::from(*wire);
                let image = product.primary_image().map(str::to_owned);
                let name = Some(product.name).filter(|n| !n.trim().is_empty());
                (product.id, name, image, Some(product.price))
            }
        };
        Some(OrderItem {
            product_id,
            name,
            image,
            size: non_blank(self.size),
            color: non_blank(self.color),
            quantity: self.quantity.unwrap_or(1),
            price: self.price.or(fallback_price).unwrap_or(Rupees::ZERO),
        })
    }
}

impl From<WireOrder> for Order {
    fn from(wire: WireOrder) -> Self {
        let items: Vec<OrderItem> = wire
            .items
            .into_iter()
            .filter_map(WireOrderItem::into_item)
            .collect();
        let total_amount = wire
            .total_amount
            .unwrap_or_else(|| items.iter().map(OrderItem::line_total).sum());
        let address = wire.address_id.map(|a| match a {
            WireAddressRef::Id(id) => OrderAddress::Id(AddressId::new(id)),
            WireAddressRef::Populated(address) => OrderAddress::Full(address),
        });
        let customer = wire.user.and_then(|c| match c {
            WireCustomer::Id(_) => None,
            WireCustomer::Populated { username, email } => non_blank(username).or(email),
        });

        Self {
            id: OrderId::new(wire.id),
            items,
            address,
            payment_method: PaymentMethod::CashOnDelivery,
            status: wire.order_status,
            total_amount,
            created_at: wire.created_at,
            customer,
        }
    }
}
