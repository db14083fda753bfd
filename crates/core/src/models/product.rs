//! Canonical product record.

use serde::{Deserialize, Serialize};

use crate::types::{ProductId, Rupees, Variant, VariantSet};

/// Stock assumed for a legacy product that carries neither variants nor a
/// stock figure.
pub const LEGACY_DEFAULT_STOCK: u32 = 100;

/// A product in its single canonical shape.
///
/// Legacy records with a flat `imageUrl` and no variants end up here with a
/// one-element `images` list and an empty `variants` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Rupees,
    pub mrp: Option<Rupees>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub description: Option<String>,
    /// HTTPS image URLs, primary first.
    pub images: Vec<String>,
    pub variants: Vec<Variant>,
    /// Product-level stock, only meaningful when `variants` is empty.
    pub stock: Option<u32>,
}

impl Product {
    /// First image, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    #[must_use]
    pub fn variant_set(&self) -> VariantSet<'_> {
        VariantSet::new(&self.variants)
    }

    /// Stock to use when the product has no variant list.
    #[must_use]
    pub fn fallback_stock(&self) -> u32 {
        self.stock.unwrap_or(LEGACY_DEFAULT_STOCK)
    }

    /// Records without a name are treated as removed and never rendered.
    #[must_use]
    pub fn is_displayable(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Discount against MRP in whole percent.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        self.mrp.and_then(|mrp| self.price.discount_percent_from(mrp))
    }
}

/// Force hosted image URLs onto HTTPS.
#[must_use]
pub fn normalize_image_url(url: &str) -> String {
    let url = url.trim();
    url.strip_prefix("http://")
        .map_or_else(|| url.to_owned(), |rest| format!("https://{rest}"))
}
