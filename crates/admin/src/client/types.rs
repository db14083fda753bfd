//! Admin request and response records.

use apparel_core::{ProductId, Rupees, Variant};
use apparel_storefront::backend::{FilePart, MultipartForm};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::AdminError;

/// Headline figures for the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(default)]
    pub total_sales: Rupees,
    #[serde(default, alias = "newOrdersCount")]
    pub new_orders: u64,
    #[serde(default)]
    pub pending_deliveries: u64,
    #[serde(default)]
    pub active_pincodes: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatsResponse {
    #[serde(default, alias = "data")]
    pub stats: DashboardStats,
}

/// Pagination and search for admin tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: None,
        }
    }
}

impl PageQuery {
    #[must_use]
    pub fn page(page: u32) -> Self {
        Self {
            page: page.max(1),
            ..Self::default()
        }
    }

    /// Search term, blank terms clear the search. Resets to page 1.
    #[must_use]
    pub fn with_search(mut self, term: &str) -> Self {
        let term = term.trim();
        self.search = (!term.is_empty()).then(|| term.to_owned());
        self.page = 1;
        self
    }
}

/// One page of an admin table.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
    pub has_next_page: bool,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            total_pages: 0,
            has_next_page: false,
        }
    }
}

impl<T> Page<T> {
    #[must_use]
    pub const fn has_previous_page(&self) -> bool {
        self.page > 1
    }
}

/// An image file for a new product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Guess the MIME type from the file extension.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let mime = match extension.as_str() {
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            "jpg" | "jpeg" => "image/jpeg",
            _ => "application/octet-stream",
        };
        Self {
            file_name,
            mime: mime.to_string(),
            bytes,
        }
    }
}

/// Form data for creating a product.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub price: Rupees,
    pub mrp: Option<Rupees>,
    pub category: String,
    pub sub_category: Option<String>,
    pub description: Option<String>,
    pub variants: Vec<Variant>,
    pub images: Vec<ImageUpload>,
}

impl NewProduct {
    /// Check the form before upload.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Invalid` naming the first problem found.
    pub fn validate(&self) -> Result<(), AdminError> {
        if self.name.trim().is_empty() {
            return Err(AdminError::Invalid("Product name is required".into()));
        }
        if self.category.trim().is_empty() {
            return Err(AdminError::Invalid("Category is required".into()));
        }
        if self.price <= Rupees::ZERO {
            return Err(AdminError::Invalid("Price must be greater than zero".into()));
        }
        if self.mrp.is_some_and(|mrp| mrp < self.price) {
            return Err(AdminError::Invalid("MRP cannot be below the price".into()));
        }
        if self.images.is_empty() {
            return Err(AdminError::Invalid("Add at least one image".into()));
        }
        if self
            .variants
            .iter()
            .any(|v| v.color.trim().is_empty() || v.size.trim().is_empty())
        {
            return Err(AdminError::Invalid("Every variant needs a color and a size".into()));
        }
        Ok(())
    }

    /// Multipart body: metadata as text fields, variants as one JSON string,
    /// one `images` part per file.
    ///
    /// # Errors
    ///
    /// Returns an error if the variants cannot be encoded.
    pub fn to_form(&self) -> Result<MultipartForm, AdminError> {
        let mut form = MultipartForm::new()
            .text("name", self.name.trim())
            .text("price", self.price.amount().to_string())
            .text("category", self.category.trim())
            .text("variants", serde_json::to_string(&self.variants)?);
        if let Some(mrp) = self.mrp {
            form = form.text("mrp", mrp.amount().to_string());
        }
        if let Some(sub_category) = &self.sub_category {
            form = form.text("subCategory", sub_category.trim());
        }
        if let Some(description) = &self.description {
            form = form.text("description", description.trim());
        }
        for image in &self.images {
            form = form.file(FilePart {
                field: "images".to_string(),
                file_name: image.file_name.clone(),
                mime: image.mime.clone(),
                bytes: image.bytes.clone(),
            });
        }
        Ok(form)
    }
}

/// New stock figure for a product or one of its variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockUpdate {
    pub product_id: ProductId,
    /// Variant to update; both `None` sets the product-level stock.
    pub color: Option<String>,
    pub size: Option<String>,
    pub stock: u32,
}

impl StockUpdate {
    pub(crate) fn to_json(&self) -> Value {
        json!({
            "productId": self.product_id.as_str(),
            "color": self.color,
            "size": self.size,
            "stock": self.stock,
        })
    }
}

/// Form data for a new delivery area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPincode {
    pub pincode: String,
    pub city: String,
    pub state: String,
    pub deliverable: bool,
}

impl NewPincode {
    /// # Errors
    ///
    /// Returns `AdminError::Invalid` unless the pincode is six digits and
    /// city and state are filled in.
    pub fn validate(&self) -> Result<(), AdminError> {
        let pincode = self.pincode.trim();
        if pincode.len() != 6 || !pincode.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AdminError::Invalid("Pincode must be 6 digits".into()));
        }
        if self.city.trim().is_empty() || self.state.trim().is_empty() {
            return Err(AdminError::Invalid("City and state are required".into()));
        }
        Ok(())
    }

    pub(crate) fn to_json(&self) -> Value {
        json!({
            "pincode": self.pincode.trim(),
            "city": self.city.trim(),
            "state": self.state.trim(),
            "DeliveryAvlabelStatus": self.deliverable,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tee() -> NewProduct {
        NewProduct {
            name: "Oversized Tee".into(),
            price: Rupees::from(499),
            mrp: Some(Rupees::from(999)),
            category: "men".into(),
            sub_category: Some("t-shirts".into()),
            description: None,
            variants: vec![Variant::new("Black", "M", 10), Variant::new("Black", "L", 4)],
            images: vec![ImageUpload::new("front.JPG", vec![1, 2, 3])],
        }
    }

    #[test]
    fn test_form_carries_variants_as_json_string() {
        let form = tee().to_form().unwrap();
        assert_eq!(form.field("price"), Some("499"));
        assert_eq!(form.field("subCategory"), Some("t-shirts"));
        let variants: Vec<Variant> =
            serde_json::from_str(form.field("variants").unwrap()).unwrap();
        assert_eq!(variants.len(), 2);
        assert_eq!(form.files.len(), 1);
        assert_eq!(form.files[0].mime, "image/jpeg");
        assert!(form.field("description").is_none());
    }

    #[test]
    fn test_product_validation() {
        assert!(tee().validate().is_ok());

        let no_images = NewProduct {
            images: vec![],
            ..tee()
        };
        assert!(matches!(no_images.validate(), Err(AdminError::Invalid(_))));

        let mrp_below_price = NewProduct {
            mrp: Some(Rupees::from(100)),
            ..tee()
        };
        assert!(mrp_below_price.validate().is_err());

        let blank_variant = NewProduct {
            variants: vec![Variant::new("", "M", 1)],
            ..tee()
        };
        assert!(blank_variant.validate().is_err());
    }

    #[test]
    fn test_pincode_validation() {
        let pin = NewPincode {
            pincode: " 301001 ".into(),
            city: "Alwar".into(),
            state: "Rajasthan".into(),
            deliverable: true,
        };
        assert!(pin.validate().is_ok());
        assert_eq!(pin.to_json()["pincode"], "301001");

        let short = NewPincode {
            pincode: "3010".into(),
            ..pin
        };
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_page_query_search_resets_page() {
        let query = PageQuery::page(3).with_search("  tee ");
        assert_eq!(query.page, 1);
        assert_eq!(query.search.as_deref(), Some("tee"));
        assert_eq!(PageQuery::page(0).page, 1);
    }

    #[test]
    fn test_stats_tolerate_missing_fields() {
        let stats: StatsResponse =
            serde_json::from_value(json!({"success": true, "stats": {"newOrders": 3}})).unwrap();
        assert_eq!(stats.stats.new_orders, 3);
        assert_eq!(stats.stats.total_sales, Rupees::ZERO);
    }
}
