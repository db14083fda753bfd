//! Checkout: line reconciliation, address selection and order placement.

use apparel_core::{
    Address, AddressId, CartItemId, NewAddress, OrderId, Product, ProductId, Rupees, ServiceAreas,
    Variant, VariantSet, clamp_quantity, shipping_for,
};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::backend::types::{OrderLineRequest, OrderRequest};
use crate::backend::{BackendClient, BackendError};
use crate::services::auth::AuthStore;
use crate::services::shop::{ListKind, ShopStore};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("sign-in required")]
    AuthRequired,

    #[error("no delivery address selected")]
    NoAddress,

    #[error("unknown address: {0}")]
    UnknownAddress(AddressId),

    #[error("delivery unavailable for pincode {0}")]
    Unserviceable(String),

    #[error("{0} is out of stock in the selected variant")]
    OutOfStock(String),

    #[error("nothing to order")]
    EmptyOrder,

    #[error("missing address fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("quantity cannot go below 1")]
    QuantityBelowMinimum,

    #[error("only {available} left in this size/color")]
    QuantityExceedsStock { available: u32 },

    #[error("no checkout line at index {0}")]
    LineNotFound(usize),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl CheckoutError {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthRequired => "Please log in to continue".to_string(),
            Self::NoAddress | Self::UnknownAddress(_) => {
                "Please select a delivery address".to_string()
            }
            Self::Unserviceable(pincode) => {
                format!("Delivery unavailable for Pincode: {pincode}.")
            }
            Self::OutOfStock(name) => format!("{name} is out of stock in the selected variant."),
            Self::EmptyOrder => "Cart is empty".to_string(),
            Self::MissingFields(fields) => format!("Please fill in: {}", fields.join(", ")),
            Self::QuantityBelowMinimum => "Quantity must be at least 1".to_string(),
            Self::QuantityExceedsStock { available } => {
                format!("Only {available} items left in this size/color")
            }
            Self::LineNotFound(_) => "Item not found".to_string(),
            Self::Backend(e) => e
                .server_message()
                .map_or_else(|| e.user_message(), str::to_owned),
        }
    }
}

/// Where checkout lines come from.
#[derive(Debug, Clone)]
pub enum CheckoutSource {
    /// "Buy now" on a product page.
    BuyNow {
        product: Box<Product>,
        color: Option<String>,
        size: Option<String>,
        quantity: u32,
    },
    /// Everything in the cart.
    Cart,
}

// =============================================================================
// CheckoutLine
// =============================================================================

/// One line being checked out, with its variant selection reconciled
/// against the product's variant list.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub name: String,
    pub price: Rupees,
    pub image: Option<String>,
    pub cart_item_id: Option<CartItemId>,
    variants: Vec<Variant>,
    fallback_stock: u32,
    color: Option<String>,
    size: Option<String>,
    quantity: u32,
    stock: u32,
}

impl CheckoutLine {
    /// Build a line, defaulting stale selections and clamping quantity.
    #[must_use]
    pub fn new(
        product: &Product,
        color: Option<&str>,
        size: Option<&str>,
        quantity: u32,
        cart_item_id: Option<CartItemId>,
    ) -> Self {
        let mut line = Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.primary_image().map(str::to_owned),
            cart_item_id,
            variants: product.variants.clone(),
            fallback_stock: product.fallback_stock(),
            color: color.map(str::to_owned),
            size: size.map(str::to_owned),
            quantity,
            stock: 0,
        };
        line.resolve();
        line
    }

    fn variant_set(&self) -> VariantSet<'_> {
        VariantSet::new(&self.variants)
    }

    /// Re-derive selection and stock, then re-clamp the quantity. Returns
    /// the new quantity if it had to change.
    fn resolve(&mut self) -> Option<u32> {
        if self.variants.is_empty() {
            self.stock = self.fallback_stock;
        } else {
            let selection = self
                .variant_set()
                .resolve(self.color.as_deref(), self.size.as_deref());
            self.color = selection.color;
            self.size = selection.size;
            self.stock = selection.stock;
        }

        let clamped = clamp_quantity(self.quantity, self.stock);
        let changed = clamped != self.quantity;
        self.quantity = clamped;
        changed.then_some(clamped)
    }

    #[must_use]
    pub fn colors(&self) -> Vec<&str> {
        self.variant_set().colors()
    }

    /// Sizes offered in the selected color.
    #[must_use]
    pub fn sizes(&self) -> Vec<&str> {
        self.color
            .as_deref()
            .map(|c| self.variant_set().sizes_for(c))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    #[must_use]
    pub fn size(&self) -> Option<&str> {
        self.size.as_deref()
    }

    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Stock of the selected combination.
    #[must_use]
    pub const fn stock(&self) -> u32 {
        self.stock
    }

    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        self.stock > 0
    }

    #[must_use]
    pub fn line_total(&self) -> Rupees {
        self.price * self.quantity
    }

    /// Pick a color. The size resets to the first size offered in it.
    ///
    /// Returns a note when the quantity had to be reduced.
    pub fn select_color(&mut self, color: &str) -> Option<String> {
        self.color = Some(color.to_owned());
        self.size = None;
        self.resolve().map(quantity_note)
    }

    /// Pick a size within the selected color.
    ///
    /// Returns a note when the quantity had to be reduced.
    pub fn select_size(&mut self, size: &str) -> Option<String> {
        self.size = Some(size.to_owned());
        self.resolve().map(quantity_note)
    }

    /// Step the quantity by `delta`.
    ///
    /// # Errors
    ///
    /// Rejects steps below 1 or above the selection's stock, leaving the
    /// quantity unchanged.
    pub fn step_quantity(&mut self, delta: i32) -> Result<u32, CheckoutError> {
        let next = i64::from(self.quantity) + i64::from(delta);
        if next < 1 {
            return Err(CheckoutError::QuantityBelowMinimum);
        }
        if next > i64::from(self.stock) {
            return Err(CheckoutError::QuantityExceedsStock {
                available: self.stock,
            });
        }
        self.quantity = u32::try_from(next).map_err(|_| CheckoutError::QuantityExceedsStock {
            available: self.stock,
        })?;
        Ok(self.quantity)
    }

    fn to_request(&self) -> OrderLineRequest {
        OrderLineRequest {
            product_id: self.product_id.as_str().to_owned(),
            quantity: self.quantity,
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }
}

fn quantity_note(quantity: u32) -> String {
    format!("Quantity adjusted to {quantity} based on available stock")
}

// =============================================================================
// Checkout
// =============================================================================

/// Order totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceSummary {
    pub units: u32,
    pub subtotal: Rupees,
    pub shipping: Rupees,
    pub total: Rupees,
}

/// An in-progress checkout.
#[derive(Debug, Clone)]
pub struct Checkout {
    from_cart: bool,
    lines: Vec<CheckoutLine>,
    addresses: Vec<Address>,
    selected_address: Option<AddressId>,
    areas: ServiceAreas,
}

impl Checkout {
    /// Assemble a checkout from already-loaded parts. The default address,
    /// else the first one, is pre-selected.
    #[must_use]
    pub fn new(lines: Vec<CheckoutLine>, addresses: Vec<Address>, areas: ServiceAreas) -> Self {
        let selected_address = Address::preferred(&addresses).map(|a| a.id.clone());
        Self {
            from_cart: false,
            lines,
            addresses,
            selected_address,
            areas,
        }
    }

    #[must_use]
    pub fn lines(&self) -> &[CheckoutLine] {
        &self.lines
    }

    /// Mutable access to one line.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::LineNotFound` for an out-of-range index.
    pub fn line_mut(&mut self, index: usize) -> Result<&mut CheckoutLine, CheckoutError> {
        self.lines
            .get_mut(index)
            .ok_or(CheckoutError::LineNotFound(index))
    }

    /// Remove a line. Returns whether the checkout is now empty.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::LineNotFound` for an out-of-range index.
    pub fn remove_line(&mut self, index: usize) -> Result<bool, CheckoutError> {
        if index >= self.lines.len() {
            return Err(CheckoutError::LineNotFound(index));
        }
        self.lines.remove(index);
        Ok(self.lines.is_empty())
    }

    #[must_use]
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    #[must_use]
    pub fn selected_address(&self) -> Option<&Address> {
        let id = self.selected_address.as_ref()?;
        self.addresses.iter().find(|a| &a.id == id)
    }

    /// Choose a delivery address.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::UnknownAddress` if `id` is not one of the
    /// loaded addresses.
    pub fn select_address(&mut self, id: &AddressId) -> Result<(), CheckoutError> {
        if !self.addresses.iter().any(|a| &a.id == id) {
            return Err(CheckoutError::UnknownAddress(id.clone()));
        }
        self.selected_address = Some(id.clone());
        Ok(())
    }

    #[must_use]
    pub const fn service_areas(&self) -> &ServiceAreas {
        &self.areas
    }

    #[must_use]
    pub fn is_serviceable(&self, pincode: &str) -> bool {
        self.areas.is_serviceable(pincode)
    }

    #[must_use]
    pub fn summary(&self) -> PriceSummary {
        let subtotal: Rupees = self.lines.iter().map(CheckoutLine::line_total).sum();
        let shipping = if self.lines.is_empty() {
            Rupees::ZERO
        } else {
            shipping_for(subtotal)
        };
        PriceSummary {
            units: self.lines.iter().map(CheckoutLine::quantity).sum(),
            subtotal,
            shipping,
            total: subtotal + shipping,
        }
    }

    /// Check everything placement needs, without touching the network.
    ///
    /// # Errors
    ///
    /// Returns the first failed gate: no address, unserviceable pincode,
    /// a sold-out line, or no lines at all.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        let address = self.selected_address().ok_or(CheckoutError::NoAddress)?;
        if !self.areas.is_serviceable(&address.pincode) {
            return Err(CheckoutError::Unserviceable(address.pincode.trim().to_owned()));
        }
        if let Some(line) = self.lines.iter().find(|l| !l.is_purchasable()) {
            return Err(CheckoutError::OutOfStock(line.name.clone()));
        }
        if self.lines.is_empty() {
            return Err(CheckoutError::EmptyOrder);
        }
        Ok(())
    }

    /// The placement payload, after validation.
    ///
    /// # Errors
    ///
    /// Same as [`Checkout::validate`].
    pub fn order_request(&self) -> Result<OrderRequest, CheckoutError> {
        self.validate()?;
        let address = self.selected_address().ok_or(CheckoutError::NoAddress)?;
        Ok(OrderRequest::cash_on_delivery(
            address.id.as_str().to_owned(),
            self.lines.iter().map(CheckoutLine::to_request).collect(),
        ))
    }
}

// =============================================================================
// CheckoutService
// =============================================================================

/// Loads checkouts and submits them.
#[derive(Clone)]
pub struct CheckoutService {
    client: BackendClient,
    auth: AuthStore,
    shop: ShopStore,
}

impl CheckoutService {
    #[must_use]
    pub fn new(auth: AuthStore, shop: ShopStore) -> Self {
        Self {
            client: auth.client().clone(),
            auth,
            shop,
        }
    }

    /// Start a checkout from a buy-now selection or the cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::AuthRequired` when signed out, or a backend
    /// error loading addresses or the cart. An unreachable pincode list is
    /// tolerated: every pincode then counts as unserviceable.
    #[instrument(skip_all)]
    pub async fn begin(&self, source: CheckoutSource) -> Result<Checkout, CheckoutError> {
        if self.auth.require_user().await.is_err() {
            return Err(CheckoutError::AuthRequired);
        }

        let areas = match self.client.service_areas().await {
            Ok(areas) => areas,
            Err(BackendError::SessionExpired) => return Err(BackendError::SessionExpired.into()),
            Err(e) => {
                warn!(error = %e, "failed to load delivery pincodes");
                ServiceAreas::default()
            }
        };
        let addresses = self.client.addresses().await?;

        let (lines, from_cart) = match source {
            CheckoutSource::BuyNow {
                product,
                color,
                size,
                quantity,
            } => (
                vec![CheckoutLine::new(
                    &product,
                    color.as_deref(),
                    size.as_deref(),
                    quantity,
                    None,
                )],
                false,
            ),
            CheckoutSource::Cart => {
                self.shop
                    .refresh(ListKind::Cart)
                    .await
                    .map_err(shop_to_checkout)?;
                let cart = self.shop.cart().await;
                let lines = cart
                    .visible()
                    .map(|(entry, product)| {
                        CheckoutLine::new(
                            product,
                            entry.color.as_deref(),
                            entry.size.as_deref(),
                            entry.quantity,
                            entry.id.clone(),
                        )
                    })
                    .collect();
                (lines, true)
            }
        };

        let mut checkout = Checkout::new(lines, addresses, areas);
        checkout.from_cart = from_cart;
        Ok(checkout)
    }

    /// Save a new address and reload the address list.
    ///
    /// The new address is selected if nothing was selected before.
    ///
    /// # Errors
    ///
    /// Rejects blank required fields and unserviceable pincodes before any
    /// network call; otherwise returns the backend error.
    #[instrument(skip_all, fields(pincode = %address.pincode))]
    pub async fn add_address(
        &self,
        checkout: &mut Checkout,
        address: &NewAddress,
    ) -> Result<(), CheckoutError> {
        let missing = address.missing_fields();
        if !missing.is_empty() {
            return Err(CheckoutError::MissingFields(missing));
        }
        if !checkout.is_serviceable(&address.pincode) {
            return Err(CheckoutError::Unserviceable(address.pincode.trim().to_owned()));
        }

        self.client.add_address(address).await?;
        let previous: Vec<AddressId> = checkout.addresses.iter().map(|a| a.id.clone()).collect();
        checkout.addresses = self.client.addresses().await?;

        if checkout.selected_address().is_none() {
            let added = checkout
                .addresses
                .iter()
                .find(|a| !previous.contains(&a.id))
                .or_else(|| Address::preferred(&checkout.addresses));
            checkout.selected_address = added.map(|a| a.id.clone());
        }
        Ok(())
    }

    /// Validate and place the order.
    ///
    /// # Errors
    ///
    /// Returns a validation error without any network call, or the
    /// backend's rejection.
    #[instrument(skip_all, fields(lines = checkout.lines.len()))]
    pub async fn place_order(&self, checkout: &Checkout) -> Result<Option<OrderId>, CheckoutError> {
        let request = checkout.order_request()?;
        let order_id = self.client.place_order(&request).await?;
        info!(order_id = ?order_id, "order placed");

        if checkout.from_cart
            && let Err(e) = self.shop.refresh(ListKind::Cart).await
        {
            warn!(error = %e, "failed to refresh cart after order");
        }
        Ok(order_id)
    }
}

fn shop_to_checkout(error: crate::services::shop::ShopError) -> CheckoutError {
    match error {
        crate::services::shop::ShopError::AuthRequired => CheckoutError::AuthRequired,
        crate::services::shop::ShopError::Backend(e) => CheckoutError::Backend(e),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use apparel_core::AddressKind;

    fn tee() -> Product {
        Product {
            id: ProductId::new("p1"),
            name: "Tee".into(),
            price: Rupees::from(499),
            mrp: None,
            category: None,
            sub_category: None,
            description: None,
            images: vec![],
            variants: vec![
                Variant::new("Red", "S", 2),
                Variant::new("Red", "M", 0),
                Variant::new("Blue", "S", 5),
            ],
            stock: None,
        }
    }

    fn legacy() -> Product {
        Product {
            variants: vec![],
            id: ProductId::new("p9"),
            name: "Old Tee".into(),
            ..tee()
        }
    }

    fn address(id: &str, pincode: &str, is_default: bool) -> Address {
        Address {
            id: AddressId::new(id),
            full_name: "Rajat".into(),
            phone: "9999999999".into(),
            alt_phone: None,
            pincode: pincode.into(),
            state: "Rajasthan".into(),
            city: "Alwar".into(),
            house_no: "12".into(),
            area: "Main Road".into(),
            landmark: None,
            kind: AddressKind::Home,
            is_default,
        }
    }

    fn areas() -> ServiceAreas {
        ServiceAreas::new(vec![
            apparel_core::ServiceArea {
                id: None,
                pincode: "301001".into(),
                city: "Alwar".into(),
                state: "Rajasthan".into(),
                deliverable: true,
            },
            apparel_core::ServiceArea {
                id: None,
                pincode: "400001".into(),
                city: "Mumbai".into(),
                state: "Maharashtra".into(),
                deliverable: false,
            },
        ])
    }

    #[test]
    fn test_requested_quantity_clamped_to_stock() {
        let product = Product {
            variants: vec![Variant::new("Black", "L", 3)],
            ..tee()
        };
        let line = CheckoutLine::new(&product, Some("Black"), Some("L"), 5, None);
        assert_eq!(line.quantity(), 3);
        assert!(line.is_purchasable());
    }

    #[test]
    fn test_zero_stock_line_blocks_placement() {
        let line = CheckoutLine::new(&tee(), Some("Red"), Some("M"), 1, None);
        assert_eq!(line.stock(), 0);
        assert_eq!(line.quantity(), 0);

        let checkout = Checkout::new(vec![line], vec![address("a1", "301001", true)], areas());
        let err = checkout.validate().unwrap_err();
        assert!(matches!(err, CheckoutError::OutOfStock(ref n) if n == "Tee"));
    }

    #[test]
    fn test_color_switch_resets_size_and_stock() {
        let mut line = CheckoutLine::new(&tee(), Some("Red"), Some("S"), 2, None);
        assert_eq!(line.sizes(), ["S", "M"]);

        assert_eq!(line.select_color("Blue"), None);
        assert_eq!(line.sizes(), ["S"]);
        assert_eq!(line.size(), Some("S"));
        assert_eq!(line.stock(), 5);
        assert_eq!(line.quantity(), 2);
    }

    #[test]
    fn test_size_switch_to_sold_out_reports_adjustment() {
        let mut line = CheckoutLine::new(&tee(), Some("Red"), Some("S"), 2, None);
        let note = line.select_size("M").unwrap();
        assert_eq!(note, "Quantity adjusted to 0 based on available stock");
        assert!(!line.is_purchasable());
    }

    #[test]
    fn test_quantity_steps_are_bounded() {
        let mut line = CheckoutLine::new(&tee(), Some("Red"), Some("S"), 1, None);
        assert!(matches!(
            line.step_quantity(-1),
            Err(CheckoutError::QuantityBelowMinimum)
        ));
        assert_eq!(line.step_quantity(1).unwrap(), 2);
        let err = line.step_quantity(1).unwrap_err();
        assert_eq!(err.user_message(), "Only 2 items left in this size/color");
        assert_eq!(line.quantity(), 2);
    }

    #[test]
    fn test_legacy_product_uses_fallback_stock() {
        let line = CheckoutLine::new(&legacy(), None, None, 150, None);
        assert_eq!(line.stock(), 100);
        assert_eq!(line.quantity(), 100);
        assert!(line.colors().is_empty());
    }

    #[test]
    fn test_default_address_preselected_else_first() {
        let checkout = Checkout::new(
            vec![],
            vec![address("a1", "301001", false), address("a2", "301001", true)],
            areas(),
        );
        assert_eq!(checkout.selected_address().map(|a| a.id.as_str()), Some("a2"));

        let checkout = Checkout::new(vec![], vec![address("a1", "301001", false)], areas());
        assert_eq!(checkout.selected_address().map(|a| a.id.as_str()), Some("a1"));
    }

    #[test]
    fn test_validation_gates_in_order() {
        let line = CheckoutLine::new(&tee(), Some("Blue"), Some("S"), 1, None);

        let checkout = Checkout::new(vec![line.clone()], vec![], areas());
        assert!(matches!(checkout.validate(), Err(CheckoutError::NoAddress)));

        let checkout = Checkout::new(
            vec![line.clone()],
            vec![address("a1", "400001", true)],
            areas(),
        );
        assert!(matches!(
            checkout.validate(),
            Err(CheckoutError::Unserviceable(ref p)) if p == "400001"
        ));

        let checkout = Checkout::new(vec![], vec![address("a1", "301001", true)], areas());
        assert!(matches!(checkout.validate(), Err(CheckoutError::EmptyOrder)));

        let checkout = Checkout::new(vec![line], vec![address("a1", "301001", true)], areas());
        assert!(checkout.validate().is_ok());
    }

    #[test]
    fn test_summary_applies_shipping_rule() {
        let cheap = CheckoutLine::new(&tee(), Some("Blue"), Some("S"), 2, None);
        let checkout = Checkout::new(vec![cheap], vec![], areas());
        let summary = checkout.summary();
        assert_eq!(summary.subtotal, Rupees::from(998));
        assert_eq!(summary.shipping, Rupees::from(99));
        assert_eq!(summary.total, Rupees::from(1097));

        let bulk = CheckoutLine::new(&tee(), Some("Blue"), Some("S"), 5, None);
        let checkout = Checkout::new(vec![bulk], vec![], areas());
        assert_eq!(checkout.summary().shipping, Rupees::ZERO);
    }

    #[test]
    fn test_remove_last_line_reports_empty() {
        let line = CheckoutLine::new(&tee(), Some("Blue"), Some("S"), 1, None);
        let mut checkout = Checkout::new(vec![line], vec![], areas());
        assert!(checkout.remove_line(3).is_err());
        assert!(checkout.remove_line(0).unwrap());
    }
}
