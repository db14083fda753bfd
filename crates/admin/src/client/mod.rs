//! Admin console API client.
//!
//! Runs over the storefront's [`BackendClient`], so admin calls share the
//! session cookie jar and the refresh-once protocol. Every call requires a
//! staff session; the backend enforces that too.

mod types;

pub use types::{DashboardStats, ImageUpload, NewPincode, NewProduct, Page, PageQuery, StockUpdate};

use apparel_core::{Order, OrderId, OrderStatus, Product, ProductId, ServiceAreas};
use apparel_storefront::backend::endpoints;
use apparel_storefront::backend::types::{Ack, OrdersResponse, ProductsResponse};
use apparel_storefront::backend::{ApiRequest, BackendClient};
use serde_json::json;
use tracing::instrument;

use crate::error::AdminError;
use types::StatsResponse;

/// Client for the admin dashboard endpoints.
#[derive(Clone)]
pub struct AdminClient {
    backend: BackendClient,
}

impl AdminClient {
    #[must_use]
    pub const fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    #[must_use]
    pub const fn backend(&self) -> &BackendClient {
        &self.backend
    }

    /// Fail fast unless a staff user is signed in.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotStaff` for signed-out or customer sessions.
    pub async fn require_staff(&self) -> Result<(), AdminError> {
        match self.backend.session().current_user().await {
            Some(user) if user.is_staff() => Ok(()),
            _ => Err(AdminError::NotStaff),
        }
    }

    // =========================================================================
    // Dashboard
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<DashboardStats, AdminError> {
        self.require_staff().await?;
        let response: StatsResponse = self.backend.call(ApiRequest::get(endpoints::ADMIN_STATS)).await?;
        Ok(response.stats)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(page = query.page))]
    pub async fn orders(&self, query: &PageQuery) -> Result<Page<Order>, AdminError> {
        self.require_staff().await?;
        let response: OrdersResponse = self
            .backend
            .call(paged(endpoints::ADMIN_ORDERS, query))
            .await?;
        let items: Vec<Order> = response.orders.into_iter().map(Order::from).collect();
        Ok(page_of(items, query, response.total_pages, response.has_next_page))
    }

    /// Move an order to `next`.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Transition` without calling the backend when the
    /// edge is not allowed from the order's current status.
    #[instrument(skip(self, order), fields(order_id = %order.id, from = %order.status, to = %next))]
    pub async fn update_order_status(&self, order: &Order, next: OrderStatus) -> Result<(), AdminError> {
        order.status.admin_transition(next)?;
        self.set_order_status(&order.id, next).await
    }

    async fn set_order_status(&self, id: &OrderId, next: OrderStatus) -> Result<(), AdminError> {
        self.require_staff().await?;
        let request = ApiRequest::post(endpoints::UPDATE_ORDER_STATUS)
            .json(json!({ "orderId": id.as_str(), "status": next.as_str() }));
        self.backend.call::<Ack>(request).await?;
        Ok(())
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(page = query.page))]
    pub async fn products(&self, query: &PageQuery) -> Result<Page<Product>, AdminError> {
        self.require_staff().await?;
        let response: ProductsResponse = self
            .backend
            .call(paged(endpoints::ADMIN_PRODUCTS, query))
            .await?;
        let items: Vec<Product> = response.products.into_iter().map(Product::from).collect();
        Ok(page_of(items, query, response.total_pages, response.has_next_page))
    }

    /// Upload a new product.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Invalid` before any upload if the form is
    /// incomplete, or the backend error.
    #[instrument(skip(self, product), fields(name = %product.name, images = product.images.len()))]
    pub async fn add_product(&self, product: &NewProduct) -> Result<(), AdminError> {
        product.validate()?;
        self.require_staff().await?;
        let request = ApiRequest::post(endpoints::ADD_PRODUCT).multipart(product.to_form()?);
        self.backend.call::<Ack>(request).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, update), fields(product_id = %update.product_id, stock = update.stock))]
    pub async fn update_stock(&self, update: &StockUpdate) -> Result<(), AdminError> {
        self.require_staff().await?;
        let request = ApiRequest::post(endpoints::UPDATE_STOCK).json(update.to_json());
        self.backend.call::<Ack>(request).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), AdminError> {
        self.require_staff().await?;
        let request = ApiRequest::delete(endpoints::delete_product(id.as_str()));
        self.backend.call::<Ack>(request).await?;
        Ok(())
    }

    // =========================================================================
    // Pincodes
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn pincodes(&self) -> Result<ServiceAreas, AdminError> {
        self.require_staff().await?;
        Ok(self.backend.service_areas().await?)
    }

    /// # Errors
    ///
    /// Returns `AdminError::Invalid` for a malformed form, or the backend
    /// error.
    #[instrument(skip(self, pincode), fields(pincode = %pincode.pincode))]
    pub async fn add_pincode(&self, pincode: &NewPincode) -> Result<(), AdminError> {
        pincode.validate()?;
        self.require_staff().await?;
        let request = ApiRequest::post(endpoints::ADD_PINCODE).json(pincode.to_json());
        self.backend.call::<Ack>(request).await?;
        Ok(())
    }

    /// Switch deliveries to a pincode on or off.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn set_pincode_delivery(&self, pincode: &str, deliverable: bool) -> Result<(), AdminError> {
        self.require_staff().await?;
        let request = ApiRequest::post(endpoints::TOGGLE_PINCODE).json(json!({
            "pincode": pincode.trim(),
            "DeliveryAvlabelStatus": deliverable,
        }));
        self.backend.call::<Ack>(request).await?;
        Ok(())
    }
}

fn paged(path: &str, query: &PageQuery) -> ApiRequest {
    let request = ApiRequest::get(path)
        .query("page", query.page)
        .query("limit", query.limit);
    match &query.search {
        Some(term) => request.query("search", term),
        None => request,
    }
}

fn page_of<T>(
    items: Vec<T>,
    query: &PageQuery,
    total_pages: Option<u32>,
    has_next_page: Option<bool>,
) -> Page<T> {
    let total_pages = total_pages.unwrap_or(query.page);
    Page {
        items,
        page: query.page,
        total_pages,
        has_next_page: has_next_page.unwrap_or(query.page < total_pages),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use apparel_core::Role;
    use apparel_storefront::services::auth::AuthStore;
    use apparel_storefront::testing::FakeBackend;

    async fn admin() -> (FakeBackend, AdminClient) {
        let fake = FakeBackend::new();
        let auth = AuthStore::new(fake.client());
        fake.sign_in_as(&auth, Role::Admin).await;
        (fake, AdminClient::new(auth.client().clone()))
    }

    fn seed_products(fake: &FakeBackend, n: usize) {
        for i in 0..n {
            fake.add_product_json(json!({
                "_id": format!("p{i}"),
                "name": format!("Tee {i}"),
                "price": 499,
                "variants": [{"color": "Black", "size": "M", "stock": 3}]
            }));
        }
    }

    #[tokio::test]
    async fn test_customer_session_is_refused_locally() {
        let fake = FakeBackend::new();
        let auth = AuthStore::new(fake.client());
        fake.sign_in(&auth).await;
        let client = AdminClient::new(auth.client().clone());

        assert!(matches!(client.stats().await, Err(AdminError::NotStaff)));
        assert_eq!(fake.count(endpoints::ADMIN_STATS), 0);
    }

    #[tokio::test]
    async fn test_products_are_paged_and_searchable() {
        let (fake, client) = admin().await;
        seed_products(&fake, 12);

        let first = client.products(&PageQuery::default()).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total_pages, 2);
        assert!(first.has_next_page);

        let second = client.products(&PageQuery::page(2)).await.unwrap();
        assert_eq!(second.items.len(), 2);
        assert!(second.has_previous_page());

        let found = client
            .products(&PageQuery::default().with_search("tee 11"))
            .await
            .unwrap();
        assert_eq!(found.items.len(), 1);
        let request = fake.requests_to(endpoints::ADMIN_PRODUCTS).pop().unwrap();
        assert_eq!(request.query_value("search"), Some("tee 11"));
    }

    #[tokio::test]
    async fn test_status_update_checks_transition_first() {
        let (fake, client) = admin().await;
        fake.add_order_json(json!({"_id": "o1", "orderStatus": "shipped", "items": []}));
        let order = client.orders(&PageQuery::default()).await.unwrap().items.remove(0);

        let err = client
            .update_order_status(&order, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Transition(_)));
        assert_eq!(fake.count(endpoints::UPDATE_ORDER_STATUS), 0);

        client
            .update_order_status(&order, OrderStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(fake.order_status("o1"), Some(OrderStatus::Delivered));
    }

    #[tokio::test]
    async fn test_stock_update_and_delete() {
        let (fake, client) = admin().await;
        seed_products(&fake, 1);

        client
            .update_stock(&StockUpdate {
                product_id: ProductId::new("p0"),
                color: Some("Black".into()),
                size: Some("M".into()),
                stock: 0,
            })
            .await
            .unwrap();
        assert_eq!(fake.product_json("p0").unwrap()["variants"][0]["stock"], 0);

        client.delete_product(&ProductId::new("p0")).await.unwrap();
        assert!(fake.product_json("p0").is_none());
        assert_eq!(fake.count(&endpoints::delete_product("p0")), 1);
    }

    #[tokio::test]
    async fn test_pincodes_add_and_toggle() {
        let (fake, client) = admin().await;
        client
            .add_pincode(&NewPincode {
                pincode: "301001".into(),
                city: "Alwar".into(),
                state: "Rajasthan".into(),
                deliverable: true,
            })
            .await
            .unwrap();
        assert!(client.pincodes().await.unwrap().is_serviceable("301001"));

        client.set_pincode_delivery("301001", false).await.unwrap();
        let areas = client.pincodes().await.unwrap();
        assert!(!areas.is_serviceable("301001"));
        assert_eq!(areas.active_count(), 0);
    }
}
