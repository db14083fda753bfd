//! Admin console state.
//!
//! Nothing here is optimistic: every mutation waits for the backend, then
//! the affected listing is fetched again. Each outcome produces a toast.

use std::sync::Arc;

use apparel_core::{Order, OrderStatus, Product, ServiceAreas};
use apparel_storefront::Storefront;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::client::{AdminClient, NewPincode, NewProduct, Page, PageQuery, StockUpdate};
use crate::error::AdminError;
use crate::services::actions::{ActionQueue, AdminAction, PendingAction};
use crate::services::dashboard::DashboardMonitor;
use crate::services::toast::Toasts;

/// A paginated listing and the query that produced it.
struct Listing<T> {
    query: PageQuery,
    page: Page<T>,
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self {
            query: PageQuery::default(),
            page: Page::default(),
        }
    }
}

/// Admin console shared across views. Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AdminConsole {
    inner: Arc<AdminConsoleInner>,
}

struct AdminConsoleInner {
    client: AdminClient,
    actions: ActionQueue,
    toasts: Toasts,
    dashboard: DashboardMonitor,
    orders: RwLock<Listing<Order>>,
    products: RwLock<Listing<Product>>,
    pincodes: RwLock<ServiceAreas>,
}

impl AdminConsole {
    #[must_use]
    pub fn new(client: AdminClient) -> Self {
        Self {
            inner: Arc::new(AdminConsoleInner {
                dashboard: DashboardMonitor::new(client.clone()),
                client,
                actions: ActionQueue::new(),
                toasts: Toasts::new(),
                orders: RwLock::new(Listing::default()),
                products: RwLock::new(Listing::default()),
                pincodes: RwLock::new(ServiceAreas::default()),
            }),
        }
    }

    /// Console sharing the storefront's session.
    #[must_use]
    pub fn for_storefront(storefront: &Storefront) -> Self {
        Self::new(AdminClient::new(storefront.client().clone()))
    }

    #[must_use]
    pub fn client(&self) -> &AdminClient {
        &self.inner.client
    }

    #[must_use]
    pub fn toasts(&self) -> &Toasts {
        &self.inner.toasts
    }

    #[must_use]
    pub fn dashboard(&self) -> &DashboardMonitor {
        &self.inner.dashboard
    }

    pub async fn pending_actions(&self) -> Vec<PendingAction> {
        self.inner.actions.pending().await
    }

    // =========================================================================
    // Listings
    // =========================================================================

    pub async fn orders(&self) -> Page<Order> {
        self.inner.orders.read().await.page.clone()
    }

    pub async fn products(&self) -> Page<Product> {
        self.inner.products.read().await.page.clone()
    }

    pub async fn pincodes(&self) -> ServiceAreas {
        self.inner.pincodes.read().await.clone()
    }

    /// # Errors
    ///
    /// Returns an error if the request fails; the previous page is kept.
    #[instrument(skip(self), fields(page = query.page))]
    pub async fn load_orders(&self, query: PageQuery) -> Result<Page<Order>, AdminError> {
        let page = self.inner.client.orders(&query).await?;
        *self.inner.orders.write().await = Listing {
            query,
            page: page.clone(),
        };
        Ok(page)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails; the previous page is kept.
    #[instrument(skip(self), fields(page = query.page))]
    pub async fn load_products(&self, query: PageQuery) -> Result<Page<Product>, AdminError> {
        let page = self.inner.client.products(&query).await?;
        *self.inner.products.write().await = Listing {
            query,
            page: page.clone(),
        };
        Ok(page)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn load_pincodes(&self) -> Result<ServiceAreas, AdminError> {
        let areas = self.inner.client.pincodes().await?;
        *self.inner.pincodes.write().await = areas.clone();
        Ok(areas)
    }

    // =========================================================================
    // Direct mutations
    // =========================================================================

    /// # Errors
    ///
    /// Returns the validation or backend error after showing it as a toast.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn add_product(&self, product: &NewProduct) -> Result<(), AdminError> {
        let result = self.inner.client.add_product(product).await;
        self.finish(result, |()| format!("Added {}", product.name.trim()))
            .await?;
        self.reload_products().await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the backend error after showing it as a toast.
    #[instrument(skip(self, update), fields(product_id = %update.product_id))]
    pub async fn update_stock(&self, update: &StockUpdate) -> Result<(), AdminError> {
        let result = self.inner.client.update_stock(update).await;
        self.finish(result, |()| "Stock updated".to_string()).await?;
        self.reload_products().await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the validation or backend error after showing it as a toast.
    #[instrument(skip(self, pincode), fields(pincode = %pincode.pincode))]
    pub async fn add_pincode(&self, pincode: &NewPincode) -> Result<(), AdminError> {
        let result = self.inner.client.add_pincode(pincode).await;
        self.finish(result, |()| format!("Pincode {} added", pincode.pincode.trim()))
            .await?;
        self.reload_pincodes().await;
        Ok(())
    }

    // =========================================================================
    // Confirmed mutations
    // =========================================================================

    /// Ask for confirmation before deleting a product.
    ///
    /// # Errors
    ///
    /// Infallible in practice; shares the queue's signature.
    pub async fn request_delete(&self, product: &Product) -> Result<PendingAction, AdminError> {
        self.request(AdminAction::DeleteProduct {
            id: product.id.clone(),
            name: product.name.clone(),
        })
        .await
    }

    /// Ask for confirmation before changing an order's status.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Transition` (also shown as a toast) when the
    /// change is not allowed from the order's current status.
    pub async fn request_status_change(
        &self,
        order: &Order,
        next: OrderStatus,
    ) -> Result<PendingAction, AdminError> {
        self.request(AdminAction::ChangeOrderStatus {
            order: Box::new(order.clone()),
            next,
        })
        .await
    }

    /// Ask for confirmation before switching delivery to a pincode.
    ///
    /// # Errors
    ///
    /// Infallible in practice; shares the queue's signature.
    pub async fn request_pincode_delivery(
        &self,
        pincode: &str,
        deliverable: bool,
    ) -> Result<PendingAction, AdminError> {
        self.request(AdminAction::SetPincodeDelivery {
            pincode: pincode.trim().to_string(),
            deliverable,
        })
        .await
    }

    async fn request(&self, action: AdminAction) -> Result<PendingAction, AdminError> {
        let result = self.inner.actions.enqueue(action).await;
        if let Err(e) = &result {
            self.inner.toasts.error(e.user_message()).await;
        }
        result
    }

    /// Run a queued action, then re-fetch whatever it touched.
    ///
    /// # Errors
    ///
    /// Returns the queue or backend error after showing it as a toast.
    #[instrument(skip(self))]
    pub async fn confirm(&self, id: u64) -> Result<(), AdminError> {
        let result = self.inner.actions.approve(id, &self.inner.client).await;
        let action = self.finish(result, |_| String::new()).await?;
        self.inner.toasts.success(action.success_message()).await;

        match action {
            AdminAction::DeleteProduct { .. } => self.reload_products().await,
            AdminAction::ChangeOrderStatus { .. } => self.reload_orders().await,
            AdminAction::SetPincodeDelivery { .. } => self.reload_pincodes().await,
        }
        self.reload_dashboard().await;
        Ok(())
    }

    /// Drop a queued action without running it.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NoPendingAction` for an unknown id.
    pub async fn dismiss(&self, id: u64) -> Result<(), AdminError> {
        self.inner.actions.reject(id).await?;
        self.inner.toasts.info("Action cancelled").await;
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Toast the outcome of a mutation. Errors are reported before being
    /// handed back. An empty success message shows no toast.
    async fn finish<T, F>(&self, result: Result<T, AdminError>, message: F) -> Result<T, AdminError>
    where
        F: FnOnce(&T) -> String,
    {
        match result {
            Ok(value) => {
                let text = message(&value);
                if !text.is_empty() {
                    info!(message = %text, "Admin mutation succeeded");
                    self.inner.toasts.success(text).await;
                }
                Ok(value)
            }
            Err(e) => {
                e.report();
                self.inner.toasts.error(e.user_message()).await;
                Err(e)
            }
        }
    }

    async fn reload_orders(&self) {
        let query = self.inner.orders.read().await.query.clone();
        if let Err(e) = self.load_orders(query).await {
            e.report();
        }
    }

    async fn reload_products(&self) {
        let query = self.inner.products.read().await.query.clone();
        if let Err(e) = self.load_products(query).await {
            e.report();
        }
    }

    async fn reload_pincodes(&self) {
        if let Err(e) = self.load_pincodes().await {
            e.report();
        }
    }

    async fn reload_dashboard(&self) {
        if let Err(e) = self.inner.dashboard.refresh().await {
            e.report();
        }
    }
}
