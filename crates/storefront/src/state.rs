//! Storefront state shared across views.

use std::sync::Arc;

use apparel_core::User;
use tracing::{info, warn};

use crate::backend::{BackendClient, ReqwestTransport, Session, Transport};
use crate::config::StorefrontConfig;
use crate::error::StorefrontError;
use crate::poller::TaskGuard;
use crate::services::auth::AuthStore;
use crate::services::catalog::{CatalogPager, ProductDetails};
use crate::services::checkout::CheckoutService;
use crate::services::orders::OrderTracker;
use crate::services::search::{ProductSearch, RecentSearches};
use crate::services::shop::ShopStore;
use crate::storage::{FileStore, LocalStore};

/// Every store wired to one backend client and session.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    client: BackendClient,
    auth: AuthStore,
    shop: ShopStore,
    details: ProductDetails,
    checkout: CheckoutService,
    orders: OrderTracker,
    search: ProductSearch,
}

impl Storefront {
    /// Wire the stores over an explicit transport and local store.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn LocalStore>,
    ) -> Self {
        let session = Session::new(Arc::clone(&store));
        let client = BackendClient::new(transport, session);
        let auth = AuthStore::new(client.clone());
        let shop = ShopStore::new(auth.clone());

        Self {
            inner: Arc::new(StorefrontInner {
                details: ProductDetails::new(client.clone()),
                checkout: CheckoutService::new(auth.clone(), shop.clone()),
                orders: OrderTracker::new(auth.clone()),
                search: ProductSearch::new(client.clone(), RecentSearches::new(store)),
                config,
                client,
                auth,
                shop,
            }),
        }
    }

    /// Wire the stores against the configured backend with an on-disk
    /// local store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the state
    /// directory cannot be created.
    pub fn from_config(config: StorefrontConfig) -> Result<Self, StorefrontError> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&config)?);
        let store: Arc<dyn LocalStore> = Arc::new(FileStore::open(&config.state_dir)?);
        Ok(Self::new(config, transport, store))
    }

    /// Restore the cached user and load their lists.
    ///
    /// A failed list load is logged, not returned: the cached user stays
    /// signed in until the backend says otherwise.
    pub async fn start(&self) -> Option<User> {
        let user = self.inner.auth.restore().await;
        if let Some(user) = &user {
            info!(username = %user.username, "restored cached session");
            if let Err(e) = self.inner.shop.sync().await {
                warn!(error = %e, "failed to load cart and wishlist");
            }
        }
        user
    }

    /// Keep the cart and wishlist in step with sign-in and sign-out.
    #[must_use]
    pub fn watch_session(&self) -> TaskGuard {
        self.inner.shop.watch_session()
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn client(&self) -> &BackendClient {
        &self.inner.client
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        self.inner.client.session()
    }

    #[must_use]
    pub fn auth(&self) -> &AuthStore {
        &self.inner.auth
    }

    #[must_use]
    pub fn shop(&self) -> &ShopStore {
        &self.inner.shop
    }

    #[must_use]
    pub fn details(&self) -> &ProductDetails {
        &self.inner.details
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    #[must_use]
    pub fn orders(&self) -> &OrderTracker {
        &self.inner.orders
    }

    #[must_use]
    pub fn search(&self) -> &ProductSearch {
        &self.inner.search
    }

    /// A fresh pager for one category, using the configured page size.
    #[must_use]
    pub fn pager(&self, category: impl Into<String>) -> CatalogPager {
        CatalogPager::new(self.inner.client.clone(), category, self.inner.config.page_size)
    }
}
