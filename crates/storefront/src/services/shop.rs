//! Cart and wishlist state with optimistic toggles.
//!
//! A toggle runs in three phases:
//!
//! 1. `apply_optimistic` flips local membership before any network call
//!    and counts the toggle as in flight.
//! 2. `perform_remote` issues the add or remove call.
//! 3. `reconcile` always runs. Only the last in-flight toggle on a list
//!    installs a re-fetched snapshot, and only one fetched after every
//!    remote call on that list has landed; otherwise it fetches again.
//!    If the re-fetch fails too, a failed toggle is undone locally.
//!
//! Remote calls may finish in any order, so earlier settlers never install
//! their snapshots: one of them could predate a later remote call.

use std::sync::Arc;

use apparel_core::{ProductId, ShopList};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::backend::{BackendClient, BackendError, SessionEvent};
use crate::poller::TaskGuard;
use crate::services::auth::AuthStore;

/// Errors from cart and wishlist operations.
#[derive(Debug, Error)]
pub enum ShopError {
    /// Nobody is signed in; the auth prompt has been raised.
    #[error("sign-in required")]
    AuthRequired,

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl ShopError {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthRequired => "Please log in to continue".to_string(),
            Self::Backend(e) => e.user_message(),
        }
    }
}

/// Which list an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Wishlist,
    Cart,
}

impl ListKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wishlist => "wishlist",
            Self::Cart => "cart",
        }
    }
}

#[derive(Debug, Default)]
struct ListState {
    list: ShopList,
    /// Bumped by every local mutation; a plain refresh is only installed if
    /// this has not moved since its fetch was issued.
    generation: u64,
    /// Toggles that have flipped locally but not yet settled.
    in_flight: u32,
    /// Remote calls that have completed, successful or not.
    landed: u64,
    /// Bumped by `clear`; toggles from an older epoch settle silently.
    epoch: u64,
}

/// Shared cart and wishlist store.
#[derive(Clone)]
pub struct ShopStore {
    inner: Arc<ShopStoreInner>,
}

struct ShopStoreInner {
    client: BackendClient,
    auth: AuthStore,
    wishlist: RwLock<ListState>,
    cart: RwLock<ListState>,
}

impl ShopStore {
    #[must_use]
    pub fn new(auth: AuthStore) -> Self {
        Self {
            inner: Arc::new(ShopStoreInner {
                client: auth.client().clone(),
                auth,
                wishlist: RwLock::new(ListState::default()),
                cart: RwLock::new(ListState::default()),
            }),
        }
    }

    fn state(&self, kind: ListKind) -> &RwLock<ListState> {
        match kind {
            ListKind::Wishlist => &self.inner.wishlist,
            ListKind::Cart => &self.inner.cart,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn list(&self, kind: ListKind) -> ShopList {
        self.state(kind).read().await.list.clone()
    }

    pub async fn wishlist(&self) -> ShopList {
        self.list(ListKind::Wishlist).await
    }

    pub async fn cart(&self) -> ShopList {
        self.list(ListKind::Cart).await
    }

    pub async fn contains(&self, kind: ListKind, product_id: &ProductId) -> bool {
        self.state(kind).read().await.list.contains(product_id)
    }

    pub async fn is_liked(&self, product_id: &ProductId) -> bool {
        self.contains(ListKind::Wishlist, product_id).await
    }

    pub async fn is_in_cart(&self, product_id: &ProductId) -> bool {
        self.contains(ListKind::Cart, product_id).await
    }

    // =========================================================================
    // Sync
    // =========================================================================

    /// Replace a list with the backend's copy.
    ///
    /// # Errors
    ///
    /// Returns the backend error; local state is left untouched.
    #[instrument(skip(self), fields(list = kind.as_str()))]
    pub async fn refresh(&self, kind: ListKind) -> Result<(), ShopError> {
        let generation = self.state(kind).read().await.generation;
        let list = self.fetch(kind).await?;
        let mut state = self.state(kind).write().await;
        if state.generation == generation {
            state.list = list;
        } else {
            debug!("list changed during refresh, keeping newer state");
        }
        Ok(())
    }

    /// Load both lists for the signed-in user, or clear them if nobody is.
    ///
    /// # Errors
    ///
    /// Returns the first backend error.
    pub async fn sync(&self) -> Result<(), ShopError> {
        if !self.inner.auth.is_authenticated().await {
            self.clear().await;
            return Ok(());
        }
        let (wishlist, cart) = tokio::join!(
            self.refresh(ListKind::Wishlist),
            self.refresh(ListKind::Cart)
        );
        wishlist.and(cart)
    }

    /// Drop both lists.
    pub async fn clear(&self) {
        for kind in [ListKind::Wishlist, ListKind::Cart] {
            let mut state = self.state(kind).write().await;
            state.list = ShopList::default();
            state.generation += 1;
            state.in_flight = 0;
            state.epoch += 1;
        }
    }

    /// Follow session changes: load on sign-in, clear on sign-out.
    #[must_use]
    pub fn watch_session(&self) -> TaskGuard {
        let store = self.clone();
        let mut events = self.inner.client.session().subscribe();
        TaskGuard::new(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::SignedIn(_)) => {
                        if let Err(e) = store.sync().await {
                            warn!(error = %e, "failed to load cart and wishlist");
                        }
                    }
                    Ok(SessionEvent::SignedOut) => store.clear().await,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "session events lagged, resyncing");
                        if let Err(e) = store.sync().await {
                            warn!(error = %e, "failed to resync cart and wishlist");
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }))
    }

    // =========================================================================
    // Toggles
    // =========================================================================

    /// Add the product to the wishlist if absent, remove it if present.
    ///
    /// Returns the settled membership.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::AuthRequired` when signed out (nothing is
    /// mutated), or the backend error after local state has been
    /// reconciled.
    pub async fn toggle_like(&self, product_id: &ProductId) -> Result<bool, ShopError> {
        self.toggle(ListKind::Wishlist, product_id).await
    }

    /// Toggle cart membership. Despite the name this also removes a product
    /// that is already in the cart.
    ///
    /// # Errors
    ///
    /// Same as [`ShopStore::toggle_like`].
    pub async fn add_to_cart(&self, product_id: &ProductId) -> Result<bool, ShopError> {
        self.toggle(ListKind::Cart, product_id).await
    }

    #[instrument(skip(self), fields(list = kind.as_str(), product_id = %product_id))]
    async fn toggle(&self, kind: ListKind, product_id: &ProductId) -> Result<bool, ShopError> {
        if self.inner.auth.require_user().await.is_err() {
            return Err(ShopError::AuthRequired);
        }

        match self.toggle_once(kind, product_id).await {
            Ok(member) => Ok(member),
            Err(e) if e.is_session_error() => {
                // The session layer did not resolve this one (e.g. a 2xx
                // envelope reporting an expired token).
                if self.inner.client.refresh_session().await {
                    Ok(self.toggle_once(kind, product_id).await?)
                } else {
                    self.inner.client.session().sign_out().await;
                    self.clear().await;
                    Err(ShopError::Backend(BackendError::SessionExpired))
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn toggle_once(&self, kind: ListKind, product_id: &ProductId) -> Result<bool, BackendError> {
        let (was_member, epoch) = self.apply_optimistic(kind, product_id).await;
        let remote = self.perform_remote(kind, product_id, was_member).await;
        self.reconcile(kind, product_id, epoch, &remote).await;
        remote?;
        Ok(self.contains(kind, product_id).await)
    }

    async fn apply_optimistic(&self, kind: ListKind, product_id: &ProductId) -> (bool, u64) {
        let mut state = self.state(kind).write().await;
        let was_member = state.list.flip(product_id);
        state.generation += 1;
        state.in_flight += 1;
        (was_member, state.epoch)
    }

    async fn perform_remote(
        &self,
        kind: ListKind,
        product_id: &ProductId,
        was_member: bool,
    ) -> Result<(), BackendError> {
        let client = &self.inner.client;
        match (kind, was_member) {
            (ListKind::Wishlist, false) => client.like_product(product_id).await,
            (ListKind::Wishlist, true) => client.dislike_product(product_id).await,
            (ListKind::Cart, false) => client.add_cart_product(product_id).await,
            (ListKind::Cart, true) => client.remove_cart_product(product_id).await,
        }
    }

    async fn reconcile(
        &self,
        kind: ListKind,
        product_id: &ProductId,
        epoch: u64,
        remote: &Result<(), BackendError>,
    ) {
        if matches!(remote, Err(BackendError::SessionExpired)) {
            // Already signed out; there is nothing to re-fetch.
            self.clear().await;
            return;
        }
        self.state(kind).write().await.landed += 1;

        loop {
            let landed = self.state(kind).read().await.landed;
            let fetched = self.fetch(kind).await;

            let mut state = self.state(kind).write().await;
            if state.epoch != epoch {
                return;
            }
            if state.in_flight > 1 {
                // A later settler re-fetches after this call landed.
                state.in_flight -= 1;
                debug!(in_flight = state.in_flight, "toggles still in flight, dropping snapshot");
                return;
            }
            match fetched {
                Ok(list) if state.landed == landed => {
                    state.list = list;
                    state.generation += 1;
                    state.in_flight = 0;
                    return;
                }
                Ok(_) => {
                    debug!("another toggle landed during re-fetch, fetching again");
                }
                Err(e) => {
                    warn!(error = %e, "failed to re-fetch list after toggle");
                    if remote.is_err() {
                        state.list.flip(product_id);
                    }
                    state.generation += 1;
                    state.in_flight = 0;
                    return;
                }
            }
        }
    }

    async fn fetch(&self, kind: ListKind) -> Result<ShopList, BackendError> {
        match kind {
            ListKind::Wishlist => self.inner.client.wishlist().await,
            ListKind::Cart => self.inner.client.cart().await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::endpoints;
    use crate::services::auth::AuthView;
    use crate::testing::FakeBackend;

    async fn signed_in() -> (FakeBackend, ShopStore) {
        let fake = FakeBackend::new();
        fake.add_product_json(serde_json::json!({"_id": "p1", "name": "Tee", "price": 499}));
        fake.add_product_json(serde_json::json!({"_id": "p2", "name": "Cargo", "price": 1499}));
        let auth = AuthStore::new(fake.client());
        fake.sign_in(&auth).await;
        (fake, ShopStore::new(auth))
    }

    #[tokio::test]
    async fn test_toggle_requires_sign_in_and_mutates_nothing() {
        let fake = FakeBackend::new();
        let auth = AuthStore::new(fake.client());
        let shop = ShopStore::new(auth.clone());

        let err = shop.toggle_like(&ProductId::new("p1")).await.unwrap_err();
        assert!(matches!(err, ShopError::AuthRequired));
        assert!(shop.wishlist().await.is_empty());
        assert!(auth.prompt().await.visible);
        assert_eq!(auth.prompt().await.view, AuthView::Login);
        assert_eq!(fake.count(endpoints::LIKE_PRODUCT), 0);
    }

    #[tokio::test]
    async fn test_like_then_unlike_settles_to_server_state() {
        let (fake, shop) = signed_in().await;
        let id = ProductId::new("p1");

        assert!(shop.toggle_like(&id).await.unwrap());
        assert!(shop.is_liked(&id).await);
        assert!(fake.wishlist_ids().contains(&"p1".to_string()));
        assert!(shop.wishlist().await.entries().iter().all(|e| !e.is_placeholder()));

        assert!(!shop.toggle_like(&id).await.unwrap());
        assert!(!shop.is_liked(&id).await);
        assert!(fake.wishlist_ids().is_empty());
    }

    #[tokio::test]
    async fn test_remote_failure_rolls_back_via_refetch() {
        let (fake, shop) = signed_in().await;
        let id = ProductId::new("p2");
        fake.reject(endpoints::CART_ADD, 500, "Out of stock");

        let err = shop.add_to_cart(&id).await.unwrap_err();
        assert_eq!(err.user_message(), "Out of stock");
        assert!(!shop.is_in_cart(&id).await);
        assert_eq!(fake.count(endpoints::CART_LIST), 1);
    }

    #[tokio::test]
    async fn test_remote_and_refetch_failure_undoes_locally() {
        let (fake, shop) = signed_in().await;
        let id = ProductId::new("p2");
        fake.fail_network(endpoints::LIKE_PRODUCT);
        fake.fail_network(endpoints::LIKE_LIST);

        assert!(shop.toggle_like(&id).await.is_err());
        assert!(!shop.is_liked(&id).await);
    }

    #[tokio::test]
    async fn test_success_false_session_message_refreshes_and_retries_toggle() {
        let (fake, shop) = signed_in().await;
        let id = ProductId::new("p1");
        fake.reject_once_with_success_false(endpoints::LIKE_PRODUCT, "jwt expired");

        assert!(shop.toggle_like(&id).await.unwrap());
        assert_eq!(fake.count(endpoints::REFRESH_TOKEN), 1);
        assert_eq!(fake.count(endpoints::LIKE_PRODUCT), 2);
        assert!(shop.is_liked(&id).await);
    }

    #[tokio::test]
    async fn test_overlapping_toggles_settle_to_server() {
        let (fake, shop) = signed_in().await;
        let id = ProductId::new("p1");

        let (a, b) = tokio::join!(shop.add_to_cart(&id), shop.add_to_cart(&id));
        a.unwrap();
        b.unwrap();
        assert_eq!(
            shop.is_in_cart(&id).await,
            fake.cart_ids().contains(&"p1".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_order_remote_calls_settle_to_server() {
        let (fake, shop) = signed_in().await;
        let id = ProductId::new("p1");
        // The add is slow, so the second toggle's remove lands and re-fetches
        // first with a snapshot that misses the add.
        fake.set_latency(endpoints::CART_ADD, Duration::from_millis(100));

        let (a, b) = tokio::join!(shop.add_to_cart(&id), shop.add_to_cart(&id));
        a.unwrap();
        b.unwrap();

        assert_eq!(fake.cart_ids(), ["p1".to_string()]);
        assert!(shop.is_in_cart(&id).await);
        assert_eq!(fake.count(endpoints::CART_REMOVE), 1);
    }
}
