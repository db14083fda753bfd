//! Session-aware backend client.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use apparel_core::{
    Address, Email, NewAddress, Order, OrderId, Product, ProductId, ServiceAreas, ShopList, User,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::conversions::shop_list;
use super::endpoints;
use super::session::Session;
use super::transport::{ApiRequest, ApiResponse, Transport};
use super::types::{
    Ack, AddressesResponse, AreasResponse, OrderRequest, OrdersResponse, PlaceOrderResponse,
    ProductPageResponse, ProductsResponse, ShopListResponse, SingleProductResponse, UserResponse,
};
use super::{BackendError, is_session_message};

/// One page of the catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub has_next_page: bool,
}

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the apparel backend.
///
/// Every call except the credential exchanges (login, registration, token
/// refresh, password recovery) goes through [`BackendClient::execute`], which
/// applies the session refresh protocol.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    transport: Arc<dyn Transport>,
    session: Session,
    /// Serializes refresh calls.
    refresh_lock: Mutex<()>,
    /// Bumped after every successful refresh.
    refresh_epoch: AtomicU64,
}

impl BackendClient {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, session: Session) -> Self {
        Self {
            inner: Arc::new(BackendClientInner {
                transport,
                session,
                refresh_lock: Mutex::new(()),
                refresh_epoch: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Send a request under the session protocol.
    ///
    /// An unauthorized response to a request that has not been retried yet
    /// triggers one refresh; on success the request is sent once more,
    /// marked as retried. If the refresh fails or the retry is unauthorized
    /// again, the session is signed out.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::SessionExpired` when the session could not be
    /// recovered, `BackendError::Api` for other non-success statuses, and
    /// transport errors as they occur.
    #[instrument(skip(self, request), fields(method = request.method.as_str(), path = %request.path))]
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, BackendError> {
        let epoch = self.inner.refresh_epoch.load(Ordering::SeqCst);
        let response = self.inner.transport.send(&request).await?;
        if !is_unauthorized(&response) {
            return check_status(response);
        }

        if request.is_retried() {
            return Err(self.expire().await);
        }

        debug!(status = response.status, "unauthorized, refreshing session");
        if !self.refresh_since(epoch).await {
            return Err(self.expire().await);
        }

        let retry = request.into_retry();
        let response = self.inner.transport.send(&retry).await?;
        if is_unauthorized(&response) {
            return Err(self.expire().await);
        }
        check_status(response)
    }

    /// Send a request under the session protocol and decode its envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the envelope reports
    /// `success: false`, or the payload does not decode.
    pub async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, BackendError> {
        let response = self.execute(request).await?;
        decode(&response)
    }

    /// Send a request outside the session protocol.
    ///
    /// Used for credential exchanges, where a 401 means "wrong password"
    /// rather than "session expired".
    ///
    /// # Errors
    ///
    /// Same as [`BackendClient::call`], without session recovery.
    pub async fn call_public<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, BackendError> {
        let response = self.inner.transport.send(&request).await?;
        decode(&check_status(response)?)
    }

    /// Ask the backend for a fresh access token.
    ///
    /// Returns whether the backend reported success. Never errors; a failed
    /// refresh is logged and reported as `false`.
    pub async fn refresh_session(&self) -> bool {
        let epoch = self.inner.refresh_epoch.load(Ordering::SeqCst);
        let _guard = self.inner.refresh_lock.lock().await;
        if self.inner.refresh_epoch.load(Ordering::SeqCst) != epoch {
            return true;
        }
        self.send_refresh().await
    }

    /// Refresh unless another caller already refreshed after `epoch`.
    async fn refresh_since(&self, epoch: u64) -> bool {
        let _guard = self.inner.refresh_lock.lock().await;
        if self.inner.refresh_epoch.load(Ordering::SeqCst) != epoch {
            debug!("session already refreshed by a concurrent request");
            return true;
        }
        self.send_refresh().await
    }

    async fn send_refresh(&self) -> bool {
        let request = ApiRequest::post(endpoints::REFRESH_TOKEN).json(json!({}));
        let refreshed = match self.inner.transport.send(&request).await {
            Ok(response) => response.is_success() && response.success_flag() == Some(true),
            Err(e) => {
                warn!(error = %e, "session refresh request failed");
                false
            }
        };
        if refreshed {
            self.inner.refresh_epoch.fetch_add(1, Ordering::SeqCst);
        } else {
            warn!("session refresh rejected");
        }
        refreshed
    }

    async fn expire(&self) -> BackendError {
        self.inner.session.sign_out().await;
        BackendError::SessionExpired
    }

    // =========================================================================
    // User
    // =========================================================================

    /// Exchange credentials for a session cookie and the user record.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn login(&self, email: &Email, password: &str) -> Result<User, BackendError> {
        let request = ApiRequest::post(endpoints::LOGIN)
            .json(json!({ "email": email.as_str(), "password": password }));
        let response: UserResponse = self.call_public(request).await?;
        Ok(response.user)
    }

    #[instrument(skip_all, fields(email = %email))]
    pub async fn register(
        &self,
        username: &str,
        email: &Email,
        password: &str,
    ) -> Result<(), BackendError> {
        let request = ApiRequest::post(endpoints::REGISTER).json(json!({
            "username": username,
            "email": email.as_str(),
            "password": password,
        }));
        self.call_public::<Ack>(request).await.map(drop)
    }

    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), BackendError> {
        let request = ApiRequest::post(endpoints::LOGOUT).json(json!({}));
        self.call::<Ack>(request).await.map(drop)
    }

    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), BackendError> {
        let request = ApiRequest::patch(endpoints::RESET_PASSWORD).json(json!({
            "oldPassword": old_password,
            "newPassword": new_password,
        }));
        self.call::<Ack>(request).await.map(drop)
    }

    #[instrument(skip_all, fields(email = %email))]
    pub async fn request_password_otp(&self, email: &Email) -> Result<(), BackendError> {
        let request =
            ApiRequest::post(endpoints::FORGOT_PASSWORD).json(json!({ "email": email.as_str() }));
        self.call_public::<Ack>(request).await.map(drop)
    }

    #[instrument(skip_all, fields(email = %email))]
    pub async fn verify_password_otp(&self, email: &Email, otp: &str) -> Result<(), BackendError> {
        let request = ApiRequest::post(endpoints::VERIFY_OTP)
            .json(json!({ "email": email.as_str(), "otp": otp }));
        self.call_public::<Ack>(request).await.map(drop)
    }

    #[instrument(skip_all, fields(email = %email))]
    pub async fn set_forgotten_password(
        &self,
        email: &Email,
        otp: &str,
        new_password: &str,
    ) -> Result<(), BackendError> {
        let request = ApiRequest::post(endpoints::SET_FORGOT_PASSWORD).json(json!({
            "email": email.as_str(),
            "otp": otp,
            "newPassword": new_password,
        }));
        self.call_public::<Ack>(request).await.map(drop)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Fetch one catalog page for a category.
    #[instrument(skip(self))]
    pub async fn product_page(
        &self,
        category: &str,
        page: u32,
        limit: u32,
    ) -> Result<ProductPage, BackendError> {
        let request = ApiRequest::get(endpoints::PRODUCT_PAGE)
            .query("category", category)
            .query("limit", limit)
            .query("page", page);
        let response: ProductPageResponse = self.call(request).await?;
        Ok(ProductPage {
            products: response.products.into_iter().map(Product::from).collect(),
            has_next_page: response.has_next_page,
        })
    }

    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, BackendError> {
        let request = ApiRequest::get(endpoints::SINGLE_PRODUCT).query("id", id);
        let response: SingleProductResponse = self.call(request).await?;
        response
            .find_product
            .map(Product::from)
            .ok_or_else(|| BackendError::Rejected("Product not found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn all_products(&self) -> Result<Vec<Product>, BackendError> {
        let response: ProductsResponse = self.call(ApiRequest::get(endpoints::ALL_PRODUCTS)).await?;
        Ok(response.products.into_iter().map(Product::from).collect())
    }

    // =========================================================================
    // Wishlist and cart
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn wishlist(&self) -> Result<ShopList, BackendError> {
        let response: ShopListResponse = self.call(ApiRequest::get(endpoints::LIKE_LIST)).await?;
        Ok(shop_list(response.items))
    }

    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn like_product(&self, id: &ProductId) -> Result<(), BackendError> {
        self.product_mutation(endpoints::LIKE_PRODUCT, id).await
    }

    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn dislike_product(&self, id: &ProductId) -> Result<(), BackendError> {
        self.product_mutation(endpoints::DISLIKE_PRODUCT, id).await
    }

    #[instrument(skip(self))]
    pub async fn cart(&self) -> Result<ShopList, BackendError> {
        let response: ShopListResponse = self.call(ApiRequest::get(endpoints::CART_LIST)).await?;
        Ok(shop_list(response.items))
    }

    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn add_cart_product(&self, id: &ProductId) -> Result<(), BackendError> {
        self.product_mutation(endpoints::CART_ADD, id).await
    }

    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn remove_cart_product(&self, id: &ProductId) -> Result<(), BackendError> {
        self.product_mutation(endpoints::CART_REMOVE, id).await
    }

    async fn product_mutation(&self, path: &str, id: &ProductId) -> Result<(), BackendError> {
        let request = ApiRequest::post(path).json(json!({ "productId": id.as_str() }));
        self.call::<Ack>(request).await.map(drop)
    }

    // =========================================================================
    // Addresses and serviceability
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn addresses(&self) -> Result<Vec<Address>, BackendError> {
        let response: AddressesResponse = self.call(ApiRequest::get(endpoints::ADDRESSES)).await?;
        Ok(response.addresses)
    }

    #[instrument(skip(self, address), fields(pincode = %address.pincode))]
    pub async fn add_address(&self, address: &NewAddress) -> Result<(), BackendError> {
        let request = ApiRequest::post(endpoints::ADD_ADDRESS).json(serde_json::to_value(address)?);
        self.call::<Ack>(request).await.map(drop)
    }

    #[instrument(skip(self))]
    pub async fn service_areas(&self) -> Result<ServiceAreas, BackendError> {
        let response: AreasResponse = self.call(ApiRequest::get(endpoints::ALL_PINCODES)).await?;
        Ok(ServiceAreas::new(response.areas))
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Place an order. Returns the new order id when the backend reports it.
    #[instrument(skip(self, order), fields(lines = order.items.len()))]
    pub async fn place_order(&self, order: &OrderRequest) -> Result<Option<OrderId>, BackendError> {
        let request = ApiRequest::post(endpoints::PLACE_ORDER).json(serde_json::to_value(order)?);
        let response: PlaceOrderResponse = self.call(request).await?;
        Ok(response
            .order_id
            .or_else(|| response.order.map(|o| o.id))
            .map(OrderId::new))
    }

    #[instrument(skip(self))]
    pub async fn my_orders(&self) -> Result<Vec<Order>, BackendError> {
        let response: OrdersResponse = self.call(ApiRequest::get(endpoints::MY_ORDERS)).await?;
        Ok(response.orders.into_iter().map(Order::from).collect())
    }

    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn cancel_order(&self, id: &OrderId) -> Result<(), BackendError> {
        let request =
            ApiRequest::post(endpoints::CANCEL_ORDER).json(json!({ "orderId": id.as_str() }));
        self.call::<Ack>(request).await.map(drop)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Whether a response reports a missing or expired session.
fn is_unauthorized(response: &ApiResponse) -> bool {
    response.status == 401
        || (!response.is_success()
            && response
                .message()
                .is_some_and(|m| is_session_message(&m)))
}

fn check_status(response: ApiResponse) -> Result<ApiResponse, BackendError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(BackendError::Api {
            status: response.status,
            message: response.message().unwrap_or_default(),
        })
    }
}

/// Decode an envelope, turning `success: false` into `BackendError::Rejected`.
fn decode<T: DeserializeOwned>(response: &ApiResponse) -> Result<T, BackendError> {
    let value: Value = if response.body.trim().is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str(&response.body)?
    };

    if value.get("success").and_then(Value::as_bool) == Some(false) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Request failed")
            .to_string();
        return Err(BackendError::Rejected(message));
    }

    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::SessionEvent;
    use crate::storage::MemoryStore;
    use crate::testing::{ScriptedTransport, test_user};

    fn client_with(transport: &Arc<ScriptedTransport>) -> BackendClient {
        let session = Session::new(Arc::new(MemoryStore::new()));
        BackendClient::new(Arc::clone(transport) as Arc<dyn Transport>, session)
    }

    fn ok(body: Value) -> ApiResponse {
        ApiResponse::json(200, &body)
    }

    fn unauthorized() -> ApiResponse {
        ApiResponse::json(401, &json!({"success": false, "message": "jwt expired"}))
    }

    #[tokio::test]
    async fn test_refresh_then_retry_succeeds() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(unauthorized());
        transport.push(ok(json!({"success": true})));
        transport.push(ok(json!({"success": true, "likeList": []})));

        let client = client_with(&transport);
        client.session().sign_in(test_user()).await;

        let list = client.wishlist().await.unwrap();
        assert!(list.is_empty());

        let paths = transport.paths();
        assert_eq!(
            paths,
            [endpoints::LIKE_LIST, endpoints::REFRESH_TOKEN, endpoints::LIKE_LIST]
        );
        assert!(transport.requests()[2].is_retried());
        assert!(client.session().is_authenticated().await);
    }

    #[tokio::test]
    async fn test_failed_refresh_signs_out_once() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(unauthorized());
        transport.push(ApiResponse::json(
            401,
            &json!({"success": false, "message": "refresh token expired"}),
        ));

        let client = client_with(&transport);
        client.session().sign_in(test_user()).await;
        let mut events = client.session().subscribe();

        let err = client.cart().await.unwrap_err();
        assert!(matches!(err, BackendError::SessionExpired));
        assert_eq!(transport.count(endpoints::REFRESH_TOKEN), 1);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedOut);
        assert!(events.try_recv().is_err());
        assert!(!client.session().is_authenticated().await);
    }

    #[tokio::test]
    async fn test_unauthorized_retry_does_not_refresh_again() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(unauthorized());
        transport.push(ok(json!({"success": true})));
        transport.push(unauthorized());

        let client = client_with(&transport);
        client.session().sign_in(test_user()).await;

        let err = client.my_orders().await.unwrap_err();
        assert!(matches!(err, BackendError::SessionExpired));
        assert_eq!(transport.count(endpoints::REFRESH_TOKEN), 1);
        assert_eq!(transport.count(endpoints::MY_ORDERS), 2);
        assert!(!client.session().is_authenticated().await);
    }

    #[tokio::test]
    async fn test_session_message_with_error_status_triggers_refresh() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(ApiResponse::json(
            403,
            &json!({"success": false, "message": "UnAuthroize request"}),
        ));
        transport.push(ok(json!({"success": true})));
        transport.push(ok(json!({"success": true, "addresses": []})));

        let client = client_with(&transport);
        assert!(client.addresses().await.unwrap().is_empty());
        assert_eq!(transport.count(endpoints::REFRESH_TOKEN), 1);
    }

    #[tokio::test]
    async fn test_login_failure_does_not_refresh() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(ApiResponse::json(
            401,
            &json!({"success": false, "message": "Invalid credentials"}),
        ));

        let client = client_with(&transport);
        let email = Email::parse("rajat@example.in").unwrap();
        let err = client.login(&email, "wrong").await.unwrap_err();
        assert_eq!(err.server_message(), Some("Invalid credentials"));
        assert_eq!(transport.count(endpoints::REFRESH_TOKEN), 0);
    }

    #[tokio::test]
    async fn test_success_false_is_rejected() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(ok(json!({"success": false, "message": "Out of stock"})));

        let client = client_with(&transport);
        let err = client
            .add_cart_product(&ProductId::new("p1"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Rejected(ref m) if m == "Out of stock"));
    }

    #[tokio::test]
    async fn test_product_page_query() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(ok(json!({
            "success": true,
            "hasNextPage": true,
            "products": [{"_id": "p1", "name": "Tee", "price": 499}]
        })));

        let client = client_with(&transport);
        let page = client.product_page("men", 2, 6).await.unwrap();
        assert!(page.has_next_page);
        assert_eq!(page.products.len(), 1);

        let request = &transport.requests()[0];
        assert_eq!(request.query_value("category"), Some("men"));
        assert_eq!(request.query_value("page"), Some("2"));
        assert_eq!(request.query_value("limit"), Some("6"));
    }
}
