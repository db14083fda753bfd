//! In-process backends for tests.
//!
//! - [`ScriptedTransport`] replays a queue of canned responses and records
//!   every request, for exercising the session protocol step by step.
//! - [`FakeBackend`] is a small stateful imitation of the real API (users,
//!   sessions, catalog, lists, addresses, pincodes, orders and the admin
//!   dashboard) with fault injection per path.
//!
//! Compiled for this crate's own tests and, behind the `test-util` feature,
//! for the admin crate and the integration tests.

#![allow(clippy::missing_panics_doc, clippy::significant_drop_tightening)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use apparel_core::{Email, OrderStatus, Role, Rupees, User, UserId, shipping_for};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{Map, Value, json};

use crate::backend::endpoints;
use crate::backend::{
    ApiRequest, ApiResponse, BackendClient, BackendError, RequestBody, Session, Transport,
};
use crate::services::auth::AuthStore;
use crate::storage::MemoryStore;

/// The user every fake signs in as unless told otherwise.
#[must_use]
pub fn test_user() -> User {
    User {
        id: Some(UserId::new("u-1")),
        username: "rajat".to_string(),
        email: Email::parse("rajat@example.in").unwrap_or_else(|_| unreachable!()),
        role: Role::Customer,
    }
}

const TEST_PASSWORD: &str = "hunter22";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn envelope(status: u16, mut payload: Value) -> ApiResponse {
    if let Some(map) = payload.as_object_mut() {
        map.entry("success").or_insert(Value::Bool(status < 400));
    }
    ApiResponse::json(status, &payload)
}

fn ok(payload: Value) -> ApiResponse {
    envelope(200, payload)
}

fn failure(status: u16, message: &str) -> ApiResponse {
    envelope(status, json!({ "success": false, "message": message }))
}

// =============================================================================
// ScriptedTransport
// =============================================================================

/// Replays queued responses in order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<ApiResponse, String>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn push(&self, response: ApiResponse) {
        lock(&self.responses).push_back(Ok(response));
    }

    /// Queue a transport failure.
    pub fn push_network_error(&self, reason: &str) {
        lock(&self.responses).push_back(Err(reason.to_string()));
    }

    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.requests).clone()
    }

    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        lock(&self.requests).iter().map(|r| r.path.clone()).collect()
    }

    #[must_use]
    pub fn count(&self, path: &str) -> usize {
        lock(&self.requests).iter().filter(|r| r.path == path).count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, BackendError> {
        lock(&self.requests).push(request.clone());
        match lock(&self.responses).pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(BackendError::Network(reason)),
            None => Err(BackendError::Network(format!(
                "no scripted response for {}",
                request.path
            ))),
        }
    }
}

// =============================================================================
// FakeBackend
// =============================================================================

/// Session cookie state as the fake server sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    /// No session cookies at all.
    None,
    /// Access token valid.
    Valid,
    /// Access token expired, refresh token still good.
    Expired,
    /// Both tokens expired.
    Revoked,
}

#[derive(Debug, Clone)]
enum Fault {
    Reject { status: u16, message: String },
    SuccessFalse(String),
    Network,
}

#[derive(Debug, Clone)]
struct FaultRule {
    fault: Fault,
    once: bool,
}

#[derive(Debug, Clone)]
struct FakeUser {
    id: String,
    username: String,
    email: String,
    password: String,
    role: Role,
}

impl FakeUser {
    fn to_json(&self) -> Value {
        json!({
            "_id": self.id,
            "username": self.username,
            "email": self.email,
            "role": self.role,
        })
    }
}

#[derive(Debug, Clone)]
struct CartLine {
    id: String,
    product_id: String,
    size: Option<String>,
    color: Option<String>,
    quantity: u32,
}

struct FakeState {
    access: Access,
    current: Option<String>,
    users: Vec<FakeUser>,
    otps: HashMap<String, String>,
    last_otp: Option<String>,
    products: Vec<Value>,
    wishlist: Vec<String>,
    cart: Vec<CartLine>,
    addresses: Vec<Value>,
    areas: Vec<Value>,
    orders: Vec<Value>,
    faults: HashMap<String, Vec<FaultRule>>,
    latency: HashMap<String, Duration>,
    requests: Vec<ApiRequest>,
    next_id: u64,
}

impl FakeState {
    fn new() -> Self {
        Self {
            access: Access::None,
            current: None,
            users: Vec::new(),
            otps: HashMap::new(),
            last_otp: None,
            products: Vec::new(),
            wishlist: Vec::new(),
            cart: Vec::new(),
            addresses: Vec::new(),
            areas: Vec::new(),
            orders: Vec::new(),
            faults: HashMap::new(),
            latency: HashMap::new(),
            requests: Vec::new(),
            next_id: 0,
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn take_fault(&mut self, path: &str) -> Option<Fault> {
        let rules = self.faults.get_mut(path)?;
        let rule = rules.first()?.clone();
        if rule.once {
            rules.remove(0);
        }
        Some(rule.fault)
    }

    fn product(&self, id: &str) -> Option<&Value> {
        self.products.iter().find(|p| p["_id"] == id)
    }

    fn product_mut(&mut self, id: &str) -> Option<&mut Value> {
        self.products.iter_mut().find(|p| p["_id"] == id)
    }

    fn populated(&self, id: &str) -> Value {
        self.product(id).cloned().unwrap_or(Value::Null)
    }

    fn current_user(&self) -> Option<&FakeUser> {
        let email = self.current.as_deref()?;
        self.users.iter().find(|u| u.email == email)
    }

    fn order_json(&self, order: &Value) -> Value {
        let mut order = order.clone();
        if let Some(items) = order.get_mut("items").and_then(Value::as_array_mut) {
            for item in items {
                if let Some(id) = item.get("productId").and_then(Value::as_str).map(str::to_owned)
                    && let Some(product) = self.product(&id)
                {
                    item["productId"] = product.clone();
                }
            }
        }
        order
    }
}

/// Stateful in-memory backend.
#[derive(Clone)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::new())),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        lock(&self.state)
    }

    /// This fake as a shareable transport.
    #[must_use]
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::new(self.clone())
    }

    /// A client with a fresh in-memory session.
    #[must_use]
    pub fn client(&self) -> BackendClient {
        BackendClient::new(self.transport(), Session::new(Arc::new(MemoryStore::new())))
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    pub fn add_user(&self, username: &str, email: &str, password: &str) {
        self.add_user_with_role(username, email, password, Role::Customer);
    }

    pub fn add_user_with_role(&self, username: &str, email: &str, password: &str, role: Role) {
        let mut state = self.state();
        let id = state.next_id("u");
        state.users.retain(|u| u.email != email);
        state.users.push(FakeUser {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role,
        });
    }

    /// Log `auth` in as the test user (or a staff user when `role` says so),
    /// creating the account if needed.
    pub async fn sign_in(&self, auth: &AuthStore) {
        self.sign_in_as(auth, Role::Customer).await;
    }

    pub async fn sign_in_as(&self, auth: &AuthStore, role: Role) {
        let user = test_user();
        let existing = {
            let mut state = self.state();
            state
                .users
                .iter_mut()
                .find(|u| u.email == user.email.as_str())
                .map(|u| {
                    u.role = role;
                    u.password.clone()
                })
        };
        let password = if let Some(password) = existing {
            password
        } else {
            self.add_user_with_role(&user.username, user.email.as_str(), TEST_PASSWORD, role);
            TEST_PASSWORD.to_string()
        };
        let secret = secrecy::SecretString::from(password);
        if let Err(e) = auth.login(user.email.as_str(), &secret).await {
            panic!("fake sign-in failed: {e}");
        }
    }

    pub fn add_product_json(&self, product: Value) {
        self.state().products.push(product);
    }

    pub fn add_area(&self, pincode: &str, city: &str, state: &str, deliverable: bool) {
        let mut s = self.state();
        let id = s.next_id("pin");
        s.areas.push(json!({
            "_id": id,
            "pincode": pincode,
            "city": city,
            "state": state,
            "DeliveryAvlabelStatus": deliverable,
        }));
    }

    /// Store an address for the signed-in user. Returns its id.
    pub fn seed_address(&self, pincode: &str, is_default: bool) -> String {
        let mut state = self.state();
        let id = state.next_id("addr");
        state.addresses.push(json!({
            "_id": id,
            "fullName": "Rajat Sharma",
            "phone": "9999999999",
            "pincode": pincode,
            "state": "Rajasthan",
            "city": "Alwar",
            "houseNo": "12",
            "area": "Scheme 1",
            "type": "Home",
            "isDefault": is_default,
        }));
        id
    }

    pub fn seed_cart(&self, product_id: &str) {
        self.seed_cart_line(product_id, None, None, 1);
    }

    pub fn seed_cart_line(
        &self,
        product_id: &str,
        color: Option<&str>,
        size: Option<&str>,
        quantity: u32,
    ) {
        let mut state = self.state();
        let id = state.next_id("cart");
        state.cart.push(CartLine {
            id,
            product_id: product_id.to_string(),
            size: size.map(str::to_owned),
            color: color.map(str::to_owned),
            quantity,
        });
    }

    pub fn seed_wishlist(&self, product_id: &str) {
        self.state().wishlist.push(product_id.to_string());
    }

    pub fn add_order_json(&self, order: Value) {
        self.state().orders.push(order);
    }

    pub fn set_order_status(&self, order_id: &str, status: OrderStatus) {
        let mut state = self.state();
        if let Some(order) = state.orders.iter_mut().find(|o| o["_id"] == order_id) {
            order["orderStatus"] = json!(status);
        }
    }

    pub fn remove_order(&self, order_id: &str) {
        self.state().orders.retain(|o| o["_id"] != order_id);
    }

    pub fn remove_product(&self, product_id: &str) {
        self.state().products.retain(|p| p["_id"] != product_id);
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Treat the client as holding valid session cookies.
    pub fn grant_session(&self) {
        let mut state = self.state();
        state.access = Access::Valid;
        if state.current.is_none() {
            state.current = Some(test_user().email.as_str().to_string());
        }
    }

    /// Expire the access token; the next refresh succeeds.
    pub fn expire_access(&self) {
        self.state().access = Access::Expired;
    }

    /// Expire both tokens; the next refresh fails.
    pub fn revoke_session(&self) {
        self.state().access = Access::Revoked;
    }

    // =========================================================================
    // Fault injection
    // =========================================================================

    fn add_fault(&self, path: &str, fault: Fault, once: bool) {
        self.state()
            .faults
            .entry(path.to_string())
            .or_default()
            .push(FaultRule { fault, once });
    }

    /// Answer every request to `path` with `status` and `message`.
    pub fn reject(&self, path: &str, status: u16, message: &str) {
        self.add_fault(
            path,
            Fault::Reject {
                status,
                message: message.to_string(),
            },
            false,
        );
    }

    pub fn reject_once(&self, path: &str, status: u16, message: &str) {
        self.add_fault(
            path,
            Fault::Reject {
                status,
                message: message.to_string(),
            },
            true,
        );
    }

    /// Answer the next request to `path` with HTTP 200 and
    /// `{"success": false, "message": message}`.
    pub fn reject_once_with_success_false(&self, path: &str, message: &str) {
        self.add_fault(path, Fault::SuccessFalse(message.to_string()), true);
    }

    pub fn fail_network(&self, path: &str) {
        self.add_fault(path, Fault::Network, false);
    }

    pub fn fail_network_once(&self, path: &str) {
        self.add_fault(path, Fault::Network, true);
    }

    pub fn clear_faults(&self) {
        self.state().faults.clear();
    }

    /// Delay every response for `path`. Pair with a paused tokio clock.
    pub fn set_latency(&self, path: &str, delay: Duration) {
        self.state().latency.insert(path.to_string(), delay);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state().requests.clone()
    }

    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.state()
            .requests
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.state().requests.iter().map(|r| r.path.clone()).collect()
    }

    #[must_use]
    pub fn count(&self, path: &str) -> usize {
        self.state().requests.iter().filter(|r| r.path == path).count()
    }

    #[must_use]
    pub fn wishlist_ids(&self) -> Vec<String> {
        self.state().wishlist.clone()
    }

    #[must_use]
    pub fn cart_ids(&self) -> Vec<String> {
        self.state().cart.iter().map(|l| l.product_id.clone()).collect()
    }

    #[must_use]
    pub fn last_otp(&self) -> Option<String> {
        self.state().last_otp.clone()
    }

    #[must_use]
    pub fn order_status(&self, order_id: &str) -> Option<OrderStatus> {
        let state = self.state();
        let order = state.orders.iter().find(|o| o["_id"] == order_id)?;
        serde_json::from_value(order["orderStatus"].clone()).ok()
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        self.state().orders.len()
    }

    #[must_use]
    pub fn product_json(&self, product_id: &str) -> Option<Value> {
        self.state().product(product_id).cloned()
    }

    #[must_use]
    pub fn area_json(&self, pincode: &str) -> Option<Value> {
        self.state()
            .areas
            .iter()
            .find(|a| a["pincode"] == pincode)
            .cloned()
    }

    // =========================================================================
    // Request handling
    // =========================================================================

    fn handle(&self, request: &ApiRequest) -> Result<ApiResponse, BackendError> {
        let mut state = self.state();

        if let Some(fault) = state.take_fault(&request.path) {
            return match fault {
                Fault::Reject { status, message } => Ok(failure(status, &message)),
                Fault::SuccessFalse(message) => Ok(failure(200, &message)),
                Fault::Network => Err(BackendError::Network("connection refused".to_string())),
            };
        }

        let body = match &request.body {
            RequestBody::Json(value) => value.clone(),
            RequestBody::Empty | RequestBody::Multipart(_) => Value::Null,
        };
        let path = request.path.as_str();

        match path {
            endpoints::LOGIN => Ok(login(&mut state, &body)),
            endpoints::REGISTER => Ok(register(&mut state, &body)),
            endpoints::REFRESH_TOKEN => Ok(refresh(&mut state)),
            endpoints::FORGOT_PASSWORD => Ok(forgot_password(&mut state, &body)),
            endpoints::VERIFY_OTP => Ok(verify_otp(&state, &body)),
            endpoints::SET_FORGOT_PASSWORD => Ok(set_forgot_password(&mut state, &body)),
            endpoints::PRODUCT_PAGE => Ok(product_page(&state, request)),
            endpoints::SINGLE_PRODUCT => Ok(single_product(&state, request)),
            endpoints::ALL_PRODUCTS => Ok(ok(json!({ "products": state.products }))),
            _ => {
                if let Some(denied) = check_access(&state, path) {
                    return Ok(denied);
                }
                Ok(protected(&mut state, request, &body))
            }
        }
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, BackendError> {
        let delay = {
            let mut state = self.state();
            state.requests.push(request.clone());
            state.latency.get(&request.path).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.handle(request)
    }
}

// =============================================================================
// Handlers
// =============================================================================

fn str_field<'a>(body: &'a Value, key: &str) -> &'a str {
    body.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn login(state: &mut FakeState, body: &Value) -> ApiResponse {
    let email = str_field(body, "email");
    let password = str_field(body, "password");
    let Some(user) = state
        .users
        .iter()
        .find(|u| u.email.eq_ignore_ascii_case(email) && u.password == password)
        .cloned()
    else {
        return failure(401, "Invalid email or password");
    };
    state.access = Access::Valid;
    state.current = Some(user.email.clone());
    ok(json!({ "message": "Login successful", "user": user.to_json() }))
}

fn register(state: &mut FakeState, body: &Value) -> ApiResponse {
    let email = str_field(body, "email").to_string();
    if state.users.iter().any(|u| u.email.eq_ignore_ascii_case(&email)) {
        return failure(400, "User already exists");
    }
    let id = state.next_id("u");
    state.users.push(FakeUser {
        id,
        username: str_field(body, "username").to_string(),
        email,
        password: str_field(body, "password").to_string(),
        role: Role::Customer,
    });
    ok(json!({ "message": "User registered successfully" }))
}

fn refresh(state: &mut FakeState) -> ApiResponse {
    match state.access {
        Access::Valid | Access::Expired => {
            state.access = Access::Valid;
            ok(json!({ "message": "Token refreshed" }))
        }
        Access::None | Access::Revoked => failure(401, "Refresh token expired"),
    }
}

fn forgot_password(state: &mut FakeState, body: &Value) -> ApiResponse {
    let email = str_field(body, "email").to_string();
    if !state.users.iter().any(|u| u.email.eq_ignore_ascii_case(&email)) {
        return failure(404, "User not found");
    }
    state.next_id += 1;
    let otp = format!("{:06}", 482_913 + state.next_id);
    state.otps.insert(email.to_ascii_lowercase(), otp.clone());
    state.last_otp = Some(otp);
    ok(json!({ "message": "OTP sent to your email" }))
}

fn otp_matches(state: &FakeState, body: &Value) -> bool {
    state
        .otps
        .get(&str_field(body, "email").to_ascii_lowercase())
        .is_some_and(|otp| otp == str_field(body, "otp"))
}

fn verify_otp(state: &FakeState, body: &Value) -> ApiResponse {
    if otp_matches(state, body) {
        ok(json!({ "message": "OTP verified" }))
    } else {
        failure(400, "Invalid OTP")
    }
}

fn set_forgot_password(state: &mut FakeState, body: &Value) -> ApiResponse {
    if !otp_matches(state, body) {
        return failure(400, "Invalid OTP");
    }
    let email = str_field(body, "email").to_ascii_lowercase();
    let password = str_field(body, "newPassword").to_string();
    state.otps.remove(&email);
    if let Some(user) = state
        .users
        .iter_mut()
        .find(|u| u.email.eq_ignore_ascii_case(&email))
    {
        user.password = password;
    }
    ok(json!({ "message": "Password updated" }))
}

fn query_u32(request: &ApiRequest, key: &str, default: u32) -> u32 {
    request
        .query_value(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn paginate(items: Vec<Value>, page: u32, limit: u32) -> (Vec<Value>, u32, bool) {
    let limit = limit.max(1) as usize;
    let page = page.max(1) as usize;
    let total_pages = items.len().div_ceil(limit);
    let slice: Vec<Value> = items
        .into_iter()
        .skip((page - 1) * limit)
        .take(limit)
        .collect();
    let total = u32::try_from(total_pages).unwrap_or(u32::MAX);
    (slice, total, page < total_pages)
}

fn product_page(state: &FakeState, request: &ApiRequest) -> ApiResponse {
    let category = request.query_value("category").unwrap_or_default();
    let matching: Vec<Value> = state
        .products
        .iter()
        .filter(|p| {
            category.is_empty()
                || p["category"]
                    .as_str()
                    .is_some_and(|c| c.eq_ignore_ascii_case(category))
        })
        .cloned()
        .collect();
    let (products, _, has_next_page) = paginate(
        matching,
        query_u32(request, "page", 1),
        query_u32(request, "limit", 6),
    );
    ok(json!({ "products": products, "hasNextPage": has_next_page }))
}

fn single_product(state: &FakeState, request: &ApiRequest) -> ApiResponse {
    let id = request.query_value("id").unwrap_or_default();
    state.product(id).map_or_else(
        || failure(404, "Product not found"),
        |product| ok(json!({ "findProduct": product })),
    )
}

fn is_admin_path(path: &str) -> bool {
    path.starts_with("/api/dashboard/") && path != endpoints::ALL_PINCODES
}

fn check_access(state: &FakeState, path: &str) -> Option<ApiResponse> {
    match state.access {
        Access::Valid => {}
        Access::Expired | Access::Revoked => return Some(failure(401, "jwt expired")),
        Access::None => return Some(failure(401, "UnAuthroize request")),
    }
    if is_admin_path(path) && !state.current_user().is_some_and(|u| u.role.is_staff()) {
        return Some(failure(403, "Access denied"));
    }
    None
}

fn protected(state: &mut FakeState, request: &ApiRequest, body: &Value) -> ApiResponse {
    let path = request.path.as_str();
    if let Some(id) = path.strip_prefix(endpoints::DELETE_PRODUCT_PREFIX) {
        return delete_product(state, id);
    }

    match path {
        endpoints::LOGOUT => {
            state.access = Access::None;
            state.current = None;
            ok(json!({ "message": "Logged out" }))
        }
        endpoints::RESET_PASSWORD => reset_password(state, body),
        endpoints::LIKE_LIST => {
            let items: Vec<Value> = state
                .wishlist
                .iter()
                .enumerate()
                .map(|(i, id)| json!({ "_id": format!("like-{i}"), "productId": state.populated(id) }))
                .collect();
            ok(json!({ "likeList": items }))
        }
        endpoints::LIKE_PRODUCT => {
            let id = str_field(body, "productId").to_string();
            if state.product(&id).is_none() {
                return failure(404, "Product not found");
            }
            if !state.wishlist.contains(&id) {
                state.wishlist.push(id);
            }
            ok(json!({ "message": "Product liked" }))
        }
        endpoints::DISLIKE_PRODUCT => {
            let id = str_field(body, "productId");
            state.wishlist.retain(|p| p != id);
            ok(json!({ "message": "Product removed from likes" }))
        }
        endpoints::CART_LIST => {
            let items: Vec<Value> = state
                .cart
                .iter()
                .map(|line| {
                    json!({
                        "_id": line.id,
                        "productId": state.populated(&line.product_id),
                        "size": line.size,
                        "color": line.color,
                        "quantity": line.quantity,
                    })
                })
                .collect();
            ok(json!({ "cartList": items }))
        }
        endpoints::CART_ADD => {
            let id = str_field(body, "productId").to_string();
            if state.product(&id).is_none() {
                return failure(404, "Product not found");
            }
            if !state.cart.iter().any(|l| l.product_id == id) {
                let line_id = state.next_id("cart");
                state.cart.push(CartLine {
                    id: line_id,
                    product_id: id,
                    size: None,
                    color: None,
                    quantity: 1,
                });
            }
            ok(json!({ "message": "Product added to cart" }))
        }
        endpoints::CART_REMOVE => {
            let id = str_field(body, "productId");
            state.cart.retain(|l| l.product_id != id);
            ok(json!({ "message": "Product removed from cart" }))
        }
        endpoints::ADDRESSES => ok(json!({ "addresses": state.addresses })),
        endpoints::ADD_ADDRESS => add_address(state, body),
        endpoints::ALL_PINCODES => ok(json!({ "areas": state.areas })),
        endpoints::PLACE_ORDER => place_order(state, body),
        endpoints::MY_ORDERS => {
            let orders: Vec<Value> = state.orders.iter().map(|o| state.order_json(o)).collect();
            ok(json!({ "orders": orders }))
        }
        endpoints::CANCEL_ORDER => cancel_order(state, body),
        endpoints::ADMIN_STATS => admin_stats(state),
        endpoints::ADMIN_ORDERS => admin_orders(state, request),
        endpoints::ADMIN_PRODUCTS => admin_products(state, request),
        endpoints::ADD_PRODUCT => add_product(state, request),
        endpoints::UPDATE_STOCK => update_stock(state, body),
        endpoints::UPDATE_ORDER_STATUS => update_order_status(state, body),
        endpoints::ADD_PINCODE => add_pincode(state, body),
        endpoints::TOGGLE_PINCODE => toggle_pincode(state, body),
        _ => failure(404, "Route not found"),
    }
}

fn reset_password(state: &mut FakeState, body: &Value) -> ApiResponse {
    let old = str_field(body, "oldPassword").to_string();
    let new = str_field(body, "newPassword").to_string();
    let Some(email) = state.current.clone() else {
        return failure(401, "UnAuthroize request");
    };
    match state.users.iter_mut().find(|u| u.email == email) {
        Some(user) if user.password == old => {
            user.password = new;
            ok(json!({ "message": "Password changed" }))
        }
        Some(_) => failure(400, "Old password is incorrect"),
        None => failure(404, "User not found"),
    }
}

fn add_address(state: &mut FakeState, body: &Value) -> ApiResponse {
    let mut address = match body {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    let id = state.next_id("addr");
    address.insert("_id".to_string(), json!(id));
    address.insert("isDefault".to_string(), json!(state.addresses.is_empty()));
    state.addresses.push(Value::Object(address));
    ok(json!({ "message": "Address added" }))
}

fn unit_price(product: &Value) -> Rupees {
    serde_json::from_value(product["price"].clone()).unwrap_or(Rupees::ZERO)
}

fn place_order(state: &mut FakeState, body: &Value) -> ApiResponse {
    let address_id = str_field(body, "addressId");
    if !state.addresses.iter().any(|a| a["_id"] == address_id) {
        return failure(400, "Address not found");
    }
    let Some(lines) = body.get("items").and_then(Value::as_array).cloned() else {
        return failure(400, "No items");
    };

    let mut items = Vec::new();
    let mut subtotal = Rupees::ZERO;
    for line in &lines {
        let product_id = str_field(line, "productId");
        let Some(product) = state.product(product_id) else {
            return failure(404, "Product not found");
        };
        let quantity = u32::try_from(line["quantity"].as_u64().unwrap_or(1)).unwrap_or(1);
        let price = unit_price(product);
        subtotal = subtotal + price * quantity;
        items.push(json!({
            "productId": product_id,
            "quantity": quantity,
            "size": line.get("size"),
            "color": line.get("color"),
            "price": price,
        }));
    }

    let ordered: Vec<String> = items
        .iter()
        .filter_map(|i| i["productId"].as_str().map(str::to_owned))
        .collect();
    state.cart.retain(|l| !ordered.contains(&l.product_id));

    let id = state.next_id("order");
    let base = DateTime::<Utc>::UNIX_EPOCH + TimeDelta::days(20_454);
    let created = base + TimeDelta::minutes(i64::try_from(state.next_id).unwrap_or_default());
    let order = json!({
        "_id": id,
        "items": items,
        "addressId": address_id,
        "paymentMethod": str_field(body, "paymentMethod"),
        "orderStatus": "pending",
        "totalAmount": subtotal + shipping_for(subtotal),
        "createdAt": created.to_rfc3339(),
        "user": state.current_user().map(FakeUser::to_json),
    });
    state.orders.push(order.clone());
    ok(json!({ "message": "Order placed", "order": order }))
}

fn cancel_order(state: &mut FakeState, body: &Value) -> ApiResponse {
    let id = str_field(body, "orderId");
    let Some(order) = state.orders.iter_mut().find(|o| o["_id"] == id) else {
        return failure(404, "Order not found");
    };
    if order["orderStatus"] != "pending" {
        return failure(400, "Order cannot be cancelled");
    }
    order["orderStatus"] = json!("cancelled");
    ok(json!({ "message": "Order cancelled" }))
}

fn admin_stats(state: &FakeState) -> ApiResponse {
    let status_of = |o: &Value| o["orderStatus"].as_str().unwrap_or_default().to_string();
    let total_sales: Rupees = state
        .orders
        .iter()
        .filter(|o| status_of(o) != "cancelled")
        .map(|o| serde_json::from_value(o["totalAmount"].clone()).unwrap_or(Rupees::ZERO))
        .sum();
    let new_orders = state.orders.iter().filter(|o| status_of(o) == "pending").count();
    let pending_deliveries = state
        .orders
        .iter()
        .filter(|o| matches!(status_of(o).as_str(), "confirmed" | "shipped"))
        .count();
    let active_pincodes = state
        .areas
        .iter()
        .filter(|a| a["DeliveryAvlabelStatus"] == true)
        .count();
    ok(json!({
        "stats": {
            "totalSales": total_sales,
            "newOrders": new_orders,
            "pendingDeliveries": pending_deliveries,
            "activePincodes": active_pincodes,
        }
    }))
}

fn admin_orders(state: &FakeState, request: &ApiRequest) -> ApiResponse {
    let search = request.query_value("search").unwrap_or_default().to_lowercase();
    let matching: Vec<Value> = state
        .orders
        .iter()
        .map(|o| state.order_json(o))
        .filter(|o| {
            search.is_empty()
                || o["_id"].as_str().is_some_and(|id| id.to_lowercase().contains(&search))
                || o["user"]["username"]
                    .as_str()
                    .is_some_and(|u| u.to_lowercase().contains(&search))
        })
        .collect();
    let (orders, total_pages, has_next_page) = paginate(
        matching,
        query_u32(request, "page", 1),
        query_u32(request, "limit", 10),
    );
    ok(json!({ "orders": orders, "totalPages": total_pages, "hasNextPage": has_next_page }))
}

fn admin_products(state: &FakeState, request: &ApiRequest) -> ApiResponse {
    let search = request.query_value("search").unwrap_or_default().to_lowercase();
    let matching: Vec<Value> = state
        .products
        .iter()
        .filter(|p| {
            search.is_empty()
                || p["name"]
                    .as_str()
                    .is_some_and(|n| n.to_lowercase().contains(&search))
        })
        .cloned()
        .collect();
    let (products, total_pages, has_next_page) = paginate(
        matching,
        query_u32(request, "page", 1),
        query_u32(request, "limit", 10),
    );
    ok(json!({ "products": products, "totalPages": total_pages, "hasNextPage": has_next_page }))
}

fn add_product(state: &mut FakeState, request: &ApiRequest) -> ApiResponse {
    let RequestBody::Multipart(form) = &request.body else {
        return failure(400, "Expected multipart form");
    };
    let Some(name) = form.field("name").filter(|n| !n.trim().is_empty()) else {
        return failure(400, "Name is required");
    };
    let price: f64 = form.field("price").and_then(|p| p.parse().ok()).unwrap_or_default();
    let variants: Value = form
        .field("variants")
        .and_then(|v| serde_json::from_str(v).ok())
        .unwrap_or_else(|| json!([]));
    let images: Vec<Value> = form
        .files
        .iter()
        .map(|f| json!({ "url": format!("https://cdn.example.in/{}", f.file_name) }))
        .collect();

    let id = state.next_id("p");
    let product = json!({
        "_id": id,
        "name": name,
        "price": price,
        "mrp": form.field("mrp").and_then(|m| m.parse::<f64>().ok()),
        "category": form.field("category"),
        "subCategory": form.field("subCategory"),
        "description": form.field("description"),
        "images": images,
        "variants": variants,
    });
    state.products.push(product.clone());
    ok(json!({ "message": "Product added", "product": product }))
}

fn update_stock(state: &mut FakeState, body: &Value) -> ApiResponse {
    let product_id = str_field(body, "productId").to_string();
    let color = str_field(body, "color").to_string();
    let size = str_field(body, "size").to_string();
    let stock = body["stock"].as_i64().unwrap_or_default();
    if stock < 0 {
        return failure(400, "Stock cannot be negative");
    }
    let Some(product) = state.product_mut(&product_id) else {
        return failure(404, "Product not found");
    };

    if color.is_empty() && size.is_empty() {
        product["stock"] = json!(stock);
        return ok(json!({ "message": "Stock updated" }));
    }
    let variant = product
        .get_mut("variants")
        .and_then(Value::as_array_mut)
        .and_then(|vs| {
            vs.iter_mut()
                .find(|v| v["color"] == color.as_str() && v["size"] == size.as_str())
        });
    match variant {
        Some(variant) => {
            variant["stock"] = json!(stock);
            ok(json!({ "message": "Stock updated" }))
        }
        None => failure(404, "Variant not found"),
    }
}

fn update_order_status(state: &mut FakeState, body: &Value) -> ApiResponse {
    let id = str_field(body, "orderId");
    let status = str_field(body, "status").to_string();
    match state.orders.iter_mut().find(|o| o["_id"] == id) {
        Some(order) => {
            order["orderStatus"] = json!(status);
            ok(json!({ "message": "Order status updated" }))
        }
        None => failure(404, "Order not found"),
    }
}

fn add_pincode(state: &mut FakeState, body: &Value) -> ApiResponse {
    let pincode = str_field(body, "pincode").trim().to_string();
    if pincode.is_empty() {
        return failure(400, "Pincode is required");
    }
    if state.areas.iter().any(|a| a["pincode"] == pincode.as_str()) {
        return failure(400, "Pincode already exists");
    }
    let id = state.next_id("pin");
    state.areas.push(json!({
        "_id": id,
        "pincode": pincode,
        "city": str_field(body, "city"),
        "state": str_field(body, "state"),
        "DeliveryAvlabelStatus": body["DeliveryAvlabelStatus"].as_bool().unwrap_or(true),
    }));
    ok(json!({ "message": "Pincode added" }))
}

fn toggle_pincode(state: &mut FakeState, body: &Value) -> ApiResponse {
    let pincode = str_field(body, "pincode");
    let Some(area) = state.areas.iter_mut().find(|a| a["pincode"] == pincode) else {
        return failure(404, "Pincode not found");
    };
    area["DeliveryAvlabelStatus"] = json!(body["DeliveryAvlabelStatus"].as_bool().unwrap_or(false));
    ok(json!({ "message": "Delivery status updated" }))
}

fn delete_product(state: &mut FakeState, id: &str) -> ApiResponse {
    let before = state.products.len();
    state.products.retain(|p| p["_id"] != id);
    if state.products.len() == before {
        failure(404, "Product not found")
    } else {
        ok(json!({ "message": "Product deleted" }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_protected_paths_need_a_session() {
        let fake = FakeBackend::new();
        let response = fake.send(&ApiRequest::get(endpoints::CART_LIST)).await.unwrap();
        assert_eq!(response.status, 401);

        fake.grant_session();
        let response = fake.send(&ApiRequest::get(endpoints::CART_LIST)).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.success_flag(), Some(true));
    }

    #[tokio::test]
    async fn test_once_faults_are_consumed() {
        let fake = FakeBackend::new();
        fake.fail_network_once(endpoints::ALL_PRODUCTS);
        let request = ApiRequest::get(endpoints::ALL_PRODUCTS);
        assert!(fake.send(&request).await.is_err());
        assert!(fake.send(&request).await.is_ok());
        assert_eq!(fake.count(endpoints::ALL_PRODUCTS), 2);
    }

    #[tokio::test]
    async fn test_admin_paths_need_staff() {
        let fake = FakeBackend::new();
        fake.grant_session();
        fake.add_user("rajat", "rajat@example.in", TEST_PASSWORD);
        let request = ApiRequest::get(endpoints::ADMIN_STATS);
        assert_eq!(fake.send(&request).await.unwrap().status, 403);

        fake.add_user_with_role("rajat", "rajat@example.in", TEST_PASSWORD, Role::Admin);
        assert_eq!(fake.send(&request).await.unwrap().status, 200);
    }
}
