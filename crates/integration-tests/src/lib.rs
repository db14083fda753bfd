//! End-to-end scenarios for the apparel storefront client.
//!
//! Every scenario drives a full [`Storefront`] (and, for staff flows, an
//! [`AdminConsole`]) against the in-process `FakeBackend`, so the session
//! protocol, optimistic lists, checkout and admin actions run exactly as
//! they do against the real API.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p apparel-integration-tests
//! ```
//!
//! # Test Files
//!
//! - `shop_lists` - Wishlist and cart toggles
//! - `catalog_paging` - Category switching and paging
//! - `checkout_flow` - Variant reconciliation and placement gates
//! - `session_refresh` - Refresh-and-retry bounds
//! - `order_tracking` - Timeline and cancellation
//! - `admin_console` - Staff actions with confirmation

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc)]

use std::sync::Arc;

use apparel_admin::AdminConsole;
use apparel_core::Role;
use apparel_storefront::Storefront;
use apparel_storefront::config::StorefrontConfig;
use apparel_storefront::storage::{LocalStore, MemoryStore};
use apparel_storefront::testing::FakeBackend;
use serde_json::json;
use url::Url;

/// Pincode the seeded catalog delivers to.
pub const SERVICEABLE_PINCODE: &str = "301001";
/// Pincode that is listed but switched off.
pub const BLOCKED_PINCODE: &str = "400001";

/// A storefront wired to a fresh fake backend.
pub struct TestContext {
    pub fake: FakeBackend,
    pub storefront: Storefront,
}

impl TestContext {
    /// Signed-out storefront over an empty backend.
    #[must_use]
    pub fn new() -> Self {
        let fake = FakeBackend::new();
        let config = StorefrontConfig::with_api_url(
            Url::parse("http://localhost:8000").unwrap_or_else(|_| unreachable!()),
        );
        let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
        let storefront = Storefront::new(config, fake.transport(), store);
        Self { fake, storefront }
    }

    /// Storefront over the seeded catalog, signed in as a customer.
    pub async fn customer() -> Self {
        let ctx = Self::new();
        ctx.seed_catalog();
        ctx.fake.sign_in(ctx.storefront.auth()).await;
        ctx
    }

    /// Storefront over the seeded catalog, signed in as staff.
    pub async fn admin() -> (Self, AdminConsole) {
        let ctx = Self::new();
        ctx.seed_catalog();
        ctx.fake.sign_in_as(ctx.storefront.auth(), Role::Admin).await;
        let console = AdminConsole::for_storefront(&ctx.storefront);
        (ctx, console)
    }

    /// Two men's and two women's products, a variant tee, and the two
    /// delivery pincodes.
    pub fn seed_catalog(&self) {
        for (id, name, category) in [
            ("a", "A", "men"),
            ("b", "B", "men"),
            ("c", "C", "women"),
            ("d", "D", "women"),
        ] {
            self.fake.add_product_json(json!({
                "_id": id, "name": name, "price": 799, "category": category
            }));
        }
        self.fake.add_product_json(json!({
            "_id": "tee",
            "name": "Crew Tee",
            "price": 499,
            "category": "unisex",
            "variants": [
                {"color": "Red", "size": "S", "stock": 2},
                {"color": "Red", "size": "M", "stock": 0},
                {"color": "Blue", "size": "S", "stock": 5},
                {"color": "Black", "size": "L", "stock": 3}
            ]
        }));
        self.fake
            .add_area(SERVICEABLE_PINCODE, "Alwar", "Rajasthan", true);
        self.fake
            .add_area(BLOCKED_PINCODE, "Mumbai", "Maharashtra", false);
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
