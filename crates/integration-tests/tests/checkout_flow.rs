//! Checkout from the product page and from the cart.
//!
//! Selections are reconciled against the product's variants on the
//! client; every placement gate must trip before the order request.

#![allow(clippy::unwrap_used)]

use apparel_core::{AddressKind, NewAddress, ProductId, Rupees};
use apparel_integration_tests::{BLOCKED_PINCODE, SERVICEABLE_PINCODE, TestContext};
use apparel_storefront::backend::{RequestBody, endpoints};
use apparel_storefront::services::checkout::{Checkout, CheckoutError, CheckoutSource};

async fn buy_now(
    ctx: &TestContext,
    color: Option<&str>,
    size: Option<&str>,
    quantity: u32,
) -> Checkout {
    let product = ctx
        .storefront
        .details()
        .get(&ProductId::new("tee"))
        .await
        .unwrap();
    ctx.storefront
        .checkout()
        .begin(CheckoutSource::BuyNow {
            product: Box::new(product),
            color: color.map(str::to_owned),
            size: size.map(str::to_owned),
            quantity,
        })
        .await
        .unwrap()
}

fn new_address(pincode: &str) -> NewAddress {
    NewAddress {
        full_name: "Meera Iyer".into(),
        phone: "9876543210".into(),
        alt_phone: String::new(),
        pincode: pincode.into(),
        state: "Maharashtra".into(),
        city: "Mumbai".into(),
        house_no: "4B".into(),
        area: "Colaba".into(),
        landmark: String::new(),
        kind: AddressKind::Work,
    }
}

// =============================================================================
// Variant reconciliation
// =============================================================================

#[tokio::test]
async fn test_requested_quantity_is_clamped_to_stock() {
    let ctx = TestContext::customer().await;
    ctx.fake.seed_address(SERVICEABLE_PINCODE, true);

    let checkout = buy_now(&ctx, Some("Black"), Some("L"), 5).await;
    let line = checkout.lines().first().unwrap();
    assert_eq!(line.stock(), 3);
    assert_eq!(line.quantity(), 3);
    assert!(checkout.validate().is_ok());
}

#[tokio::test]
async fn test_sold_out_variant_cannot_be_ordered() {
    let ctx = TestContext::customer().await;
    ctx.fake.seed_address(SERVICEABLE_PINCODE, true);

    let checkout = buy_now(&ctx, Some("Red"), Some("M"), 1).await;
    let line = checkout.lines().first().unwrap();
    assert_eq!(line.stock(), 0);
    assert!(!line.is_purchasable());

    let err = ctx.storefront.checkout().place_order(&checkout).await.unwrap_err();
    assert!(matches!(err, CheckoutError::OutOfStock(ref name) if name == "Crew Tee"));
    assert_eq!(ctx.fake.count(endpoints::PLACE_ORDER), 0);
}

#[tokio::test]
async fn test_color_switch_rederives_sizes_and_stock() {
    let ctx = TestContext::customer().await;
    let mut checkout = buy_now(&ctx, Some("Red"), Some("S"), 2).await;

    let line = checkout.line_mut(0).unwrap();
    assert_eq!(line.colors(), ["Red", "Blue", "Black"]);
    assert_eq!(line.sizes(), ["S", "M"]);

    assert_eq!(line.select_color("Blue"), None);
    assert_eq!(line.sizes(), ["S"]);
    assert_eq!(line.size(), Some("S"));
    assert_eq!(line.stock(), 5);
    assert_eq!(line.quantity(), 2);
}

#[tokio::test]
async fn test_stale_selection_falls_back_to_first_option() {
    let ctx = TestContext::customer().await;
    let checkout = buy_now(&ctx, Some("Green"), Some("XXL"), 1).await;

    let line = checkout.lines().first().unwrap();
    assert_eq!(line.color(), Some("Red"));
    assert_eq!(line.size(), Some("S"));
    assert_eq!(line.stock(), 2);
}

// =============================================================================
// Pincode gate
// =============================================================================

#[tokio::test]
async fn test_unserviceable_address_blocks_the_order() {
    let ctx = TestContext::customer().await;
    ctx.fake.seed_address(BLOCKED_PINCODE, true);

    let checkout = buy_now(&ctx, Some("Blue"), Some("S"), 1).await;
    let err = ctx.storefront.checkout().place_order(&checkout).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Unserviceable(ref p) if p == BLOCKED_PINCODE));
    assert_eq!(
        err.user_message(),
        format!("Delivery unavailable for Pincode: {BLOCKED_PINCODE}.")
    );
    assert_eq!(ctx.fake.count(endpoints::PLACE_ORDER), 0);
}

#[tokio::test]
async fn test_unserviceable_new_address_is_not_saved() {
    let ctx = TestContext::customer().await;
    let service = ctx.storefront.checkout();
    let mut checkout = buy_now(&ctx, Some("Blue"), Some("S"), 1).await;
    assert!(matches!(
        service.place_order(&checkout).await,
        Err(CheckoutError::NoAddress)
    ));

    let err = service
        .add_address(&mut checkout, &new_address(BLOCKED_PINCODE))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Unserviceable(_)));
    assert_eq!(ctx.fake.count(endpoints::ADD_ADDRESS), 0);

    service
        .add_address(&mut checkout, &new_address(SERVICEABLE_PINCODE))
        .await
        .unwrap();
    assert_eq!(
        checkout.selected_address().map(|a| a.pincode.as_str()),
        Some(SERVICEABLE_PINCODE)
    );
    assert!(service.place_order(&checkout).await.unwrap().is_some());
}

#[tokio::test]
async fn test_unreachable_pincode_list_blocks_every_address() {
    let ctx = TestContext::customer().await;
    ctx.fake.seed_address(SERVICEABLE_PINCODE, true);
    ctx.fake.fail_network_once(endpoints::ALL_PINCODES);

    let checkout = buy_now(&ctx, Some("Blue"), Some("S"), 1).await;
    assert!(!checkout.is_serviceable(SERVICEABLE_PINCODE));
    assert!(ctx.storefront.checkout().place_order(&checkout).await.is_err());
    assert_eq!(ctx.fake.count(endpoints::PLACE_ORDER), 0);
}

// =============================================================================
// Placement
// =============================================================================

#[tokio::test]
async fn test_cart_checkout_places_cod_order_and_empties_cart() {
    let ctx = TestContext::customer().await;
    ctx.fake.seed_address(SERVICEABLE_PINCODE, true);
    ctx.fake.seed_cart_line("tee", Some("Blue"), Some("S"), 2);
    ctx.fake.seed_cart("a");
    let shop = ctx.storefront.shop();
    shop.sync().await.unwrap();

    let service = ctx.storefront.checkout();
    let checkout = service.begin(CheckoutSource::Cart).await.unwrap();
    assert_eq!(checkout.lines().len(), 2);
    let summary = checkout.summary();
    assert_eq!(summary.subtotal, Rupees::from(1797));
    assert_eq!(summary.shipping, Rupees::from(99));
    assert_eq!(summary.total, summary.subtotal + summary.shipping);

    let order_id = service.place_order(&checkout).await.unwrap();
    assert!(order_id.is_some());
    assert_eq!(ctx.fake.order_count(), 1);
    assert!(shop.cart().await.is_empty());

    let request = ctx.fake.requests_to(endpoints::PLACE_ORDER);
    let RequestBody::Json(body) = &request.first().unwrap().body else {
        panic!("order request should be JSON");
    };
    assert_eq!(body["paymentMethod"], "COD");
    assert_eq!(body["items"].as_array().map(Vec::len), Some(2));
    assert!(body.get("productId").is_none());
}

#[tokio::test]
async fn test_signed_out_checkout_is_refused() {
    let ctx = TestContext::new();
    ctx.seed_catalog();
    let err = ctx
        .storefront
        .checkout()
        .begin(CheckoutSource::Cart)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::AuthRequired));
    assert!(ctx.fake.paths().is_empty());
}
