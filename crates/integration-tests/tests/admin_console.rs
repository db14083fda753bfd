//! Staff flows through the admin console.
//!
//! Destructive actions wait in the queue until confirmed; everything the
//! console shows is re-fetched after the backend accepts a change.

#![allow(clippy::unwrap_used)]

use apparel_admin::AdminError;
use apparel_admin::client::{PageQuery, StockUpdate};
use apparel_admin::services::ToastKind;
use apparel_core::{OrderStatus, ProductId};
use apparel_integration_tests::{BLOCKED_PINCODE, SERVICEABLE_PINCODE, TestContext};
use apparel_storefront::backend::endpoints;
use apparel_storefront::services::checkout::CheckoutSource;

async fn place_order(ctx: &TestContext) {
    ctx.fake.seed_address(SERVICEABLE_PINCODE, true);
    ctx.fake.seed_cart("a");
    let service = ctx.storefront.checkout();
    let checkout = service.begin(CheckoutSource::Cart).await.unwrap();
    service.place_order(&checkout).await.unwrap();
}

#[tokio::test]
async fn test_customer_cannot_use_console() {
    let ctx = TestContext::customer().await;
    let console = apparel_admin::AdminConsole::for_storefront(&ctx.storefront);

    let err = console.load_orders(PageQuery::default()).await.unwrap_err();
    assert!(matches!(err, AdminError::NotStaff));
    assert_eq!(ctx.fake.count(endpoints::ADMIN_ORDERS), 0);
}

#[tokio::test]
async fn test_status_change_waits_for_confirmation() {
    let (ctx, console) = TestContext::admin().await;
    place_order(&ctx).await;
    let tracker = ctx.storefront.orders();
    tracker.refresh().await.unwrap();

    let orders = console.load_orders(PageQuery::default()).await.unwrap();
    let order = orders.items.first().unwrap().clone();
    assert_eq!(order.status, OrderStatus::Pending);

    let pending = console
        .request_status_change(&order, OrderStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(
        pending.action.describe(),
        format!("Change order {} from pending to confirmed?", order.id)
    );
    assert_eq!(console.pending_actions().await.len(), 1);
    assert_eq!(ctx.fake.count(endpoints::UPDATE_ORDER_STATUS), 0);

    console.confirm(pending.id).await.unwrap();
    assert!(console.pending_actions().await.is_empty());
    assert_eq!(
        ctx.fake.order_status(order.id.as_str()),
        Some(OrderStatus::Confirmed)
    );
    assert_eq!(
        console.orders().await.items.first().map(|o| o.status),
        Some(OrderStatus::Confirmed)
    );
    assert_eq!(
        console.dashboard().latest().await.map(|s| s.pending_deliveries),
        Some(1)
    );

    let changes = tracker.refresh().await.unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes.first().map(|c| c.to), Some(OrderStatus::Confirmed));
}

#[tokio::test]
async fn test_skipped_status_step_is_refused_up_front() {
    let (ctx, console) = TestContext::admin().await;
    place_order(&ctx).await;
    let orders = console.load_orders(PageQuery::default()).await.unwrap();
    let order = orders.items.first().unwrap().clone();

    let pending = console
        .request_status_change(&order, OrderStatus::Delivered)
        .await;
    assert!(matches!(pending, Err(AdminError::Transition(_))));
    assert!(console.pending_actions().await.is_empty());

    let toasts = console.toasts().active().await;
    assert_eq!(toasts.last().map(|t| t.kind), Some(ToastKind::Error));
    assert_eq!(ctx.fake.count(endpoints::UPDATE_ORDER_STATUS), 0);
}

#[tokio::test]
async fn test_dismissed_delete_keeps_product() {
    let (ctx, console) = TestContext::admin().await;
    let product = ctx
        .storefront
        .details()
        .get(&ProductId::new("b"))
        .await
        .unwrap();

    let pending = console.request_delete(&product).await.unwrap();
    console.dismiss(pending.id).await.unwrap();
    assert!(ctx.fake.product_json("b").is_some());
    assert!(matches!(
        console.confirm(pending.id).await,
        Err(AdminError::NoPendingAction(_))
    ));

    let pending = console.request_delete(&product).await.unwrap();
    console.confirm(pending.id).await.unwrap();
    assert!(ctx.fake.product_json("b").is_none());
    assert!(
        console
            .products()
            .await
            .items
            .iter()
            .all(|p| p.id.as_str() != "b")
    );

    let kinds: Vec<ToastKind> = console
        .toasts()
        .active()
        .await
        .iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        kinds,
        [ToastKind::Info, ToastKind::Error, ToastKind::Success]
    );
}

#[tokio::test]
async fn test_stock_update_reaches_checkout() {
    let (ctx, console) = TestContext::admin().await;
    ctx.fake.seed_address(SERVICEABLE_PINCODE, true);

    console
        .update_stock(&StockUpdate {
            product_id: ProductId::new("tee"),
            color: Some("Red".into()),
            size: Some("M".into()),
            stock: 4,
        })
        .await
        .unwrap();
    ctx.storefront
        .details()
        .invalidate(&ProductId::new("tee"))
        .await;

    let product = ctx
        .storefront
        .details()
        .get(&ProductId::new("tee"))
        .await
        .unwrap();
    let checkout = ctx
        .storefront
        .checkout()
        .begin(CheckoutSource::BuyNow {
            product: Box::new(product),
            color: Some("Red".into()),
            size: Some("M".into()),
            quantity: 6,
        })
        .await
        .unwrap();
    assert_eq!(checkout.lines().first().map(|l| l.quantity()), Some(4));
}

#[tokio::test]
async fn test_enabling_pincode_opens_delivery() {
    let (ctx, console) = TestContext::admin().await;
    ctx.fake.seed_address(BLOCKED_PINCODE, true);

    let areas = console.load_pincodes().await.unwrap();
    assert_eq!(areas.active_count(), 1);
    assert!(!areas.is_serviceable(BLOCKED_PINCODE));

    let pending = console
        .request_pincode_delivery(BLOCKED_PINCODE, true)
        .await
        .unwrap();
    assert_eq!(
        pending.action.describe(),
        format!("Enable delivery to {BLOCKED_PINCODE}?")
    );
    console.confirm(pending.id).await.unwrap();
    assert_eq!(console.pincodes().await.active_count(), 2);

    ctx.fake.seed_cart("c");
    let service = ctx.storefront.checkout();
    let checkout = service.begin(CheckoutSource::Cart).await.unwrap();
    assert!(checkout.validate().is_ok());
    assert!(service.place_order(&checkout).await.unwrap().is_some());
}
