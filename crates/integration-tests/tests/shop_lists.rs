//! Wishlist and cart toggles against the fake backend.
//!
//! Each toggle flips local state before the request and re-fetches the
//! list afterwards, so once a call returns the local list must match the
//! server's.

#![allow(clippy::unwrap_used)]

use apparel_core::ProductId;
use apparel_integration_tests::TestContext;
use apparel_storefront::backend::endpoints;
use apparel_storefront::services::shop::ShopError;

// =============================================================================
// Wishlist
// =============================================================================

#[tokio::test]
async fn test_wishlist_add_then_remove() {
    let ctx = TestContext::customer().await;
    let shop = ctx.storefront.shop();
    let id = ProductId::new("a");
    shop.sync().await.unwrap();
    assert!(shop.wishlist().await.is_empty());

    assert!(shop.toggle_like(&id).await.unwrap());
    let wishlist = shop.wishlist().await;
    let visible: Vec<_> = wishlist.visible().map(|(_, p)| p.name.clone()).collect();
    assert_eq!(visible, ["A"]);
    assert!(wishlist.entries().iter().all(|e| !e.is_placeholder()));
    assert_eq!(ctx.fake.wishlist_ids(), ["a"]);

    assert!(!shop.toggle_like(&id).await.unwrap());
    assert!(shop.wishlist().await.is_empty());
    assert!(ctx.fake.wishlist_ids().is_empty());

    assert_eq!(ctx.fake.count(endpoints::LIKE_PRODUCT), 1);
    assert_eq!(ctx.fake.count(endpoints::DISLIKE_PRODUCT), 1);
}

#[tokio::test]
async fn test_toggle_twice_restores_membership() {
    let ctx = TestContext::customer().await;
    let shop = ctx.storefront.shop();
    ctx.fake.seed_wishlist("c");
    shop.sync().await.unwrap();

    for id in ["a", "c"] {
        let id = ProductId::new(id);
        let before = shop.is_liked(&id).await;

        let first = shop.toggle_like(&id).await.unwrap();
        assert_eq!(first, !before);
        let second = shop.toggle_like(&id).await.unwrap();
        assert_eq!(second, before);

        assert_eq!(shop.is_liked(&id).await, before);
        assert_eq!(
            ctx.fake.wishlist_ids().contains(&id.as_str().to_string()),
            before
        );
    }
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_cart_toggle_settles_to_server_state() {
    let ctx = TestContext::customer().await;
    let shop = ctx.storefront.shop();
    let id = ProductId::new("b");

    assert!(shop.add_to_cart(&id).await.unwrap());
    assert!(shop.is_in_cart(&id).await);
    assert_eq!(ctx.fake.cart_ids(), ["b"]);

    assert!(!shop.add_to_cart(&id).await.unwrap());
    assert!(!shop.is_in_cart(&id).await);
    assert!(ctx.fake.cart_ids().is_empty());
}

#[tokio::test]
async fn test_rejected_add_is_rolled_back() {
    let ctx = TestContext::customer().await;
    let shop = ctx.storefront.shop();
    ctx.fake
        .reject_once(endpoints::CART_ADD, 500, "Product is out of stock");

    let err = shop.add_to_cart(&ProductId::new("d")).await.unwrap_err();
    assert_eq!(err.user_message(), "Product is out of stock");
    assert!(!shop.is_in_cart(&ProductId::new("d")).await);
    assert!(ctx.fake.cart_ids().is_empty());
}

#[tokio::test]
async fn test_signed_out_toggle_prompts_and_sends_nothing() {
    let ctx = TestContext::new();
    ctx.seed_catalog();
    let shop = ctx.storefront.shop();

    let err = shop.add_to_cart(&ProductId::new("a")).await.unwrap_err();
    assert!(matches!(err, ShopError::AuthRequired));
    assert!(ctx.storefront.auth().prompt().await.visible);
    assert!(ctx.fake.paths().is_empty());
}

#[tokio::test]
async fn test_concurrent_toggles_end_in_agreement() {
    let ctx = TestContext::customer().await;
    let shop = ctx.storefront.shop();
    let a = ProductId::new("a");
    let c = ProductId::new("c");

    let (first, second, third) = tokio::join!(
        shop.toggle_like(&a),
        shop.toggle_like(&c),
        shop.toggle_like(&a)
    );
    first.unwrap();
    second.unwrap();
    third.unwrap();

    shop.sync().await.unwrap();
    for id in [&a, &c] {
        assert_eq!(
            shop.is_liked(id).await,
            ctx.fake.wishlist_ids().contains(&id.as_str().to_string())
        );
    }
}
