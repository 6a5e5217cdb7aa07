//! End-to-end checkout tests.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;

use chrono::Utc;
use serde_json::Value;
use sneakersku_core::{Money, NewCartLine, ProductId, UserId};
use sneakersku_integration_tests::{
    ADMIN_TOKEN, TestContext, USER_1_TOKEN, USER_2_TOKEN, error_code, money,
};

#[tokio::test]
async fn test_checkout_creates_order_and_empties_cart() {
    let ctx = TestContext::new();
    ctx.add_item(USER_1_TOKEN, 2, "M", 1).await;

    let (status, body) = ctx.checkout(USER_1_TOKEN, 1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Checkout successful");
    assert!(body["order_id"].as_i64().is_some());

    let orders = ctx.orders.orders();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.total_amount, Money::from_units(50));
    assert_eq!(order.line_items.len(), 1);
    assert_eq!(order.line_items[0].display_name, "Court Low - M");
    assert_eq!(order.user_id, UserId::new("user-1"));
    assert_eq!(i64::from(order.id.as_i32()), body["order_id"].as_i64().unwrap());

    let (_, cart) = ctx.get_cart(USER_1_TOKEN).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_order_total_is_the_cart_snapshot() {
    let ctx = TestContext::new();
    ctx.add_item(USER_1_TOKEN, 1, "42-red", 2).await;
    ctx.add_item(USER_1_TOKEN, 1, "44-blue", 1).await;
    ctx.catalog
        .set_base_price(sneakersku_core::ProductId::new(1), Money::from_units(1));

    let (status, _) = ctx.checkout(USER_1_TOKEN, 1).await;
    assert_eq!(status, StatusCode::OK);

    let order = ctx.orders.orders().pop().unwrap();
    assert_eq!(order.total_amount, Money::from_units(320));
    let line_sum: Money = order.line_items.iter().map(|item| item.line_total).sum();
    assert_eq!(line_sum, order.total_amount);
}

#[tokio::test]
async fn test_someone_elses_address_is_invalid() {
    let ctx = TestContext::new();
    ctx.add_item(USER_1_TOKEN, 2, "M", 1).await;

    // Address 2 exists but belongs to user-2; 999 does not exist at all.
    for address_id in [2, 999] {
        let (status, body) = ctx.checkout(USER_1_TOKEN, address_id).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "INVALID_ADDRESS");
    }

    assert!(ctx.orders.orders().is_empty());
    let (_, cart) = ctx.get_cart(USER_1_TOKEN).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_second_checkout_creates_no_second_order() {
    let ctx = TestContext::new();
    ctx.add_item(USER_1_TOKEN, 2, "M", 1).await;

    let (status, _) = ctx.checkout(USER_1_TOKEN, 1).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx.checkout(USER_1_TOKEN, 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "EMPTY_CART");
    assert_eq!(ctx.orders.orders().len(), 1);
}

#[tokio::test]
async fn test_lingering_cart_reconciles_to_prior_order() {
    let ctx = TestContext::new();
    ctx.add_item(USER_1_TOKEN, 2, "M", 2).await;

    // Every post-commit delete attempt fails.
    ctx.carts.fail_next_deletes(ctx.state.retry().attempts);
    let (status, first) = ctx.checkout(USER_1_TOKEN, 1).await;
    assert_eq!(status, StatusCode::OK);

    let (_, cart) = ctx.get_cart(USER_1_TOKEN).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1, "cart lingers");

    let (status, second) = ctx.checkout(USER_1_TOKEN, 1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["order_id"], second["order_id"]);
    assert_eq!(ctx.orders.creates(), 1);

    let (_, cart) = ctx.get_cart(USER_1_TOKEN).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_single_failed_delete_is_retried() {
    let ctx = TestContext::new();
    ctx.add_item(USER_1_TOKEN, 2, "M", 1).await;
    ctx.carts.fail_next_deletes(1);

    let (status, _) = ctx.checkout(USER_1_TOKEN, 1).await;
    assert_eq!(status, StatusCode::OK);

    let (_, cart) = ctx.get_cart(USER_1_TOKEN).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_concurrent_checkouts_produce_one_order() {
    let ctx = TestContext::new();
    ctx.add_item(USER_1_TOKEN, 1, "42-red", 1).await;

    let (a, b) = tokio::join!(ctx.checkout(USER_1_TOKEN, 1), ctx.checkout(USER_1_TOKEN, 1));
    let mut statuses = [a.0, b.0];
    statuses.sort();

    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);
    assert_eq!(ctx.orders.orders().len(), 1);
}

/// Quantity of a product variant in a list of cart items or order line items.
fn quantity_of(items: &[Value], product_id: i64, variant_key: &str) -> u64 {
    items
        .iter()
        .filter(|item| {
            let id = item.get("shoe_id").or_else(|| item.get("product_id"));
            id.and_then(Value::as_i64) == Some(product_id) && item["variant_key"] == variant_key
        })
        .map(|item| item["quantity"].as_u64().unwrap())
        .sum()
}

#[tokio::test]
async fn test_add_racing_checkout_is_never_lost() {
    for _ in 0..25 {
        let ctx = TestContext::new();
        ctx.add_item(USER_1_TOKEN, 1, "42-red", 2).await;

        let (checkout, added) = tokio::join!(
            ctx.checkout(USER_1_TOKEN, 1),
            ctx.add_item(USER_1_TOKEN, 2, "M", 1)
        );
        assert_eq!(checkout.0, StatusCode::OK);
        assert_eq!(added.0, StatusCode::OK);

        let orders = ctx.orders.orders();
        assert_eq!(orders.len(), 1);
        let ordered = serde_json::to_value(&orders[0].line_items).unwrap();
        let ordered = ordered.as_array().unwrap();
        let (_, cart) = ctx.get_cart(USER_1_TOKEN).await;
        let in_cart = cart["items"].as_array().unwrap();

        assert_eq!(
            quantity_of(ordered, 2, "M") + quantity_of(in_cart, 2, "M"),
            1,
            "the concurrently added item must be ordered or still in the cart"
        );
        assert_eq!(quantity_of(ordered, 1, "42-red"), 2);
        assert_eq!(quantity_of(in_cart, 1, "42-red"), 0);
    }
}

#[tokio::test]
async fn test_item_written_outside_the_lock_survives_checkout() {
    let ctx = TestContext::new();
    ctx.add_item(USER_1_TOKEN, 1, "42-red", 2).await;

    // Another process adds an item between the order insert and the delete.
    let mut changed = ctx.carts.stored("user-1").await.unwrap();
    changed
        .add_line(
            NewCartLine {
                product_id: ProductId::new(2),
                variant_key: "M".to_string(),
                quantity: 1,
                unit_price: Money::from_units(50),
                display_name: "Court Low - M".to_string(),
            },
            Utc::now(),
        )
        .unwrap();
    ctx.carts.write_before_next_delete(changed);

    let (status, _) = ctx.checkout(USER_1_TOKEN, 1).await;
    assert_eq!(status, StatusCode::OK);

    let order = ctx.orders.orders().pop().unwrap();
    assert_eq!(order.line_items.len(), 1);
    assert_eq!(order.total_amount, Money::from_units(200));

    let (_, cart) = ctx.get_cart(USER_1_TOKEN).await;
    let items = cart["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["variant_key"], "M");
    assert_eq!(money(&cart["total"]), Decimal::from(50));

    // The carried-over cart is a new cart and checks out as a new order.
    let (status, _) = ctx.checkout(USER_1_TOKEN, 1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctx.orders.creates(), 2);
    assert_eq!(ctx.orders.orders()[1].total_amount, Money::from_units(50));
}

#[tokio::test]
async fn test_order_history_is_per_user_newest_first() {
    let ctx = TestContext::new();

    ctx.add_item(USER_1_TOKEN, 2, "M", 1).await;
    ctx.checkout(USER_1_TOKEN, 1).await;
    ctx.add_item(USER_1_TOKEN, 1, "42-red", 1).await;
    ctx.checkout(USER_1_TOKEN, 1).await;

    let (status, body) = ctx
        .request(Method::GET, "/orders", Some(USER_1_TOKEN), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let orders = body.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(money(&orders[0]["total_amount"]), Decimal::from(100));
    assert_eq!(money(&orders[1]["total_amount"]), Decimal::from(50));

    let (_, body) = ctx
        .request(Method::GET, "/orders", Some(USER_2_TOKEN), None)
        .await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_can_use_cart_routes() {
    let ctx = TestContext::new();

    let (status, body) = ctx.add_item(ADMIN_TOKEN, 2, "M", 1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "admin-1");
}
