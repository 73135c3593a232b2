mod common;

use std::sync::Arc;

use async_trait::async_trait;
use marketplace_api::{
    dto::{
        cart::AddToCartRequest,
        orders::{CheckoutRequest, OrderLineRequest, PlaceOrderRequest},
        products::UpdateProductRequest,
    },
    entity::{
        notifications::{Column as NotifCol, Entity as Notifications},
        order_items::Entity as OrderItems,
        orders::Entity as Orders,
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    models::Notification,
    services::{
        cart_service,
        notification_service::{NewNotification, NotificationSink},
        order_service, product_service,
    },
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use common::{create_product, create_user, setup_state};

fn line(product_id: Uuid, quantity: Option<i32>) -> OrderLineRequest {
    OrderLineRequest {
        product_id,
        quantity,
    }
}

async fn stock_of(state: &marketplace_api::state::AppState, id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {id} missing"))?;
    Ok(product.stock)
}

struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn notify(&self, _notification: NewNotification) -> AppResult<Notification> {
        Err(AppError::Internal(anyhow::anyhow!("sink offline")))
    }
}

#[tokio::test]
async fn place_order_snapshots_prices_and_debits_stock() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "user", "buyer@example.com").await?;
    let cream = create_product(&state, "Face cream", 1000, 10, "skincare").await?;
    let serum = create_product(&state, "Serum", 1500, 5, "skincare").await?;

    let resp = order_service::place_order(
        &state,
        &user,
        PlaceOrderRequest {
            items: vec![line(cream.id, None), line(serum.id, Some(1))],
            payment_method: Some("card".into()),
        },
    )
    .await?;
    assert_eq!(resp.message, "Order placed");

    let placed = resp.data.expect("order data");
    assert_eq!(placed.order.total_amount, 2500);
    assert_eq!(placed.order.status, "pending");
    assert_eq!(placed.order.user_id, user.user_id);
    assert_eq!(placed.order.payment_method.as_deref(), Some("card"));
    assert!(placed.order.invoice_number.starts_with("INV-"));
    assert_eq!(placed.items.len(), 2);
    assert!(placed.items.iter().all(|item| item.quantity == 1));
    let prices: i64 = placed.items.iter().map(|item| item.price).sum();
    assert_eq!(prices, 2500);

    assert_eq!(stock_of(&state, cream.id).await?, 9);
    assert_eq!(stock_of(&state, serum.id).await?, 4);

    let notes = Notifications::find()
        .filter(NotifCol::UserId.eq(user.user_id))
        .all(&state.orm)
        .await?;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, "success");
    assert!(notes[0].message.contains("25.00"));
    assert!(notes[0].message.contains(&placed.order.invoice_number));
    assert!(!notes[0].is_read);
    Ok(())
}

#[tokio::test]
async fn repeated_products_merge_into_one_line() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "user", "merge@example.com").await?;
    let mascara = create_product(&state, "Mascara", 1200, 10, "makeup").await?;

    let placed = order_service::place_order(
        &state,
        &user,
        PlaceOrderRequest {
            items: vec![line(mascara.id, Some(1)), line(mascara.id, Some(2))],
            payment_method: None,
        },
    )
    .await?
    .data
    .expect("order data");

    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].quantity, 3);
    assert_eq!(placed.order.total_amount, 3600);
    assert_eq!(stock_of(&state, mascara.id).await?, 7);
    Ok(())
}

#[tokio::test]
async fn empty_order_is_rejected_without_writes() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "user", "empty@example.com").await?;

    let result = order_service::place_order(
        &state,
        &user,
        PlaceOrderRequest {
            items: Vec::new(),
            payment_method: None,
        },
    )
    .await;

    assert!(matches!(result, Err(AppError::EmptyOrder)));
    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    assert_eq!(Notifications::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn unknown_product_aborts_the_whole_order() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "user", "unknown@example.com").await?;
    let lipstick = create_product(&state, "Lipstick", 850, 10, "makeup").await?;

    let result = order_service::place_order(
        &state,
        &user,
        PlaceOrderRequest {
            items: vec![line(lipstick.id, Some(2)), line(Uuid::new_v4(), Some(1))],
            payment_method: None,
        },
    )
    .await;

    assert!(matches!(result, Err(AppError::ProductsNotFound)));
    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    assert_eq!(OrderItems::find().count(&state.orm).await?, 0);
    assert_eq!(stock_of(&state, lipstick.id).await?, 10);
    assert_eq!(Notifications::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn insufficient_stock_rolls_back() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "user", "stock@example.com").await?;
    let oil = create_product(&state, "Hair oil", 2200, 10, "haircare").await?;
    let rare = create_product(&state, "Rare perfume", 9900, 1, "fragrance").await?;

    let result = order_service::place_order(
        &state,
        &user,
        PlaceOrderRequest {
            items: vec![line(oil.id, Some(3)), line(rare.id, Some(2))],
            payment_method: None,
        },
    )
    .await;

    match result {
        Err(AppError::InsufficientStock(id)) => assert_eq!(id, rare.id),
        other => panic!("expected insufficient stock, got {other:?}"),
    }
    // The oil line was already debited when the perfume debit was refused.
    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    assert_eq!(OrderItems::find().count(&state.orm).await?, 0);
    assert_eq!(stock_of(&state, oil.id).await?, 10);
    assert_eq!(stock_of(&state, rare.id).await?, 1);
    Ok(())
}

#[tokio::test]
async fn merged_lines_are_debited_as_one_quantity() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "user", "merged@example.com").await?;
    let balm = create_product(&state, "Lip balm", 400, 3, "skincare").await?;

    let result = order_service::place_order(
        &state,
        &user,
        PlaceOrderRequest {
            items: vec![line(balm.id, Some(2)), line(balm.id, Some(2))],
            payment_method: None,
        },
    )
    .await;

    match result {
        Err(AppError::InsufficientStock(id)) => assert_eq!(id, balm.id),
        other => panic!("expected insufficient stock, got {other:?}"),
    }
    assert_eq!(stock_of(&state, balm.id).await?, 3);

    let placed = order_service::place_order(
        &state,
        &user,
        PlaceOrderRequest {
            items: vec![line(balm.id, Some(1)), line(balm.id, Some(2))],
            payment_method: None,
        },
    )
    .await?
    .data
    .expect("order data");
    assert_eq!(placed.items[0].quantity, 3);
    assert_eq!(stock_of(&state, balm.id).await?, 0);
    Ok(())
}

#[tokio::test]
async fn order_snapshot_survives_price_change() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = create_user(&state, "admin", "admin@example.com").await?;
    let user = create_user(&state, "user", "snapshot@example.com").await?;
    let cream = create_product(&state, "Face cream", 1000, 10, "skincare").await?;

    let placed = order_service::place_order(
        &state,
        &user,
        PlaceOrderRequest {
            items: vec![line(cream.id, Some(2))],
            payment_method: None,
        },
    )
    .await?
    .data
    .expect("order data");

    cart_service::add_to_cart(
        &state,
        &user,
        AddToCartRequest {
            product_id: cream.id,
            quantity: 2,
        },
    )
    .await?;

    let repriced = product_service::update_product(
        &state,
        &admin,
        cream.id,
        UpdateProductRequest {
            price: Some(9999),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("product");
    assert_eq!(repriced.price, 9999);

    let order = order_service::get_order(&state, &user, placed.order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(order.order.total_amount, 2000);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].price, 1000);

    let cart = cart_service::get_cart(&state, &user).await?.data.expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].price, 2000);
    assert_eq!(cart.items[0].product.price, 9999);
    assert_eq!(cart.total, 2000);
    Ok(())
}

#[tokio::test]
async fn non_positive_quantity_is_rejected() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "user", "zero@example.com").await?;
    let cream = create_product(&state, "Face cream", 1000, 10, "skincare").await?;

    let result = order_service::place_order(
        &state,
        &user,
        PlaceOrderRequest {
            items: vec![line(cream.id, Some(0))],
            payment_method: None,
        },
    )
    .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn placing_an_order_clears_the_cart() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "user", "cart@example.com").await?;
    let cream = create_product(&state, "Face cream", 1000, 10, "skincare").await?;
    let serum = create_product(&state, "Serum", 1500, 10, "skincare").await?;

    cart_service::add_to_cart(
        &state,
        &user,
        AddToCartRequest {
            product_id: serum.id,
            quantity: 2,
        },
    )
    .await?;

    order_service::place_order(
        &state,
        &user,
        PlaceOrderRequest {
            items: vec![line(cream.id, Some(1))],
            payment_method: None,
        },
    )
    .await?;

    let cart = cart_service::get_cart(&state, &user).await?.data.expect("cart");
    assert!(cart.items.is_empty());
    assert_eq!(cart.total, 0);
    Ok(())
}

#[tokio::test]
async fn failing_notification_sink_does_not_fail_the_order() -> anyhow::Result<()> {
    let state = setup_state().await?.with_notifier(Arc::new(FailingSink));
    let user = create_user(&state, "user", "sink@example.com").await?;
    let cream = create_product(&state, "Face cream", 1000, 10, "skincare").await?;

    cart_service::add_to_cart(
        &state,
        &user,
        AddToCartRequest {
            product_id: cream.id,
            quantity: 1,
        },
    )
    .await?;

    let placed = order_service::place_order(
        &state,
        &user,
        PlaceOrderRequest {
            items: vec![line(cream.id, Some(2))],
            payment_method: None,
        },
    )
    .await?
    .data
    .expect("order data");

    assert_eq!(placed.order.total_amount, 2000);
    assert_eq!(Orders::find().count(&state.orm).await?, 1);
    assert_eq!(Notifications::find().count(&state.orm).await?, 0);
    assert_eq!(stock_of(&state, cream.id).await?, 8);

    // Later post-commit actions still run.
    let cart = cart_service::get_cart(&state, &user).await?.data.expect("cart");
    assert!(cart.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn checkout_orders_the_cart_contents() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "user", "checkout@example.com").await?;
    let cream = create_product(&state, "Face cream", 1000, 10, "skincare").await?;
    let serum = create_product(&state, "Serum", 1500, 10, "skincare").await?;

    for (product_id, quantity) in [(cream.id, 2), (serum.id, 1)] {
        cart_service::add_to_cart(
            &state,
            &user,
            AddToCartRequest {
                product_id,
                quantity,
            },
        )
        .await?;
    }

    let resp = order_service::checkout(
        &state,
        &user,
        CheckoutRequest {
            payment_method: Some("cash".into()),
        },
    )
    .await?;
    assert_eq!(resp.message, "Checkout success");

    let placed = resp.data.expect("order data");
    assert_eq!(placed.order.total_amount, 3500);
    assert_eq!(placed.items.len(), 2);
    assert_eq!(stock_of(&state, cream.id).await?, 8);
    assert_eq!(stock_of(&state, serum.id).await?, 9);

    let cart = cart_service::get_cart(&state, &user).await?.data.expect("cart");
    assert!(cart.items.is_empty());

    let again = order_service::checkout(&state, &user, CheckoutRequest::default()).await;
    assert!(matches!(again, Err(AppError::EmptyOrder)));
    Ok(())
}

#[tokio::test]
async fn orders_are_scoped_to_their_owner() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let owner = create_user(&state, "user", "owner@example.com").await?;
    let other = create_user(&state, "user", "other@example.com").await?;
    let cream = create_product(&state, "Face cream", 1000, 10, "skincare").await?;

    let placed = order_service::place_order(
        &state,
        &owner,
        PlaceOrderRequest {
            items: vec![line(cream.id, Some(1))],
            payment_method: None,
        },
    )
    .await?
    .data
    .expect("order data");

    let found = order_service::get_order(&state, &owner, placed.order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(found.items.len(), 1);

    let hidden = order_service::get_order(&state, &other, placed.order.id).await;
    assert!(matches!(hidden, Err(AppError::NotFound)));

    let listed = order_service::list_orders(&state, &other, Default::default())
        .await?
        .data
        .expect("orders");
    assert!(listed.items.is_empty());

    let listed = order_service::list_orders(&state, &owner, Default::default())
        .await?;
    assert_eq!(listed.meta.and_then(|m| m.total), Some(1));
    Ok(())
}
