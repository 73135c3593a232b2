mod common;

use marketplace_api::{
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    entity::{carts::Entity as Carts, cart_items::Entity as CartItems},
    error::AppError,
    services::cart_service,
};
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;

use common::{create_product, create_user, setup_state};

fn add(product_id: Uuid, quantity: i32) -> AddToCartRequest {
    AddToCartRequest {
        product_id,
        quantity,
    }
}

#[tokio::test]
async fn empty_cart_is_returned_for_new_users() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "user", "new@example.com").await?;

    let cart = cart_service::get_cart(&state, &user).await?.data.expect("cart");
    assert!(cart.id.is_none());
    assert_eq!(cart.user_id, user.user_id);
    assert!(cart.items.is_empty());
    assert_eq!(cart.total, 0);
    assert_eq!(Carts::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn adding_twice_accumulates_until_stock_runs_out() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "user", "acc@example.com").await?;
    let cream = create_product(&state, "Face cream", 1000, 5, "skincare").await?;

    cart_service::add_to_cart(&state, &user, add(cream.id, 2)).await?;
    let item = cart_service::add_to_cart(&state, &user, add(cream.id, 2))
        .await?
        .data
        .expect("item");
    assert_eq!(item.quantity, 4);
    assert_eq!(item.price, 4000);

    let result = cart_service::add_to_cart(&state, &user, add(cream.id, 2)).await;
    match result {
        Err(AppError::InsufficientStock(id)) => assert_eq!(id, cream.id),
        other => panic!("expected insufficient stock, got {other:?}"),
    }

    let cart = cart_service::get_cart(&state, &user).await?.data.expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 4);
    assert_eq!(cart.items[0].product.name, "Face cream");
    assert_eq!(cart.total, 4000);
    assert_eq!(Carts::find().count(&state.orm).await?, 1);
    Ok(())
}

#[tokio::test]
async fn add_rejects_bad_input() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "user", "bad@example.com").await?;
    let cream = create_product(&state, "Face cream", 1000, 5, "skincare").await?;

    let zero = cart_service::add_to_cart(&state, &user, add(cream.id, 0)).await;
    assert!(matches!(zero, Err(AppError::BadRequest(_))));

    let missing = cart_service::add_to_cart(&state, &user, add(Uuid::new_v4(), 1)).await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    assert_eq!(CartItems::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn update_sets_quantity_within_stock() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "user", "update@example.com").await?;
    let stranger = create_user(&state, "user", "stranger@example.com").await?;
    let serum = create_product(&state, "Serum", 1500, 3, "skincare").await?;

    let item = cart_service::add_to_cart(&state, &user, add(serum.id, 1))
        .await?
        .data
        .expect("item");

    let updated = cart_service::update_cart_item(
        &state,
        &user,
        item.id,
        UpdateCartItemRequest { quantity: 3 },
    )
    .await?
    .data
    .expect("item");
    assert_eq!(updated.quantity, 3);
    assert_eq!(updated.price, 4500);

    let too_many = cart_service::update_cart_item(
        &state,
        &user,
        item.id,
        UpdateCartItemRequest { quantity: 4 },
    )
    .await;
    assert!(matches!(too_many, Err(AppError::InsufficientStock(_))));

    let foreign = cart_service::update_cart_item(
        &state,
        &stranger,
        item.id,
        UpdateCartItemRequest { quantity: 1 },
    )
    .await;
    assert!(matches!(foreign, Err(AppError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn remove_and_clear_are_idempotent() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "user", "remove@example.com").await?;
    let stranger = create_user(&state, "user", "thief@example.com").await?;
    let cream = create_product(&state, "Face cream", 1000, 5, "skincare").await?;

    // Nothing to remove yet.
    cart_service::remove_from_cart(&state, &user, Uuid::new_v4()).await?;
    cart_service::clear_cart(&state, &user).await?;

    let item = cart_service::add_to_cart(&state, &user, add(cream.id, 1))
        .await?
        .data
        .expect("item");

    // Another user's delete leaves the item in place.
    cart_service::remove_from_cart(&state, &stranger, item.id).await?;
    assert_eq!(CartItems::find().count(&state.orm).await?, 1);

    cart_service::remove_from_cart(&state, &user, item.id).await?;
    cart_service::remove_from_cart(&state, &user, item.id).await?;
    assert_eq!(CartItems::find().count(&state.orm).await?, 0);

    cart_service::add_to_cart(&state, &user, add(cream.id, 2)).await?;
    let cleared = cart_service::clear_cart(&state, &user).await?.data.expect("data");
    assert_eq!(cleared["removed"], 1);
    let cleared = cart_service::clear_cart(&state, &user).await?.data.expect("data");
    assert_eq!(cleared["removed"], 0);
    Ok(())
}
