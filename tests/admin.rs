mod common;

use marketplace_api::{
    dto::{
        orders::{OrderLineRequest, PlaceOrderRequest, UpdateOrderStatusRequest},
        users::UpdateRoleRequest,
    },
    entity::users::Entity as Users,
    error::AppError,
    routes::params::{OrderListQuery, Pagination},
    services::{admin_service, order_service},
};
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;

use common::{create_product, create_user, setup_state};

#[tokio::test]
async fn admin_sees_and_updates_every_order() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = create_user(&state, "admin", "admin@example.com").await?;
    let user = create_user(&state, "user", "user@example.com").await?;
    let cream = create_product(&state, "Face cream", 1000, 10, "skincare").await?;

    let placed = order_service::place_order(
        &state,
        &user,
        PlaceOrderRequest {
            items: vec![OrderLineRequest {
                product_id: cream.id,
                quantity: Some(2),
            }],
            payment_method: None,
        },
    )
    .await?
    .data
    .expect("order");

    let denied = admin_service::list_all_orders(&state, &user, OrderListQuery::default()).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let listed = admin_service::list_all_orders(&state, &admin, OrderListQuery::default()).await?;
    assert_eq!(listed.meta.as_ref().and_then(|m| m.total), Some(1));

    let detail = admin_service::get_order_admin(&state, &admin, placed.order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].quantity, 2);

    let invalid = admin_service::update_order_status(
        &state,
        &admin,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: "teleported".into(),
        },
    )
    .await;
    assert!(matches!(invalid, Err(AppError::BadRequest(_))));

    let shipped = admin_service::update_order_status(
        &state,
        &admin,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: "shipped".into(),
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(shipped.status, "shipped");

    let missing = admin_service::update_order_status(
        &state,
        &admin,
        Uuid::new_v4(),
        UpdateOrderStatusRequest {
            status: "shipped".into(),
        },
    )
    .await;
    assert!(matches!(missing, Err(AppError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn admin_manages_user_roles_and_accounts() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = create_user(&state, "admin", "admin@example.com").await?;
    let user = create_user(&state, "user", "user@example.com").await?;

    let listed = admin_service::list_users(&state, &admin, Pagination::default()).await?;
    assert_eq!(listed.meta.as_ref().and_then(|m| m.total), Some(2));

    let bad_role = admin_service::update_user_role(
        &state,
        &admin,
        user.user_id,
        UpdateRoleRequest {
            role: "owner".into(),
        },
    )
    .await;
    assert!(matches!(bad_role, Err(AppError::BadRequest(_))));

    let promoted = admin_service::update_user_role(
        &state,
        &admin,
        user.user_id,
        UpdateRoleRequest {
            role: "admin".into(),
        },
    )
    .await?
    .data
    .expect("user");
    assert_eq!(promoted.role, "admin");

    let own = admin_service::delete_user(&state, &admin, admin.user_id).await;
    assert!(matches!(own, Err(AppError::BadRequest(_))));

    let denied = admin_service::delete_user(&state, &user, admin.user_id).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    admin_service::delete_user(&state, &admin, user.user_id).await?;
    assert_eq!(Users::find().count(&state.orm).await?, 1);

    let gone = admin_service::delete_user(&state, &admin, user.user_id).await;
    assert!(matches!(gone, Err(AppError::NotFound)));
    Ok(())
}
