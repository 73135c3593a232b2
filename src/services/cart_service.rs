use chrono::Utc;
use sea_orm::sea_query::{LockType, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::{
        cart::{AddToCartRequest, CartItemDto, CartView, UpdateCartItemRequest},
        orders::OrderLineRequest,
    },
    entity::{
        cart_items::{ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems},
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CartItem,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let cart = match find_cart(&state.orm, user.user_id).await? {
        Some(cart) => cart,
        None => {
            let empty = CartView {
                id: None,
                user_id: user.user_id,
                items: Vec::new(),
                total: 0,
            };
            return Ok(ApiResponse::success("OK", empty, Some(Meta::empty())));
        }
    };

    let rows = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .find_also_related(Products)
        .order_by_asc(CartItemCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let items: Vec<CartItemDto> = rows
        .into_iter()
        .filter_map(|(item, product)| {
            product.map(|product| CartItemDto {
                id: item.id,
                product: product.into(),
                quantity: item.quantity,
                price: item.price,
            })
        })
        .collect();
    let total = items.iter().map(|item| item.price).sum();

    let meta = Meta::new(1, items.len() as i64, items.len() as i64);
    Ok(ApiResponse::success(
        "OK",
        CartView {
            id: Some(cart.id),
            user_id: user.user_id,
            items,
            total,
        },
        Some(meta),
    ))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let txn = state.orm.begin().await?;

    let product = Products::find_by_id(payload.product_id).one(&txn).await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let cart = find_or_create_cart(&txn, user.user_id).await?;

    let existing = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .filter(CartItemCol::ProductId.eq(product.id))
        .one(&txn)
        .await?;

    let current = existing.as_ref().map(|item| item.quantity).unwrap_or(0);
    let quantity = current
        .checked_add(payload.quantity)
        .ok_or_else(|| AppError::BadRequest("quantity is too large".into()))?;
    if quantity > product.stock {
        return Err(AppError::InsufficientStock(product.id));
    }
    let price = line_price(product.price, quantity)?;
    let now = Utc::now().fixed_offset();

    let item = match existing {
        Some(item) => {
            let mut active: CartItemActive = item.into();
            active.quantity = Set(quantity);
            active.price = Set(price);
            active.updated_at = Set(now);
            active.update(&txn).await?
        }
        None => {
            CartItemActive {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(product.id),
                quantity: Set(quantity),
                price: Set(price),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;

    tracing::debug!(
        user_id = %user.user_id,
        product_id = %item.product_id,
        quantity = item.quantity,
        "cart item saved"
    );

    Ok(ApiResponse::success("OK", item.into(), Some(Meta::empty())))
}

pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let txn = state.orm.begin().await?;

    let cart = match find_cart(&txn, user.user_id).await? {
        Some(cart) => cart,
        None => return Err(AppError::NotFound),
    };

    let item = CartItems::find_by_id(item_id)
        .filter(CartItemCol::CartId.eq(cart.id))
        .one(&txn)
        .await?;
    let item = match item {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };

    let product = Products::find_by_id(item.product_id).one(&txn).await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    if payload.quantity > product.stock {
        return Err(AppError::InsufficientStock(product.id));
    }

    let mut active: CartItemActive = item.into();
    active.quantity = Set(payload.quantity);
    active.price = Set(line_price(product.price, payload.quantity)?);
    active.updated_at = Set(Utc::now().fixed_offset());
    let item = active.update(&txn).await?;

    txn.commit().await?;

    Ok(ApiResponse::success("Updated", item.into(), Some(Meta::empty())))
}

/// Removing an item that is already gone, or that belongs to another user's
/// cart, succeeds without touching anything.
pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let removed = match find_cart(&state.orm, user.user_id).await? {
        Some(cart) => {
            CartItems::delete_many()
                .filter(CartItemCol::Id.eq(item_id))
                .filter(CartItemCol::CartId.eq(cart.id))
                .exec(&state.orm)
                .await?
                .rows_affected
        }
        None => 0,
    };

    tracing::debug!(user_id = %user.user_id, item_id = %item_id, removed, "cart item removed");

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let removed = clear_cart_for(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success(
        "Cart cleared",
        serde_json::json!({ "removed": removed }),
        Some(Meta::empty()),
    ))
}

/// Delete every item in the user's cart; a missing cart counts as empty.
pub async fn clear_cart_for<C>(db: &C, user_id: Uuid) -> AppResult<u64>
where
    C: ConnectionTrait,
{
    let cart = match find_cart(db, user_id).await? {
        Some(cart) => cart,
        None => return Ok(0),
    };

    let result = CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// The cart's contents as order lines, oldest item first.
pub async fn cart_lines<C>(db: &C, user_id: Uuid) -> AppResult<Vec<OrderLineRequest>>
where
    C: ConnectionTrait,
{
    let cart = match find_cart(db, user_id).await? {
        Some(cart) => cart,
        None => return Ok(Vec::new()),
    };

    let lines = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .order_by_asc(CartItemCol::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(|item| OrderLineRequest {
            product_id: item.product_id,
            quantity: Some(item.quantity),
        })
        .collect();

    Ok(lines)
}

async fn find_cart<C>(db: &C, user_id: Uuid) -> AppResult<Option<CartModel>>
where
    C: ConnectionTrait,
{
    let cart = Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .one(db)
        .await?;
    Ok(cart)
}

async fn find_or_create_cart<C>(db: &C, user_id: Uuid) -> AppResult<CartModel>
where
    C: ConnectionTrait,
{
    let now = Utc::now().fixed_offset();
    // A concurrent first add may win the insert; the unique user_id keeps one row.
    Carts::insert(CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: Set(now),
        updated_at: Set(now),
    })
    .on_conflict(OnConflict::column(CartCol::UserId).do_nothing().to_owned())
    .exec_without_returning(db)
    .await?;

    let cart = Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .lock(LockType::Update)
        .one(db)
        .await?;
    cart.ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart missing after upsert")))
}

fn line_price(unit_price: i64, quantity: i32) -> AppResult<i64> {
    unit_price
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| AppError::BadRequest("line amount is too large".into()))
}

#[cfg(test)]
mod tests {
    use super::line_price;

    #[test]
    fn line_price_multiplies_unit_price() {
        assert_eq!(line_price(1000, 4).unwrap(), 4000);
    }

    #[test]
    fn line_price_rejects_overflow() {
        assert!(line_price(i64::MAX, 2).is_err());
    }
}
