use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::orders::{CheckoutRequest, OrderLineRequest, OrderList, OrderWithItems, PlaceOrderRequest},
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, format_amount},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{
        cart_service,
        notification_service::NewNotification,
        post_commit::{PostCommit, run_post_commit},
    },
    state::AppState,
};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_CANCELLED: &str = "cancelled";
pub const ORDER_STATUSES: [&str; 5] = ["pending", "paid", "shipped", "completed", "cancelled"];

/// One distinct product and how many units of it are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Validate requested lines and merge repeated products.
///
/// Quantity defaults to 1. Lines keep the order in which each product first
/// appears.
pub fn normalize_lines(items: &[OrderLineRequest]) -> AppResult<Vec<OrderLine>> {
    if items.is_empty() {
        return Err(AppError::EmptyOrder);
    }

    let mut lines: Vec<OrderLine> = Vec::with_capacity(items.len());
    for item in items {
        let quantity = item.quantity.unwrap_or(1);
        if quantity <= 0 {
            return Err(AppError::BadRequest(format!(
                "quantity for product {} must be greater than 0",
                item.product_id
            )));
        }

        match lines.iter_mut().find(|line| line.product_id == item.product_id) {
            Some(line) => {
                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| AppError::BadRequest("quantity is too large".into()))?;
            }
            None => lines.push(OrderLine {
                product_id: item.product_id,
                quantity,
            }),
        }
    }

    Ok(lines)
}

/// Sum of unit price x quantity over all lines.
fn order_total(lines: &[OrderLine], products: &HashMap<Uuid, ProductModel>) -> AppResult<i64> {
    let mut total: i64 = 0;
    for line in lines {
        let product = products
            .get(&line.product_id)
            .ok_or(AppError::ProductsNotFound)?;
        total = product
            .price
            .checked_mul(i64::from(line.quantity))
            .and_then(|amount| total.checked_add(amount))
            .ok_or_else(|| AppError::BadRequest("order total is too large".into()))?;
    }
    Ok(total)
}

pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let lines = normalize_lines(&payload.items)?;
    let placed = create_order(state, user.user_id, &lines, payload.payment_method).await?;
    Ok(ApiResponse::success("Order placed", placed, Some(Meta::empty())))
}

/// Place an order for everything currently in the user's cart.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let requested = cart_service::cart_lines(&state.orm, user.user_id).await?;
    let lines = normalize_lines(&requested)?;
    let placed = create_order(state, user.user_id, &lines, payload.payment_method).await?;
    Ok(ApiResponse::success("Checkout success", placed, Some(Meta::empty())))
}

/// Persist an order and its line items in one transaction, debiting stock,
/// then run the notification and cart-clearing side effects.
pub async fn create_order(
    state: &AppState,
    user_id: Uuid,
    lines: &[OrderLine],
    payment_method: Option<String>,
) -> AppResult<OrderWithItems> {
    if lines.is_empty() {
        return Err(AppError::EmptyOrder);
    }
    let ids: Vec<Uuid> = lines.iter().map(|line| line.product_id).collect();

    let txn = state.orm.begin().await?;

    let products: HashMap<Uuid, ProductModel> = Products::find()
        .filter(ProdCol::Id.is_in(ids))
        .all(&txn)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    if products.len() != lines.len() {
        return Err(AppError::ProductsNotFound);
    }

    // Stock is checked only by the conditional debit below; a rejected debit
    // drops `txn`, which rolls back the order row and earlier debits.
    let total_amount = order_total(lines, &products)?;
    let order_id = Uuid::new_v4();
    let now = Utc::now().fixed_offset();

    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user_id),
        total_amount: Set(total_amount),
        status: Set(STATUS_PENDING.into()),
        payment_method: Set(payment_method.filter(|m| !m.trim().is_empty())),
        invoice_number: Set(build_invoice_number(order_id)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());
    for line in lines {
        let unit_price = products
            .get(&line.product_id)
            .map(|product| product.price)
            .ok_or(AppError::ProductsNotFound)?;

        // The stock check and the debit are one statement, so two orders
        // racing for the last units cannot both succeed.
        let debit = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(line.quantity))
            .col_expr(ProdCol::UpdatedAt, Expr::value(now))
            .filter(ProdCol::Id.eq(line.product_id))
            .filter(ProdCol::Stock.gte(line.quantity))
            .exec(&txn)
            .await?;
        if debit.rows_affected == 0 {
            return Err(AppError::InsufficientStock(line.product_id));
        }

        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            price: Set(unit_price),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        items.push(item.into());
    }

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user_id,
        total = order.total_amount,
        lines = items.len(),
        "order placed"
    );

    let actions = vec![
        PostCommit::Notify(NewNotification {
            user_id,
            title: "Order placed".into(),
            message: format!(
                "Your order {} ({}) has been placed. Total: {}",
                order.invoice_number,
                order.id,
                format_amount(order.total_amount)
            ),
            kind: "success".into(),
        }),
        PostCommit::ClearCart { user_id },
    ];
    run_post_commit(state, actions).await;

    Ok(OrderWithItems {
        order: order.into(),
        items,
    })
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items = load_items(&state.orm, order.id).await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order.into(),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn load_items<C>(db: &C, order_id: Uuid) -> AppResult<Vec<OrderItem>>
where
    C: ConnectionTrait,
{
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();
    Ok(items)
}

pub fn validate_order_status(status: &str) -> Result<(), AppError> {
    if ORDER_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid order status".into()))
    }
}

fn build_invoice_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = order_id.simple().to_string();
    let short = &suffix[..8];
    format!("INV-{}-{}", date, short.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: Uuid, quantity: Option<i32>) -> OrderLineRequest {
        OrderLineRequest {
            product_id,
            quantity,
        }
    }

    fn product(id: Uuid, price: i64) -> ProductModel {
        let now = Utc::now().fixed_offset();
        ProductModel {
            id,
            name: "p".into(),
            description: None,
            price,
            stock: 10,
            category: "c".into(),
            brand: "b".into(),
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_request_is_an_empty_order() {
        assert!(matches!(normalize_lines(&[]), Err(AppError::EmptyOrder)));
    }

    #[test]
    fn missing_quantity_defaults_to_one_and_repeats_merge() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let lines = normalize_lines(&[line(a, None), line(b, Some(3)), line(a, Some(2))]).unwrap();
        assert_eq!(
            lines,
            vec![
                OrderLine {
                    product_id: a,
                    quantity: 3
                },
                OrderLine {
                    product_id: b,
                    quantity: 3
                },
            ]
        );
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let err = normalize_lines(&[line(Uuid::new_v4(), Some(0))]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn total_multiplies_unit_price_by_quantity() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let products: HashMap<Uuid, ProductModel> =
            [(a, product(a, 1000)), (b, product(b, 1500))].into_iter().collect();
        let lines = [
            OrderLine {
                product_id: a,
                quantity: 2,
            },
            OrderLine {
                product_id: b,
                quantity: 1,
            },
        ];
        assert_eq!(order_total(&lines, &products).unwrap(), 3500);
    }

    #[test]
    fn total_overflow_is_rejected() {
        let a = Uuid::new_v4();
        let products: HashMap<Uuid, ProductModel> = [(a, product(a, i64::MAX))].into_iter().collect();
        let lines = [OrderLine {
            product_id: a,
            quantity: 2,
        }];
        assert!(order_total(&lines, &products).is_err());
    }

    #[test]
    fn invoice_number_embeds_date_and_id_prefix() {
        let id = Uuid::new_v4();
        let invoice = build_invoice_number(id);
        assert!(invoice.starts_with("INV-"));
        assert!(invoice.ends_with(&id.simple().to_string()[..8].to_uppercase()));
    }

    #[test]
    fn only_known_statuses_are_valid() {
        assert!(validate_order_status("shipped").is_ok());
        assert!(validate_order_status("lost").is_err());
    }
}
