use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::{Alias, Expr, Func, IntoColumnRef, OnConflict, SimpleExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, JoinType, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use uuid::Uuid;

use crate::{
    dto::stats::{
        AdminOverview, CategorySales, CategorySalesList, DailyStatsList, PopularProductsQuery,
        ProductSales, ProductSalesList,
    },
    entity::{
        daily_stats::{ActiveModel as DailyStatsActive, Column as DailyCol, Entity as DailyStatsEntity},
        order_items::{self, Column as OrderItemCol, Entity as OrderItems},
        orders::{Column as OrderCol, Entity as Orders},
        products::{Column as ProdCol, Entity as Products},
        reviews::Entity as Reviews,
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::DailyStats,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::order_service::{STATUS_CANCELLED, STATUS_PENDING},
    state::AppState,
};

pub const DEFAULT_POPULAR_LIMIT: u64 = 5;
pub const MAX_POPULAR_LIMIT: u64 = 50;

#[derive(Debug, FromQueryResult)]
struct ProductSalesRow {
    product_id: Uuid,
    name: String,
    units_sold: i64,
    revenue: i64,
}

#[derive(Debug, FromQueryResult)]
struct CategorySalesRow {
    category: String,
    units_sold: i64,
    revenue: i64,
    order_count: i64,
}

/// `SUM(expr)` that yields 0 on no rows and decodes as BIGINT on every backend.
fn sum_bigint(expr: SimpleExpr) -> SimpleExpr {
    Expr::expr(Func::coalesce([Expr::expr(expr).sum(), Expr::val(0i64).into()]))
        .cast_as(Alias::new("BIGINT"))
}

fn qualified<C: IntoColumnRef>(column: C) -> SimpleExpr {
    Expr::col(column).into()
}

fn line_quantity() -> SimpleExpr {
    qualified((OrderItems, OrderItemCol::Quantity))
}

fn line_revenue() -> SimpleExpr {
    Expr::col((OrderItems, OrderItemCol::Quantity)).mul(Expr::col((OrderItems, OrderItemCol::Price)))
}

pub fn clamp_popular_limit(limit: Option<u64>) -> u64 {
    limit
        .unwrap_or(DEFAULT_POPULAR_LIMIT)
        .clamp(1, MAX_POPULAR_LIMIT)
}

/// Revenue of every order that was not cancelled.
async fn booked_revenue<C>(db: &C) -> AppResult<i64>
where
    C: ConnectionTrait,
{
    let revenue = Orders::find()
        .select_only()
        .column_as(sum_bigint(qualified(OrderCol::TotalAmount)), "revenue")
        .filter(OrderCol::Status.ne(STATUS_CANCELLED))
        .into_tuple::<i64>()
        .one(db)
        .await?;
    Ok(revenue.unwrap_or(0))
}

pub async fn overview(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<AdminOverview>> {
    ensure_admin(user)?;
    let db = &state.orm;

    let data = AdminOverview {
        total_users: Users::find().count(db).await? as i64,
        total_orders: Orders::find().count(db).await? as i64,
        total_products: Products::find().count(db).await? as i64,
        total_reviews: Reviews::find().count(db).await? as i64,
        pending_orders: Orders::find()
            .filter(OrderCol::Status.eq(STATUS_PENDING))
            .count(db)
            .await? as i64,
        total_revenue: booked_revenue(db).await?,
    };

    Ok(ApiResponse::success("Overview", data, None))
}

pub async fn popular_products(
    state: &AppState,
    user: &AuthUser,
    query: PopularProductsQuery,
) -> AppResult<ApiResponse<ProductSalesList>> {
    ensure_admin(user)?;
    let limit = clamp_popular_limit(query.limit);

    let rows = OrderItems::find()
        .select_only()
        .column_as(qualified((OrderItems, OrderItemCol::ProductId)), "product_id")
        .column_as(qualified((Products, ProdCol::Name)), "name")
        .column_as(sum_bigint(line_quantity()), "units_sold")
        .column_as(sum_bigint(line_revenue()), "revenue")
        .join(JoinType::InnerJoin, order_items::Relation::Products.def())
        .group_by(qualified((OrderItems, OrderItemCol::ProductId)))
        .group_by(qualified((Products, ProdCol::Name)))
        .order_by(Expr::cust("units_sold"), Order::Desc)
        .order_by(qualified((Products, ProdCol::Name)), Order::Asc)
        .limit(limit)
        .into_model::<ProductSalesRow>()
        .all(&state.orm)
        .await?;

    let items = rows
        .into_iter()
        .map(|row| ProductSales {
            product_id: row.product_id,
            name: row.name,
            units_sold: row.units_sold,
            revenue: row.revenue,
        })
        .collect();

    Ok(ApiResponse::success(
        "Popular products",
        ProductSalesList { items },
        None,
    ))
}

pub async fn sales_by_category(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CategorySalesList>> {
    ensure_admin(user)?;

    let rows = OrderItems::find()
        .select_only()
        .column_as(qualified((Products, ProdCol::Category)), "category")
        .column_as(sum_bigint(line_quantity()), "units_sold")
        .column_as(sum_bigint(line_revenue()), "revenue")
        .column_as(
            Expr::cust("COUNT(DISTINCT \"order_items\".\"order_id\")"),
            "order_count",
        )
        .join(JoinType::InnerJoin, order_items::Relation::Products.def())
        .group_by(qualified((Products, ProdCol::Category)))
        .order_by(Expr::cust("revenue"), Order::Desc)
        .order_by(qualified((Products, ProdCol::Category)), Order::Asc)
        .into_model::<CategorySalesRow>()
        .all(&state.orm)
        .await?;

    let items = rows
        .into_iter()
        .map(|row| CategorySales {
            category: row.category,
            units_sold: row.units_sold,
            revenue: row.revenue,
            order_count: row.order_count,
        })
        .collect();

    Ok(ApiResponse::success(
        "Sales by category",
        CategorySalesList { items },
        None,
    ))
}

pub async fn list_daily_stats(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<DailyStatsList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = DailyStatsEntity::find().order_by_desc(DailyCol::Date);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(DailyStats::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Daily stats", DailyStatsList { items }, Some(meta)))
}

/// Record the current totals as the snapshot for `date`, replacing any
/// snapshot already stored for that day.
pub async fn save_daily_stats<C>(db: &C, date: NaiveDate) -> AppResult<DailyStats>
where
    C: ConnectionTrait,
{
    let key = date.format("%Y-%m-%d").to_string();

    let snapshot = DailyStatsActive {
        id: Set(Uuid::new_v4()),
        date: Set(key.clone()),
        total_users: Set(Users::find().count(db).await? as i64),
        total_orders: Set(Orders::find().count(db).await? as i64),
        total_products: Set(Products::find().count(db).await? as i64),
        total_revenue: Set(booked_revenue(db).await?),
        created_at: Set(Utc::now().fixed_offset()),
    };

    DailyStatsEntity::insert(snapshot)
        .on_conflict(
            OnConflict::column(DailyCol::Date)
                .update_columns([
                    DailyCol::TotalUsers,
                    DailyCol::TotalOrders,
                    DailyCol::TotalProducts,
                    DailyCol::TotalRevenue,
                    DailyCol::CreatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    let saved = DailyStatsEntity::find()
        .filter(DailyCol::Date.eq(key))
        .one(db)
        .await?;
    let saved = saved
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("daily stats missing after upsert")))?;

    Ok(saved.into())
}
