use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::products::{CreateProductRequest, NameList, ProductList, UpdateProductRequest},
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        products::{ActiveModel, Column, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

/// Field values a product must satisfy after a create or an update.
pub struct ProductDraft<'a> {
    pub name: &'a str,
    pub price: i64,
    pub stock: i32,
    pub category: &'a str,
    pub brand: &'a str,
}

pub fn validate_product(draft: &ProductDraft<'_>) -> Result<(), AppError> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("product name is required".into()));
    }
    if name.chars().count() < 2 {
        return Err(AppError::BadRequest(
            "product name must be at least 2 characters".into(),
        ));
    }
    if draft.price <= 0 {
        return Err(AppError::BadRequest("product price must be positive".into()));
    }
    if draft.category.trim().is_empty() {
        return Err(AppError::BadRequest("product category is required".into()));
    }
    if draft.brand.trim().is_empty() {
        return Err(AppError::BadRequest("product brand is required".into()));
    }
    if draft.stock < 0 {
        return Err(AppError::BadRequest("product stock cannot be negative".into()));
    }
    Ok(())
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search.to_lowercase());
        condition = condition.add(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(Column::Name))).like(pattern.clone()))
                .add(Expr::expr(Func::lower(Expr::col(Column::Description))).like(pattern)),
        );
    }

    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::Category.eq(category.clone()));
    }

    if let Some(brand) = query.brand.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::Brand.eq(brand.clone()));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    let data = ProductList { items };
    Ok(ApiResponse::success("Products", data, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let result = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(Product::from);
    let result = match result {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Product", result, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_product(&ProductDraft {
        name: &payload.name,
        price: payload.price,
        stock: payload.stock,
        category: &payload.category,
        brand: &payload.brand,
    })?;

    let now = Utc::now().fixed_offset();
    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        price: Set(payload.price),
        stock: Set(payload.stock),
        category: Set(payload.category.trim().to_string()),
        brand: Set(payload.brand.trim().to_string()),
        image_url: Set(payload.image_url),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let product = active.insert(&state.orm).await?;

    tracing::info!(product_id = %product.id, admin_id = %user.user_id, "product created");

    Ok(ApiResponse::success(
        "Product created",
        product.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let name = payload.name.as_deref().unwrap_or(&existing.name).trim().to_string();
    let category = payload
        .category
        .as_deref()
        .unwrap_or(&existing.category)
        .trim()
        .to_string();
    let brand = payload.brand.as_deref().unwrap_or(&existing.brand).trim().to_string();
    let price = payload.price.unwrap_or(existing.price);
    let stock = payload.stock.unwrap_or(existing.stock);
    validate_product(&ProductDraft {
        name: &name,
        price,
        stock,
        category: &category,
        brand: &brand,
    })?;

    let mut active: ActiveModel = existing.into();
    active.name = Set(name);
    active.category = Set(category);
    active.brand = Set(brand);
    active.price = Set(price);
    active.stock = Set(stock);
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url));
    }
    active.updated_at = Set(Utc::now().fixed_offset());

    let product = active.update(&state.orm).await?;

    tracing::info!(product_id = %product.id, admin_id = %user.user_id, "product updated");

    Ok(ApiResponse::success(
        "Updated",
        product.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    // Line items are the audit record of past orders and must keep their product.
    let ordered = OrderItems::find()
        .filter(OrderItemCol::ProductId.eq(id))
        .count(&state.orm)
        .await?;
    if ordered > 0 {
        return Err(AppError::Conflict(
            "product appears in existing orders".into(),
        ));
    }

    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(product_id = %id, admin_id = %user.user_id, "product deleted");

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<NameList>> {
    let items = distinct_values(&state.orm, Column::Category).await?;
    Ok(ApiResponse::success("Categories", NameList { items }, None))
}

pub async fn list_brands(state: &AppState) -> AppResult<ApiResponse<NameList>> {
    let items = distinct_values(&state.orm, Column::Brand).await?;
    Ok(ApiResponse::success("Brands", NameList { items }, None))
}

async fn distinct_values<C>(db: &C, column: Column) -> AppResult<Vec<String>>
where
    C: ConnectionTrait,
{
    let values = Products::find()
        .select_only()
        .column(column)
        .distinct()
        .order_by_asc(column)
        .into_tuple::<String>()
        .all(db)
        .await?;
    Ok(values)
}
