use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::DailyStats;

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOverview {
    pub total_users: i64,
    pub total_orders: i64,
    pub total_products: i64,
    pub total_reviews: i64,
    pub pending_orders: i64,
    pub total_revenue: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductSales {
    pub product_id: Uuid,
    pub name: String,
    pub units_sold: i64,
    pub revenue: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategorySales {
    pub category: String,
    pub units_sold: i64,
    pub revenue: i64,
    pub order_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductSalesList {
    #[schema(value_type = Vec<ProductSales>)]
    pub items: Vec<ProductSales>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategorySalesList {
    #[schema(value_type = Vec<CategorySales>)]
    pub items: Vec<CategorySales>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct DailyStatsList {
    #[schema(value_type = Vec<DailyStats>)]
    pub items: Vec<DailyStats>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PopularProductsQuery {
    pub limit: Option<u64>,
}
