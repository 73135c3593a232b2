use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, CartItemDto, CartView, UpdateCartItemRequest},
        favorites::{FavoriteProductList, FavoriteStatus},
        notifications::{CreateNotificationRequest, NotificationList, UnreadCount},
        orders::{
            CheckoutRequest, OrderLineRequest, OrderList, OrderWithItems, PlaceOrderRequest,
            UpdateOrderStatusRequest,
        },
        products::{CreateProductRequest, NameList, ProductList, UpdateProductRequest},
        reviews::{CreateReviewRequest, ProductReviews, ReviewList, UpdateReviewRequest},
        stats::{
            AdminOverview, CategorySales, CategorySalesList, DailyStatsList, ProductSales,
            ProductSalesList,
        },
        users::{UpdateRoleRequest, UserList},
    },
    models::{CartItem, DailyStats, Favorite, Notification, Order, OrderItem, Product, Review, User},
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, cart, favorites, health, notifications, orders, params,
        products as product_routes, reviews,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        auth::profile,
        product_routes::list_products,
        product_routes::create_product,
        product_routes::get_product,
        product_routes::update_product,
        product_routes::delete_product,
        product_routes::list_categories,
        product_routes::list_brands,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        orders::place_order,
        orders::checkout,
        orders::list_order,
        orders::get_order,
        reviews::create_review,
        reviews::get_review,
        reviews::update_review,
        reviews::delete_review,
        reviews::list_product_reviews,
        reviews::list_user_reviews,
        favorites::list_favorites,
        favorites::add_favorite,
        favorites::remove_favorite,
        favorites::check_favorite,
        notifications::list_notifications,
        notifications::create_notification,
        notifications::unread_count,
        notifications::mark_as_read,
        notifications::mark_all_as_read,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::list_users,
        admin::update_user_role,
        admin::delete_user,
        admin::overview,
        admin::popular_products,
        admin::sales_by_category,
        admin::daily_stats
    ),
    components(
        schemas(
            User,
            Product,
            Favorite,
            CartItem,
            Order,
            OrderItem,
            Notification,
            Review,
            DailyStats,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartView,
            CartItemDto,
            OrderLineRequest,
            PlaceOrderRequest,
            CheckoutRequest,
            UpdateOrderStatusRequest,
            OrderList,
            OrderWithItems,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            NameList,
            CreateReviewRequest,
            UpdateReviewRequest,
            ProductReviews,
            ReviewList,
            FavoriteProductList,
            FavoriteStatus,
            CreateNotificationRequest,
            NotificationList,
            UnreadCount,
            AdminOverview,
            ProductSales,
            ProductSalesList,
            CategorySales,
            CategorySalesList,
            DailyStatsList,
            UpdateRoleRequest,
            UserList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Reviews", description = "Review endpoints"),
        (name = "Favorites", description = "Favorite endpoints"),
        (name = "Notifications", description = "Notification endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
