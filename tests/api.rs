mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    routing::get,
};
use http_body_util::BodyExt;
use marketplace_api::{
    routes::{create_api_router, health::health_check},
    services::auth_service::issue_token,
    state::AppState,
};
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{create_product, create_user, setup_state};

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", create_api_router())
        .with_state(state)
}

async fn body_json(response: axum::response::Response) -> anyhow::Result<Value> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn health_endpoint_responds() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let response = app(state)
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_token() -> anyhow::Result<()> {
    let state = setup_state().await?;

    let response = app(state.clone())
        .oneshot(Request::builder().uri("/api/cart").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app(state)
        .oneshot(
            Request::builder()
                .uri("/api/cart")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn product_listing_reads_query_parameters() -> anyhow::Result<()> {
    let state = setup_state().await?;
    create_product(&state, "Lip balm", 50, 10, "skincare").await?;
    create_product(&state, "Face cream", 1000, 10, "skincare").await?;

    let response = app(state)
        .oneshot(
            Request::builder()
                .uri("/api/products?page=1&per_page=5&min_price=100&sort_by=price&sort_order=asc")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["meta"]["per_page"], 5);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["meta"]["pages"], 1);
    assert_eq!(body["data"][0]["name"], "Face cream");
    Ok(())
}

#[tokio::test]
async fn placing_an_order_over_http() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "user", "http@example.com").await?;
    let cream = create_product(&state, "Face cream", 1000, 10, "skincare").await?;
    let token = issue_token(&state.auth, user.user_id, "http@example.com", &user.role)?;

    let payload = json!({
        "items": [{ "product_id": cream.id, "quantity": 3 }],
        "payment_method": "card"
    });
    let response = app(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/orders")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["data"]["order"]["total_amount"], 3000);
    assert_eq!(body["data"]["order"]["status"], "pending");

    let empty = json!({ "items": [] });
    let response = app(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/orders")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(empty.to_string()))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn admin_routes_reject_regular_users() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, "user", "plain@example.com").await?;
    let token = issue_token(&state.auth, user.user_id, "plain@example.com", &user.role)?;

    let response = app(state)
        .oneshot(
            Request::builder()
                .uri("/api/admin/stats/overview")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    Ok(())
}
