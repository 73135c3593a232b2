#![allow(dead_code)]

use chrono::Utc;
use marketplace_api::{
    db::{create_orm_conn, run_migrations},
    entity::{
        products::{ActiveModel as ProductActive, Model as ProductModel},
        users::ActiveModel as UserActive,
    },
    middleware::auth::AuthUser,
    state::{AppState, AuthSettings},
};
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret";

/// Fresh in-memory database with the full schema applied.
pub async fn setup_state() -> anyhow::Result<AppState> {
    let orm = create_orm_conn("sqlite::memory:").await?;
    run_migrations(&orm).await?;
    Ok(AppState::new(
        orm,
        AuthSettings {
            jwt_secret: TEST_JWT_SECRET.into(),
            token_ttl_hours: 1,
        },
    ))
}

pub async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<AuthUser> {
    let now = Utc::now().fixed_offset();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        full_name: Set(format!("{role} tester")),
        email: Set(email.into()),
        // Fixtures never log in, so the hash is never verified.
        password_hash: Set("fixture".into()),
        role: Set(role.into()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role: user.role,
    })
}

pub async fn create_product(
    state: &AppState,
    name: &str,
    price: i64,
    stock: i32,
    category: &str,
) -> anyhow::Result<ProductModel> {
    let now = Utc::now().fixed_offset();
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.into()),
        description: Set(Some(format!("{name} for testing"))),
        price: Set(price),
        stock: Set(stock),
        category: Set(category.into()),
        brand: Set("Acme".into()),
        image_url: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await?;
    Ok(product)
}
