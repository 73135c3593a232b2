use chrono::Utc;
use marketplace_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    middleware::auth::{ROLE_ADMIN, ROLE_USER},
    services::auth_service::hash_password,
};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "Store Admin", "admin@example.com", "admin123", ROLE_ADMIN).await?;
    let user_id = ensure_user(&orm, "Demo Shopper", "user@example.com", "user123", ROLE_USER).await?;
    seed_products(&orm).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    full_name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;
    let now = Utc::now().fixed_offset();

    Users::insert(UserActive {
        id: Set(Uuid::new_v4()),
        full_name: Set(full_name.into()),
        email: Set(email.into()),
        password_hash: Set(password_hash),
        role: Set(role.into()),
        created_at: Set(now),
        updated_at: Set(now),
    })
    .on_conflict(
        OnConflict::column(UserCol::Email)
            .update_column(UserCol::Role)
            .to_owned(),
    )
    .exec_without_returning(orm)
    .await?;

    let user = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {email} missing after upsert"))?;

    println!("Ensured user {email} (role={role})");
    Ok(user.id)
}

async fn seed_products(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let products = vec![
        ("Hydrating Face Cream", "Daily moisturiser for dry skin", 1000, 50, "skincare", "Glow"),
        ("Vitamin C Serum", "Brightening serum", 1500, 40, "skincare", "Glow"),
        ("Matte Lipstick", "Long lasting colour", 850, 120, "makeup", "Velvet"),
        ("Volume Mascara", "Lengthening formula", 1200, 80, "makeup", "Velvet"),
        ("Argan Hair Oil", "Nourishing oil for all hair types", 2200, 30, "haircare", "Moro"),
    ];

    for (name, desc, price, stock, category, brand) in products {
        let exists = Products::find()
            .filter(ProdCol::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        let now = Utc::now().fixed_offset();
        ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.into()),
            description: Set(Some(desc.into())),
            price: Set(price),
            stock: Set(stock),
            category: Set(category.into()),
            brand: Set(brand.into()),
            image_url: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
