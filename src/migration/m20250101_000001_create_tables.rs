use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{EntityTrait, Schema};

use crate::entity::{
    CartItems, Carts, DailyStats, Favorites, Notifications, OrderItems, Orders, Products, Reviews,
    Users, cart_items, favorites, notifications, orders, reviews,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Parents first so foreign keys resolve.
        create_table(manager, Users).await?;
        create_table(manager, Products).await?;
        create_table(manager, Carts).await?;
        create_table(manager, CartItems).await?;
        create_table(manager, Orders).await?;
        create_table(manager, OrderItems).await?;
        create_table(manager, Notifications).await?;
        create_table(manager, Favorites).await?;
        create_table(manager, Reviews).await?;
        create_table(manager, DailyStats).await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("ux_cart_items_cart_product")
                    .table(CartItems)
                    .col(cart_items::Column::CartId)
                    .col(cart_items::Column::ProductId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("ux_favorites_user_product")
                    .table(Favorites)
                    .col(favorites::Column::UserId)
                    .col(favorites::Column::ProductId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("ux_reviews_user_product")
                    .table(Reviews)
                    .col(reviews::Column::UserId)
                    .col(reviews::Column::ProductId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("ix_orders_user_id")
                    .table(Orders)
                    .col(orders::Column::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("ix_notifications_user_id")
                    .table(Notifications)
                    .col(notifications::Column::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        drop_table(manager, DailyStats).await?;
        drop_table(manager, Reviews).await?;
        drop_table(manager, Favorites).await?;
        drop_table(manager, Notifications).await?;
        drop_table(manager, OrderItems).await?;
        drop_table(manager, Orders).await?;
        drop_table(manager, CartItems).await?;
        drop_table(manager, Carts).await?;
        drop_table(manager, Products).await?;
        drop_table(manager, Users).await?;
        Ok(())
    }
}

async fn create_table<E>(manager: &SchemaManager<'_>, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let schema = Schema::new(manager.get_database_backend());
    manager
        .create_table(schema.create_table_from_entity(entity).if_not_exists().to_owned())
        .await
}

async fn drop_table<E>(manager: &SchemaManager<'_>, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    manager
        .drop_table(Table::drop().table(entity).if_exists().to_owned())
        .await
}
