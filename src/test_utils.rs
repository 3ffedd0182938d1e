//! In-memory database setup for unit tests inside the crate.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, DbErr, Set};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use crate::{
    entity::{
        products::{ActiveModel as ProductActive, Model as ProductModel},
        sea_orm_active_enums::ProductStatus,
    },
    migration::Migrator,
};

/// Creates an in-memory SQLite database with every table migrated.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Inserts an APPROVED product priced at 100 with a fresh version.
pub async fn insert_product(
    db: &DatabaseConnection,
    name: &str,
    stock: i32,
) -> Result<ProductModel, DbErr> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(None),
        price: Set(100),
        stock: Set(stock),
        sold_count: Set(0),
        status: Set(ProductStatus::Approved),
        version: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}
