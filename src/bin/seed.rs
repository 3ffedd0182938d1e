use chrono::Utc;
use marketplace_core::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, run_migrations},
    entity::{
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
        sea_orm_active_enums::ProductStatus,
    },
};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let inserted = seed_products(&orm).await?;

    println!("Seed completed. {inserted} product(s) inserted");
    Ok(())
}

async fn seed_products(orm: &OrmConn) -> anyhow::Result<usize> {
    let products = [
        ("Axum Hoodie", "Warm hoodie for Rustaceans", 550_000, 50),
        ("Ferris Mug", "Coffee tastes better with Ferris", 120_000, 100),
        ("Rust Sticker Pack", "Decorate your laptop", 50_000, 200),
        ("E-book: Async Rust", "Learn async Rust patterns", 250_000, 75),
    ];

    let mut inserted = 0;
    for (name, desc, price, stock) in products {
        let exists = Products::find()
            .filter(ProdCol::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            println!("Skipped {name}: already present");
            continue;
        }

        let now: DateTimeWithTimeZone = Utc::now().into();
        ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(Some(desc.to_string())),
            price: Set(price),
            stock: Set(stock),
            sold_count: Set(0),
            status: Set(ProductStatus::Approved),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(orm)
        .await?;
        inserted += 1;
    }

    Ok(inserted)
}
