//! Shared setup for the integration tests: an in-memory SQLite database
//! migrated with the real migrator, plus fixtures for products and users.
#![allow(dead_code)]

use chrono::Utc;
use marketplace_core::{
    config::CheckoutPolicy,
    db::run_migrations,
    dto::{cart::AddToCartRequest, orders::CheckoutRequest},
    entity::{
        products::{ActiveModel as ProductActive, Entity as Products, Model as ProductModel},
        sea_orm_active_enums::ProductStatus,
    },
    middleware::auth::{AuthUser, ROLE_ADMIN},
    services::cart_service,
    state::AppState,
};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, EntityTrait, Set};
use uuid::Uuid;

/// Test policy: shipping fee of 30 so totals stay readable.
pub fn policy() -> CheckoutPolicy {
    CheckoutPolicy {
        shipping_fee: 30,
        ..CheckoutPolicy::default()
    }
}

/// One connection: an in-memory database lives and dies with its connection,
/// and concurrent transactions queue on the pool instead of interleaving.
pub async fn setup_state_with(policy: CheckoutPolicy) -> anyhow::Result<AppState> {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let orm = Database::connect(options).await?;
    run_migrations(&orm).await?;
    Ok(AppState { orm, policy })
}

pub async fn setup_state() -> anyhow::Result<AppState> {
    setup_state_with(policy()).await
}

pub fn shopper() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: "USER".into(),
        verified: true,
    }
}

pub fn admin() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: ROLE_ADMIN.into(),
        verified: true,
    }
}

pub async fn create_product_with_status(
    state: &AppState,
    name: &str,
    price: i64,
    stock: i32,
    status: ProductStatus,
) -> anyhow::Result<ProductModel> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(None),
        price: Set(price),
        stock: Set(stock),
        sold_count: Set(0),
        status: Set(status),
        version: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await?;
    Ok(product)
}

pub async fn create_product(
    state: &AppState,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<ProductModel> {
    create_product_with_status(state, name, price, stock, ProductStatus::Approved).await
}

pub async fn reload_product(state: &AppState, id: Uuid) -> anyhow::Result<ProductModel> {
    Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {id} vanished"))
}

/// Overwrites catalog fields the way the external catalog service would.
pub async fn set_product(
    state: &AppState,
    product: &ProductModel,
    price: i64,
    status: ProductStatus,
) -> anyhow::Result<ProductModel> {
    let mut active: ProductActive = reload_product(state, product.id).await?.into();
    active.price = Set(price);
    active.status = Set(status);
    Ok(active.update(&state.orm).await?)
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    product: &ProductModel,
    quantity: i32,
) -> anyhow::Result<()> {
    cart_service::add_item(
        state,
        user,
        AddToCartRequest {
            product_id: product.id,
            quantity,
        },
    )
    .await?;
    Ok(())
}

pub fn checkout_request(method: &str) -> CheckoutRequest {
    CheckoutRequest {
        shipping_address: "12 Harbour Road".into(),
        phone_number: "0912345678".into(),
        payment_method: method.into(),
        notes: Some("leave at the door".into()),
    }
}
