use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit_best_effort,
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    entity::{
        cart_items::{
            ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems,
            Model as CartItemModel,
        },
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
        products::Model as ProductModel,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Cart, CartItem},
    response::{ApiResponse, Meta},
    services::product_service,
    state::AppState,
};

/// How an add request combines with a line already holding the same product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineMerge {
    /// Add to the existing quantity.
    Increment,
    /// Overwrite the existing quantity ("buy now").
    Replace,
}

pub(crate) fn line_total(unit_price: i64, quantity: i32) -> i64 {
    unit_price * i64::from(quantity)
}

fn validate_quantity(quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn ensure_in_stock(product: &ProductModel, requested: i32) -> AppResult<()> {
    if requested > product.stock {
        return Err(AppError::InsufficientStock {
            product: product.name.clone(),
            available: product.stock,
            requested,
        });
    }
    Ok(())
}

pub(crate) async fn find_cart<C>(conn: &C, user_id: Uuid) -> AppResult<Option<CartModel>>
where
    C: ConnectionTrait,
{
    Ok(Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .one(conn)
        .await?)
}

/// Returns the user's cart, creating an empty one on first touch.
pub(crate) async fn get_or_create_cart<C>(conn: &C, user_id: Uuid) -> AppResult<CartModel>
where
    C: ConnectionTrait,
{
    if let Some(cart) = find_cart(conn, user_id).await? {
        return Ok(cart);
    }

    if insert_cart_if_absent(conn, user_id).await? {
        tracing::debug!(user_id = %user_id, "cart created");
    }
    find_cart(conn, user_id).await?.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("cart for user {user_id} missing after insert"))
    })
}

/// Inserts an empty cart unless the user already has one. A concurrent first
/// touch loses on the unique `user_id` index without raising an error.
/// Returns whether a row was written.
async fn insert_cart_if_absent<C>(conn: &C, user_id: Uuid) -> AppResult<bool>
where
    C: ConnectionTrait,
{
    let now: DateTimeWithTimeZone = Utc::now().into();
    let cart = CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        total_amount: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let inserted = Carts::insert(cart)
        .on_conflict(OnConflict::column(CartCol::UserId).do_nothing().to_owned())
        .exec_without_returning(conn)
        .await?;
    Ok(inserted > 0)
}

pub(crate) async fn cart_items<C>(conn: &C, cart_id: Uuid) -> AppResult<Vec<CartItemModel>>
where
    C: ConnectionTrait,
{
    Ok(CartItems::find()
        .filter(CartItemCol::CartId.eq(cart_id))
        .order_by_asc(CartItemCol::CreatedAt)
        .order_by_asc(CartItemCol::Id)
        .all(conn)
        .await?)
}

/// Rewrites the cart's total from its current items.
pub(crate) async fn recompute_total<C>(conn: &C, cart: CartModel) -> AppResult<CartModel>
where
    C: ConnectionTrait,
{
    let total: i64 = cart_items(conn, cart.id)
        .await?
        .iter()
        .map(|item| item.total_price)
        .sum();

    let mut active: CartActive = cart.into();
    active.total_amount = Set(total);
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(conn).await?)
}

pub(crate) async fn clear_items<C>(conn: &C, cart: CartModel) -> AppResult<CartModel>
where
    C: ConnectionTrait,
{
    CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(conn)
        .await?;
    recompute_total(conn, cart).await
}

async fn load_cart_view<C>(conn: &C, cart: CartModel) -> AppResult<Cart>
where
    C: ConnectionTrait,
{
    let items = cart_items(conn, cart.id).await?;
    let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
    let products = product_service::get_products(conn, &product_ids, false).await?;

    let items = items
        .into_iter()
        .map(|item| {
            let product = products.get(&item.product_id);
            CartItem::from_entity(item, product)
        })
        .collect();

    Ok(Cart::from_entity(cart, items))
}

async fn owned_item<C>(conn: &C, cart: &CartModel, item_id: Uuid) -> AppResult<CartItemModel>
where
    C: ConnectionTrait,
{
    let item = CartItems::find_by_id(item_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    if item.cart_id != cart.id {
        return Err(AppError::NotOwner);
    }
    Ok(item)
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Cart>> {
    let txn = state.orm.begin().await?;
    let cart = get_or_create_cart(&txn, user.user_id).await?;
    let view = load_cart_view(&txn, cart).await?;
    txn.commit().await?;

    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

async fn merge_item(
    state: &AppState,
    user: &AuthUser,
    payload: &AddToCartRequest,
    merge: LineMerge,
) -> AppResult<Cart> {
    validate_quantity(payload.quantity)?;

    let txn = state.orm.begin().await?;
    let cart = get_or_create_cart(&txn, user.user_id).await?;

    let product = match product_service::get_product(&txn, payload.product_id).await {
        Ok(product) => product,
        Err(AppError::NotFound) => {
            return Err(AppError::BadRequest("product not found".to_string()));
        }
        Err(err) => return Err(err),
    };
    if !product.status.is_sellable() {
        return Err(AppError::ProductUnavailable {
            product: product.name,
        });
    }
    ensure_in_stock(&product, payload.quantity)?;

    let existing = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .filter(CartItemCol::ProductId.eq(product.id))
        .one(&txn)
        .await?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    match existing {
        Some(item) => {
            let quantity = match merge {
                LineMerge::Increment => item.quantity.saturating_add(payload.quantity),
                LineMerge::Replace => payload.quantity,
            };
            ensure_in_stock(&product, quantity)?;

            let mut active: CartItemActive = item.into();
            active.quantity = Set(quantity);
            active.unit_price = Set(product.price);
            active.total_price = Set(line_total(product.price, quantity));
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }
        None => {
            CartItemActive {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(product.id),
                quantity: Set(payload.quantity),
                unit_price: Set(product.price),
                total_price: Set(line_total(product.price, payload.quantity)),
                product_variant: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }
    }

    let cart = recompute_total(&txn, cart).await?;
    let view = load_cart_view(&txn, cart).await?;
    txn.commit().await?;

    Ok(view)
}

/// Adds `quantity` units of a product, merging into an existing line.
pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<Cart>> {
    let cart = merge_item(state, user, &payload, LineMerge::Increment).await?;

    log_audit_best_effort(
        state,
        Some(user.user_id),
        "cart_add",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity })),
    )
    .await;
    tracing::info!(user_id = %user.user_id, product_id = %payload.product_id, quantity = payload.quantity, "item added to cart");

    Ok(ApiResponse::success("Added to cart", cart, Some(Meta::empty())))
}

/// Sets the line for a product to exactly `quantity` units.
pub async fn replace_item(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<Cart>> {
    let cart = merge_item(state, user, &payload, LineMerge::Replace).await?;

    log_audit_best_effort(
        state,
        Some(user.user_id),
        "cart_replace",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity })),
    )
    .await;

    Ok(ApiResponse::success("Cart updated", cart, Some(Meta::empty())))
}

pub async fn update_item_quantity(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<Cart>> {
    validate_quantity(payload.quantity)?;

    let txn = state.orm.begin().await?;
    let cart = get_or_create_cart(&txn, user.user_id).await?;
    let item = owned_item(&txn, &cart, item_id).await?;

    let product = product_service::get_product(&txn, item.product_id).await?;
    ensure_in_stock(&product, payload.quantity)?;

    let unit_price = item.unit_price;
    let mut active: CartItemActive = item.into();
    active.quantity = Set(payload.quantity);
    active.total_price = Set(line_total(unit_price, payload.quantity));
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    let cart = recompute_total(&txn, cart).await?;
    let view = load_cart_view(&txn, cart).await?;
    txn.commit().await?;

    log_audit_best_effort(
        state,
        Some(user.user_id),
        "cart_update",
        Some("cart_items"),
        Some(serde_json::json!({ "cart_item_id": item_id, "quantity": payload.quantity })),
    )
    .await;

    Ok(ApiResponse::success("Cart updated", view, Some(Meta::empty())))
}

pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<Cart>> {
    let txn = state.orm.begin().await?;
    let cart = get_or_create_cart(&txn, user.user_id).await?;
    let item = owned_item(&txn, &cart, item_id).await?;
    item.delete(&txn).await?;

    let cart = recompute_total(&txn, cart).await?;
    let view = load_cart_view(&txn, cart).await?;
    txn.commit().await?;

    log_audit_best_effort(
        state,
        Some(user.user_id),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "cart_item_id": item_id })),
    )
    .await;

    Ok(ApiResponse::success("Removed from cart", view, Some(Meta::empty())))
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Cart>> {
    let txn = state.orm.begin().await?;
    let cart = get_or_create_cart(&txn, user.user_id).await?;
    let cart = clear_items(&txn, cart).await?;
    let view = load_cart_view(&txn, cart).await?;
    txn.commit().await?;

    tracing::info!(user_id = %user.user_id, "cart cleared");
    log_audit_best_effort(
        state,
        Some(user.user_id),
        "cart_clear",
        Some("carts"),
        Some(serde_json::json!({ "cart_id": view.id })),
    )
    .await;

    Ok(ApiResponse::success("Cart cleared", view, Some(Meta::empty())))
}
