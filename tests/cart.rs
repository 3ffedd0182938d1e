mod common;

use common::*;
use marketplace_core::{
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    entity::{
        audit_logs::{Column as AuditCol, Entity as AuditLogs},
        sea_orm_active_enums::ProductStatus,
    },
    error::AppError,
    services::cart_service,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

#[tokio::test]
async fn first_touch_creates_an_empty_cart() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = shopper();

    let first = cart_service::get_cart(&state, &user).await?.data.unwrap();
    let again = cart_service::get_cart(&state, &user).await?.data.unwrap();

    assert_eq!(first.id, again.id);
    assert_eq!(first.user_id, user.user_id);
    assert!(first.items.is_empty());
    assert_eq!(first.total_amount, 0);
    Ok(())
}

#[tokio::test]
async fn adding_the_same_product_merges_lines() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = shopper();
    let mug = create_product(&state, "Ferris Mug", 120, 10).await?;
    let pen = create_product(&state, "Pen", 15, 10).await?;

    add_to_cart(&state, &user, &mug, 2).await?;
    add_to_cart(&state, &user, &pen, 1).await?;
    add_to_cart(&state, &user, &mug, 3).await?;

    let cart = cart_service::get_cart(&state, &user).await?.data.unwrap();
    assert_eq!(cart.items.len(), 2);
    let mug_line = cart.items.iter().find(|i| i.product_id == mug.id).unwrap();
    assert_eq!(mug_line.quantity, 5);
    assert_eq!(mug_line.total_price, 600);
    assert_eq!(mug_line.product_name, "Ferris Mug");
    assert_eq!(cart.total_items, 6);
    assert_eq!(cart.total_amount, 615);
    Ok(())
}

#[tokio::test]
async fn replace_sets_rather_than_adds() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = shopper();
    let mug = create_product(&state, "Ferris Mug", 120, 10).await?;
    add_to_cart(&state, &user, &mug, 4).await?;

    let cart = cart_service::replace_item(
        &state,
        &user,
        AddToCartRequest {
            product_id: mug.id,
            quantity: 1,
        },
    )
    .await?
    .data
    .unwrap();

    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 1);
    assert_eq!(cart.total_amount, 120);
    Ok(())
}

#[tokio::test]
async fn line_quantity_updates_recompute_the_total() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = shopper();
    let mug = create_product(&state, "Ferris Mug", 120, 10).await?;
    let pen = create_product(&state, "Pen", 15, 10).await?;
    add_to_cart(&state, &user, &mug, 1).await?;
    add_to_cart(&state, &user, &pen, 2).await?;

    let cart = cart_service::get_cart(&state, &user).await?.data.unwrap();
    let mug_line = cart.items.iter().find(|i| i.product_id == mug.id).unwrap().id;

    let cart = cart_service::update_item_quantity(
        &state,
        &user,
        mug_line,
        UpdateCartItemRequest { quantity: 3 },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(cart.total_amount, 3 * 120 + 2 * 15);

    let cart = cart_service::remove_item(&state, &user, mug_line)
        .await?
        .data
        .unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.total_amount, 30);
    Ok(())
}

#[tokio::test]
async fn another_users_line_is_off_limits() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let owner = shopper();
    let intruder = shopper();
    let mug = create_product(&state, "Ferris Mug", 120, 10).await?;
    add_to_cart(&state, &owner, &mug, 2).await?;
    let line = cart_service::get_cart(&state, &owner).await?.data.unwrap().items[0].id;

    let err = cart_service::update_item_quantity(
        &state,
        &intruder,
        line,
        UpdateCartItemRequest { quantity: 9 },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotOwner));

    let err = cart_service::remove_item(&state, &intruder, line)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotOwner));

    let err = cart_service::remove_item(&state, &owner, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let cart = cart_service::get_cart(&state, &owner).await?.data.unwrap();
    assert_eq!(cart.items[0].quantity, 2);
    Ok(())
}

#[tokio::test]
async fn clearing_keeps_the_cart_itself() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = shopper();
    let mug = create_product(&state, "Ferris Mug", 120, 10).await?;
    add_to_cart(&state, &user, &mug, 2).await?;
    let before = cart_service::get_cart(&state, &user).await?.data.unwrap();

    let after = cart_service::clear_cart(&state, &user).await?.data.unwrap();

    assert_eq!(before.id, after.id);
    assert!(after.items.is_empty());
    assert_eq!(after.total_amount, 0);
    assert_eq!(after.total_items, 0);

    let entries = AuditLogs::find()
        .filter(AuditCol::Action.eq("cart_clear"))
        .all(&state.orm)
        .await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].user_id, Some(user.user_id));
    assert_eq!(entries[0].resource.as_deref(), Some("carts"));
    Ok(())
}

#[tokio::test]
async fn only_approved_products_can_be_added() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = shopper();
    let draft =
        create_product_with_status(&state, "Draft", 10, 10, ProductStatus::Pending).await?;

    let err = add_to_cart(&state, &user, &draft, 1).await.unwrap_err();
    let err = err.downcast::<AppError>()?;
    assert!(matches!(err, AppError::ProductUnavailable { .. }));

    let err = cart_service::add_item(
        &state,
        &user,
        AddToCartRequest {
            product_id: Uuid::new_v4(),
            quantity: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn cart_quantities_are_bounded_by_stock() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = shopper();
    let mug = create_product(&state, "Ferris Mug", 120, 3).await?;
    add_to_cart(&state, &user, &mug, 2).await?;

    let err = cart_service::add_item(
        &state,
        &user,
        AddToCartRequest {
            product_id: mug.id,
            quantity: 2,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientStock { available: 3, requested: 4, .. }
    ));

    let err = cart_service::add_item(
        &state,
        &user,
        AddToCartRequest {
            product_id: mug.id,
            quantity: 0,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let cart = cart_service::get_cart(&state, &user).await?.data.unwrap();
    assert_eq!(cart.items[0].quantity, 2);
    Ok(())
}
