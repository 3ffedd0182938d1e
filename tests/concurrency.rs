mod common;

use common::*;
use marketplace_core::{
    entity::orders::Entity as Orders,
    error::AppError,
    services::{checkout_service, inventory_service},
};
use sea_orm::{EntityTrait, PaginatorTrait, TransactionTrait};

#[tokio::test]
async fn last_unit_goes_to_exactly_one_buyer() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let product = create_product(&state, "Last One", 500, 1).await?;
    let alice = shopper();
    let bob = shopper();
    add_to_cart(&state, &alice, &product, 1).await?;
    add_to_cart(&state, &bob, &product, 1).await?;

    let (first, second) = tokio::join!(
        checkout_service::checkout(&state, &alice, checkout_request("COD")),
        checkout_service::checkout(&state, &bob, checkout_request("COD")),
    );

    let outcomes = [first.map(|_| ()), second.map(|_| ())];
    let won = outcomes.iter().filter(|r| r.is_ok()).count();
    let short = outcomes
        .iter()
        .filter(|r| matches!(r, Err(AppError::InsufficientStock { available: 0, requested: 1, .. })))
        .count();
    assert_eq!(won, 1);
    assert_eq!(short, 1);

    let product = reload_product(&state, product.id).await?;
    assert_eq!(product.stock, 0);
    assert_eq!(product.sold_count, 1);
    assert_eq!(Orders::find().count(&state.orm).await?, 1);
    Ok(())
}

#[tokio::test]
async fn ledger_refuses_to_go_negative() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let product = create_product(&state, "Bolt", 5, 2).await?;
    let retries = state.policy.stock_retry_limit;

    let txn = state.orm.begin().await?;
    let level = inventory_service::decrement(&txn, product.id, 2, retries).await?;
    assert_eq!((level.stock, level.sold_count), (0, 2));

    let err = inventory_service::decrement(&txn, product.id, 1, retries)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { available: 0, .. }));
    txn.commit().await?;

    let product = reload_product(&state, product.id).await?;
    assert_eq!((product.stock, product.sold_count, product.version), (0, 2, 1));
    Ok(())
}

#[tokio::test]
async fn restock_never_drives_sold_count_below_zero() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let product = create_product(&state, "Bolt", 5, 2).await?;

    let level = inventory_service::increment(&state.orm, product.id, 3, 5).await?;

    assert_eq!((level.stock, level.sold_count), (5, 0));
    let product = reload_product(&state, product.id).await?;
    assert_eq!((product.stock, product.sold_count), (5, 0));
    Ok(())
}

#[tokio::test]
async fn ledger_rejects_non_positive_quantities() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let product = create_product(&state, "Bolt", 5, 2).await?;

    let err = inventory_service::decrement(&state.orm, product.id, 0, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(reload_product(&state, product.id).await?.version, 0);
    Ok(())
}
