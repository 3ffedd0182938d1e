//! Inventory ledger: the only writer of `products.stock` and `products.sold_count`.
//!
//! Every write is a compare-and-swap on `products.version`. A writer that loses
//! the race re-reads the row, re-checks the precondition and tries again, up to
//! the configured number of attempts.

use std::future::Future;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, prelude::DateTimeWithTimeZone};
use uuid::Uuid;

use crate::{
    entity::products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
};

/// Stock counters of a product right after a successful ledger write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevel {
    pub product_id: Uuid,
    pub stock: i32,
    pub sold_count: i32,
}

/// Outcome of a single compare-and-swap attempt.
#[derive(Debug)]
pub(crate) enum Attempt<T> {
    Applied(T),
    Conflict,
}

/// Runs `attempt` until it applies, giving up with `ConcurrentModification`
/// once `max_attempts` conflicts have been seen. Errors end the loop at once.
pub(crate) async fn retry_on_conflict<T, F, Fut>(
    product_id: Uuid,
    max_attempts: u32,
    mut attempt: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<Attempt<T>>>,
{
    let max_attempts = max_attempts.max(1);
    for n in 1..=max_attempts {
        match attempt().await? {
            Attempt::Applied(value) => return Ok(value),
            Attempt::Conflict => {
                tracing::debug!(%product_id, attempt = n, "stock version conflict");
            }
        }
    }

    tracing::warn!(%product_id, max_attempts, "stock update gave up after repeated conflicts");
    Err(AppError::ConcurrentModification { product_id })
}

async fn load_product<C>(conn: &C, product_id: Uuid) -> AppResult<ProductModel>
where
    C: ConnectionTrait,
{
    Products::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

async fn try_decrement<C>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<Attempt<StockLevel>>
where
    C: ConnectionTrait,
{
    let product = load_product(conn, product_id).await?;
    decrement_from(conn, &product, quantity).await
}

/// Guarded write against a snapshot; `Conflict` when the row moved on since.
async fn decrement_from<C>(
    conn: &C,
    product: &ProductModel,
    quantity: i32,
) -> AppResult<Attempt<StockLevel>>
where
    C: ConnectionTrait,
{
    let product_id = product.id;
    if product.stock < quantity {
        return Err(AppError::InsufficientStock {
            product: product.name.clone(),
            available: product.stock,
            requested: quantity,
        });
    }

    let now: DateTimeWithTimeZone = Utc::now().into();
    let result = Products::update_many()
        .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(quantity))
        .col_expr(ProdCol::SoldCount, Expr::col(ProdCol::SoldCount).add(quantity))
        .col_expr(ProdCol::Version, Expr::col(ProdCol::Version).add(1i64))
        .col_expr(ProdCol::UpdatedAt, Expr::value(now))
        .filter(ProdCol::Id.eq(product_id))
        .filter(ProdCol::Version.eq(product.version))
        .filter(ProdCol::Stock.gte(quantity))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Ok(Attempt::Conflict);
    }

    Ok(Attempt::Applied(StockLevel {
        product_id,
        stock: product.stock - quantity,
        sold_count: product.sold_count + quantity,
    }))
}

async fn try_increment<C>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<Attempt<StockLevel>>
where
    C: ConnectionTrait,
{
    let product = load_product(conn, product_id).await?;
    increment_from(conn, &product, quantity).await
}

async fn increment_from<C>(
    conn: &C,
    product: &ProductModel,
    quantity: i32,
) -> AppResult<Attempt<StockLevel>>
where
    C: ConnectionTrait,
{
    let product_id = product.id;
    let sold_count = product.sold_count - product.sold_count.min(quantity);

    let now: DateTimeWithTimeZone = Utc::now().into();
    let result = Products::update_many()
        .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(quantity))
        .col_expr(ProdCol::SoldCount, Expr::value(sold_count))
        .col_expr(ProdCol::Version, Expr::col(ProdCol::Version).add(1i64))
        .col_expr(ProdCol::UpdatedAt, Expr::value(now))
        .filter(ProdCol::Id.eq(product_id))
        .filter(ProdCol::Version.eq(product.version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Ok(Attempt::Conflict);
    }

    Ok(Attempt::Applied(StockLevel {
        product_id,
        stock: product.stock + quantity,
        sold_count,
    }))
}

fn ensure_positive(quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Takes `quantity` units out of stock and adds them to the sold count.
///
/// Fails with `InsufficientStock` when fewer than `quantity` units remain. The
/// caller owns the surrounding transaction; an error must abort it.
pub async fn decrement<C>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
    max_attempts: u32,
) -> AppResult<StockLevel>
where
    C: ConnectionTrait,
{
    ensure_positive(quantity)?;
    retry_on_conflict(product_id, max_attempts, || {
        try_decrement(conn, product_id, quantity)
    })
    .await
}

/// Puts `quantity` units back into stock.
///
/// The sold count shrinks by the same amount but never below zero.
pub async fn increment<C>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
    max_attempts: u32,
) -> AppResult<StockLevel>
where
    C: ConnectionTrait,
{
    ensure_positive(quantity)?;
    retry_on_conflict(product_id, max_attempts, || {
        try_increment(conn, product_id, quantity)
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::test_utils::{insert_product, setup_test_db};

    #[tokio::test]
    async fn stale_snapshot_conflicts_then_retry_applies() {
        let db = setup_test_db().await.unwrap();
        let product = insert_product(&db, "Widget", 10).await.unwrap();
        let stale = load_product(&db, product.id).await.unwrap();

        // A competing writer lands first and bumps the version.
        decrement(&db, product.id, 3, 1).await.unwrap();

        let attempt = decrement_from(&db, &stale, 2).await.unwrap();
        assert!(matches!(attempt, Attempt::Conflict));
        let untouched = load_product(&db, product.id).await.unwrap();
        assert_eq!((untouched.stock, untouched.sold_count, untouched.version), (7, 3, 1));

        let calls = Cell::new(0u32);
        let level = retry_on_conflict(product.id, 3, || {
            calls.set(calls.get() + 1);
            let first = calls.get() == 1;
            let (db, stale) = (&db, &stale);
            async move {
                if first {
                    decrement_from(db, stale, 2).await
                } else {
                    try_decrement(db, stale.id, 2).await
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!((level.stock, level.sold_count), (5, 5));
        let after = load_product(&db, product.id).await.unwrap();
        assert_eq!((after.stock, after.sold_count, after.version), (5, 5, 2));
    }

    #[tokio::test]
    async fn stale_restock_conflicts_and_persistent_conflicts_give_up() {
        let db = setup_test_db().await.unwrap();
        let product = insert_product(&db, "Widget", 4).await.unwrap();
        let stale = load_product(&db, product.id).await.unwrap();
        decrement(&db, product.id, 2, 1).await.unwrap();

        let attempt = increment_from(&db, &stale, 1).await.unwrap();
        assert!(matches!(attempt, Attempt::Conflict));

        let result = retry_on_conflict(product.id, 2, || increment_from(&db, &stale, 1)).await;
        assert!(matches!(
            result,
            Err(AppError::ConcurrentModification { product_id }) if product_id == product.id
        ));

        let after = load_product(&db, product.id).await.unwrap();
        assert_eq!((after.stock, after.sold_count, after.version), (2, 2, 1));
    }

    #[tokio::test]
    async fn gives_up_after_the_configured_attempts() {
        let product_id = Uuid::new_v4();
        let calls = Cell::new(0u32);

        let result: AppResult<()> = retry_on_conflict(product_id, 3, || {
            calls.set(calls.get() + 1);
            async { Ok::<_, AppError>(Attempt::Conflict) }
        })
        .await;

        assert!(matches!(
            result,
            Err(AppError::ConcurrentModification { product_id: id }) if id == product_id
        ));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn applies_once_the_conflict_clears() {
        let calls = Cell::new(0u32);

        let result = retry_on_conflict(Uuid::new_v4(), 5, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Ok::<_, AppError>(Attempt::Conflict)
                } else {
                    Ok(Attempt::Applied(n))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn errors_are_not_retried() {
        let calls = Cell::new(0u32);

        let result: AppResult<()> = retry_on_conflict(Uuid::new_v4(), 5, || {
            calls.set(calls.get() + 1);
            async {
                Err::<Attempt<()>, _>(AppError::InsufficientStock {
                    product: "Widget".into(),
                    available: 0,
                    requested: 1,
                })
            }
        })
        .await;

        assert!(matches!(result, Err(AppError::InsufficientStock { .. })));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let calls = Cell::new(0u32);

        let result = retry_on_conflict(Uuid::new_v4(), 0, || {
            calls.set(calls.get() + 1);
            async { Ok::<_, AppError>(Attempt::Applied(())) }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.get(), 1);
    }
}
