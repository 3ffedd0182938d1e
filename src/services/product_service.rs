//! Read-only view of the catalog. Products are owned elsewhere; this crate only
//! reads price, stock and status here and writes stock through the ledger.

use std::collections::HashMap;

use sea_orm::sea_query::LockType;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::{
    entity::products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
};

pub async fn get_product<C>(conn: &C, id: Uuid) -> AppResult<ProductModel>
where
    C: ConnectionTrait,
{
    Products::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

/// Loads the given products keyed by id. Missing ids are simply absent.
/// With `lock` set the rows are read `FOR UPDATE` where the backend supports it.
pub async fn get_products<C>(
    conn: &C,
    ids: &[Uuid],
    lock: bool,
) -> AppResult<HashMap<Uuid, ProductModel>>
where
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut finder = Products::find().filter(ProdCol::Id.is_in(ids.iter().copied()));
    if lock {
        finder = finder.lock(LockType::Update);
    }

    Ok(finder
        .all(conn)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect())
}
