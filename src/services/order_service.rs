//! Order reads and the cancellation half of the order lifecycle.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit_best_effort,
    dto::orders::{CancelOrderRequest, OrderList, OrderWithItems},
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{Column as OrderCol, Entity as Orders, Model as OrderModel},
        payments::{Column as PaymentCol, Entity as Payments},
        sea_orm_active_enums::OrderStatus,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::OrderStatistics,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::inventory_service,
    state::AppState,
};

pub(crate) const MAX_CANCELLATION_REASON_LEN: usize = 500;

/// Trims the reason, drops it when blank and caps it at
/// `MAX_CANCELLATION_REASON_LEN` characters.
pub(crate) fn normalize_reason(reason: Option<String>) -> Option<String> {
    let reason = reason?;
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_CANCELLATION_REASON_LEN).collect())
}

pub(crate) fn ensure_can_view(user: &AuthUser, order: &OrderModel) -> AppResult<()> {
    if order.user_id != user.user_id && !user.is_admin() {
        return Err(AppError::NotOwner);
    }
    Ok(())
}

/// Applies a status filter and sort order shared by the user and admin listings,
/// then returns one page of orders with its metadata.
pub(crate) async fn paginate_orders(
    state: &AppState,
    mut condition: Condition,
    query: OrderListQuery,
) -> AppResult<(OrderList, Meta)> {
    let (page, limit, offset) = query.pagination.normalize();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::OrderStatus.eq(status));
    }

    let mut finder: Select<Orders> = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok((OrderList { items: orders }, Meta::new(page, limit, total)))
}

/// Loads the order's items (in line order) and its payment.
pub(crate) async fn load_order_detail<C>(conn: &C, order: OrderModel) -> AppResult<OrderWithItems>
where
    C: ConnectionTrait,
{
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::LineNumber)
        .all(conn)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .one(conn)
        .await?
        .map(Into::into);

    Ok(OrderWithItems {
        order: order.into(),
        items,
        payment,
    })
}

/// Puts every unit of the order back into stock.
async fn restock_order<C>(conn: &C, order_id: Uuid, retry_limit: u32) -> AppResult<()>
where
    C: ConnectionTrait,
{
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::LineNumber)
        .all(conn)
        .await?;

    for item in items {
        let level =
            inventory_service::increment(conn, item.product_id, item.quantity, retry_limit).await?;
        tracing::debug!(
            %order_id,
            product_id = %level.product_id,
            stock = level.stock,
            sold_count = level.sold_count,
            "stock restored"
        );
    }
    Ok(())
}

/// Moves an open order to CANCELLED and restores its stock.
///
/// Both the owner's cancel and the admin status update go through here. The
/// status flip is conditional on the status that was read, so of two racing
/// cancellations only one restocks; the other fails with `OrderNotCancellable`.
pub(crate) async fn enter_cancelled<C>(
    conn: &C,
    order: OrderModel,
    reason: Option<String>,
    retry_limit: u32,
) -> AppResult<OrderModel>
where
    C: ConnectionTrait,
{
    if !order.order_status.can_cancel() {
        return Err(AppError::OrderNotCancellable {
            status: order.order_status,
        });
    }

    let now: DateTimeWithTimeZone = Utc::now().into();
    let result = Orders::update_many()
        .col_expr(OrderCol::OrderStatus, Expr::value(OrderStatus::Cancelled))
        .col_expr(OrderCol::CancellationReason, Expr::value(reason))
        .col_expr(OrderCol::UpdatedAt, Expr::value(now))
        .filter(OrderCol::Id.eq(order.id))
        .filter(OrderCol::OrderStatus.eq(order.order_status))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        let current = Orders::find_by_id(order.id)
            .one(conn)
            .await?
            .ok_or(AppError::NotFound)?;
        return Err(AppError::OrderNotCancellable {
            status: current.order_status,
        });
    }

    restock_order(conn, order.id, retry_limit).await?;

    Orders::find_by_id(order.id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    let (orders, meta) = paginate_orders(state, condition, query).await?;
    Ok(ApiResponse::success("Ok", orders, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    ensure_can_view(user, &order)?;

    let data = load_order_detail(&state.orm, order).await?;
    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

#[tracing::instrument(skip(state, user, payload), fields(user_id = %user.user_id))]
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: CancelOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let reason = normalize_reason(payload.reason);

    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    ensure_can_view(user, &order)?;

    let order = enter_cancelled(&txn, order, reason, state.policy.stock_retry_limit).await?;
    let data = load_order_detail(&txn, order).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %data.order.id,
        order_number = %data.order.order_number,
        "order cancelled"
    );
    log_audit_best_effort(
        state,
        Some(user.user_id),
        "order_cancel",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": data.order.id,
            "reason": data.order.cancellation_reason,
        })),
    )
    .await;

    Ok(ApiResponse::success("Order cancelled", data, Some(Meta::empty())))
}

pub async fn order_statistics(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderStatistics>> {
    let mine = || Orders::find().filter(OrderCol::UserId.eq(user.user_id));
    let count_in = |status: OrderStatus| mine().filter(OrderCol::OrderStatus.eq(status));

    let stats = OrderStatistics {
        total_count: mine().count(&state.orm).await?,
        pending_count: count_in(OrderStatus::Pending).count(&state.orm).await?,
        shipping_count: count_in(OrderStatus::Processing).count(&state.orm).await?,
        completed_count: count_in(OrderStatus::Completed).count(&state.orm).await?,
        cancelled_count: count_in(OrderStatus::Cancelled).count(&state.orm).await?,
    };

    Ok(ApiResponse::success("OK", stats, Some(Meta::empty())))
}
