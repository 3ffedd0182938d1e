use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit_best_effort,
    dto::orders::{OrderList, OrderWithItems, UpdateOrderStatusRequest},
    entity::{
        orders::{ActiveModel as OrderActive, Entity as Orders, Model as OrderModel},
        payments::{ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments},
        sea_orm_active_enums::{DeliveryStatus, OrderStatus, PaymentMethod, PaymentStatus},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

/// Checks a non-cancelling status change. Cancellation has its own guard in
/// `order_service::enter_cancelled`.
fn check_transition(from: OrderStatus, to: OrderStatus) -> AppResult<()> {
    if from.is_terminal() {
        return Err(AppError::InvalidTransition { from, to });
    }
    Ok(())
}

fn delivery_status_for(status: OrderStatus, current: DeliveryStatus) -> DeliveryStatus {
    match status {
        OrderStatus::Pending => DeliveryStatus::Pending,
        OrderStatus::Processing => DeliveryStatus::Shipping,
        OrderStatus::Completed => DeliveryStatus::Delivered,
        OrderStatus::Cancelled => current,
    }
}

/// Cash is collected on delivery, so completing the order settles it.
async fn settle_cash_on_delivery<C>(
    conn: &C,
    order_id: Uuid,
    now: DateTimeWithTimeZone,
) -> AppResult<()>
where
    C: ConnectionTrait,
{
    let payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(order_id))
        .one(conn)
        .await?;

    let Some(payment) = payment else {
        return Ok(());
    };
    if payment.payment_method != PaymentMethod::CashOnDelivery
        || payment.payment_status != PaymentStatus::Pending
    {
        return Ok(());
    }

    let mut active: PaymentActive = payment.into();
    active.payment_status = Set(PaymentStatus::Paid);
    active.paid_at = Set(Some(now));
    active.updated_at = Set(now);
    active.update(conn).await?;
    Ok(())
}

async fn advance<C>(conn: &C, order: OrderModel, to: OrderStatus) -> AppResult<OrderModel>
where
    C: ConnectionTrait,
{
    check_transition(order.order_status, to)?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    let order_id = order.id;
    let delivery = delivery_status_for(to, order.delivery_status);

    let mut active: OrderActive = order.into();
    active.order_status = Set(to);
    active.delivery_status = Set(delivery);
    active.updated_at = Set(now);
    if to == OrderStatus::Completed {
        active.delivered_date = Set(Some(now));
    }
    let order = active.update(conn).await?;

    if to == OrderStatus::Completed {
        settle_cash_on_delivery(conn, order_id, now).await?;
    }
    Ok(order)
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (orders, meta) = order_service::paginate_orders(state, Condition::all(), query).await?;
    Ok(ApiResponse::success("Orders", orders, Some(meta)))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let data = order_service::load_order_detail(&state.orm, order).await?;
    Ok(ApiResponse::success("Order found", data, Some(Meta::empty())))
}

#[tracing::instrument(skip(state, user, payload), fields(admin_id = %user.user_id, to = %payload.status))]
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let from = existing.order_status;

    let order = match payload.status {
        OrderStatus::Cancelled => {
            let reason = order_service::normalize_reason(payload.cancellation_reason);
            order_service::enter_cancelled(&txn, existing, reason, state.policy.stock_retry_limit)
                .await?
        }
        to => advance(&txn, existing, to).await?,
    };
    let data = order_service::load_order_detail(&txn, order).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %data.order.id,
        %from,
        to = %data.order.order_status,
        "order status updated"
    );
    log_audit_best_effort(
        state,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": data.order.id,
            "from": from,
            "to": data.order.order_status,
        })),
    )
    .await;

    Ok(ApiResponse::success("Order updated", data, Some(Meta::empty())))
}
