//! Checkout: turns the caller's cart into a priced, stock-committed order.
//!
//! Everything from reading the cart to writing the payment row happens in one
//! database transaction. Any error drops the transaction, so a failed checkout
//! leaves no order, no order items, no payment and no stock movement behind.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use uuid::Uuid;

use crate::{
    audit::log_audit_best_effort,
    config::CheckoutPolicy,
    dto::orders::{CheckoutRequest, OrderWithItems},
    entity::{
        cart_items::Model as CartItemModel,
        order_items::ActiveModel as OrderItemActive,
        orders::ActiveModel as OrderActive,
        payments::ActiveModel as PaymentActive,
        products::Model as ProductModel,
        sea_orm_active_enums::{DeliveryStatus, OrderStatus, PaymentMethod, PaymentStatus},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::OrderItem,
    response::{ApiResponse, Meta},
    services::{cart_service, inventory_service, product_service},
    state::AppState,
};

const MAX_SHIPPING_ADDRESS_LEN: usize = 500;
const MAX_PHONE_LEN: usize = 20;

/// A cart line re-priced against the live catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub product_variant: Option<String>,
}

impl PricedLine {
    pub fn total(&self) -> i64 {
        cart_service::line_total(self.unit_price, self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub discount: i64,
    pub grand_total: i64,
}

/// Validated checkout input.
#[derive(Debug)]
struct ShippingDetails {
    address: String,
    phone: String,
    notes: Option<String>,
    payment_method: PaymentMethod,
}

fn validate_request(payload: CheckoutRequest) -> AppResult<ShippingDetails> {
    let payment_method = payload
        .payment_method
        .parse::<PaymentMethod>()
        .map_err(AppError::InvalidPaymentMethod)?;

    let address = payload.shipping_address.trim().to_string();
    if address.is_empty() {
        return Err(AppError::BadRequest("shipping address is required".into()));
    }
    if address.chars().count() > MAX_SHIPPING_ADDRESS_LEN {
        return Err(AppError::BadRequest(format!(
            "shipping address must not exceed {MAX_SHIPPING_ADDRESS_LEN} characters"
        )));
    }

    let phone = payload.phone_number.trim().to_string();
    if phone.is_empty() {
        return Err(AppError::BadRequest("phone number is required".into()));
    }
    if phone.chars().count() > MAX_PHONE_LEN {
        return Err(AppError::BadRequest(format!(
            "phone number must not exceed {MAX_PHONE_LEN} characters"
        )));
    }

    let notes = payload
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    Ok(ShippingDetails {
        address,
        phone,
        notes,
        payment_method,
    })
}

/// Checks every cart line against the catalog and prices it at the current
/// catalog price. The add-time price stored on the cart line is ignored.
pub fn price_lines(
    items: &[CartItemModel],
    products: &HashMap<Uuid, ProductModel>,
) -> AppResult<Vec<PricedLine>> {
    items
        .iter()
        .map(|item| {
            let product = products
                .get(&item.product_id)
                .ok_or_else(|| AppError::ProductUnavailable {
                    product: item.product_id.to_string(),
                })?;
            if !product.status.is_sellable() {
                return Err(AppError::ProductUnavailable {
                    product: product.name.clone(),
                });
            }
            if item.quantity > product.stock {
                return Err(AppError::InsufficientStock {
                    product: product.name.clone(),
                    available: product.stock,
                    requested: item.quantity,
                });
            }
            Ok(PricedLine {
                product_id: product.id,
                product_name: product.name.clone(),
                quantity: item.quantity,
                unit_price: product.price,
                product_variant: item.product_variant.clone(),
            })
        })
        .collect()
}

/// Extension point for promotions; nothing is discounted today.
fn discount_for(_subtotal: i64) -> i64 {
    0
}

pub fn price_order(lines: &[PricedLine], shipping_fee: i64) -> OrderTotals {
    let subtotal = lines.iter().map(PricedLine::total).sum();
    let discount = discount_for(subtotal);
    OrderTotals {
        subtotal,
        shipping_fee,
        discount,
        grand_total: subtotal + shipping_fee - discount,
    }
}

fn build_order_number(order_id: Uuid, now: DateTime<Utc>) -> String {
    let date = now.format("%Y%m%d");
    let suffix = order_id.simple().to_string();
    let short: String = suffix.chars().take(8).collect();
    format!("ORD-{}-{}", date, short.to_uppercase())
}

/// Stand-in for a gateway reference; no settlement happens here.
fn build_transaction_code(method: PaymentMethod, now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().rem_euclid(100_000_000);
    format!("{}-TXN{:08}", method.code(), millis)
}

#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let details = validate_request(payload)?;
    let policy: &CheckoutPolicy = &state.policy;

    let txn = state.orm.begin().await?;

    let cart = cart_service::find_cart(&txn, user.user_id)
        .await?
        .ok_or(AppError::EmptyCart)?;
    let cart_items = cart_service::cart_items(&txn, cart.id).await?;
    if cart_items.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let product_ids: Vec<Uuid> = cart_items.iter().map(|item| item.product_id).collect();
    let products = product_service::get_products(&txn, &product_ids, true).await?;
    let lines = price_lines(&cart_items, &products)?;
    let totals = price_order(&lines, policy.shipping_fee);

    let now = Utc::now();
    let stamp: DateTimeWithTimeZone = now.into();
    let order_id = Uuid::new_v4();

    let order = OrderActive {
        id: Set(order_id),
        order_number: Set(build_order_number(order_id, now)),
        user_id: Set(user.user_id),
        subtotal: Set(totals.subtotal),
        shipping_fee: Set(totals.shipping_fee),
        discount: Set(totals.discount),
        total_amount: Set(totals.grand_total),
        order_status: Set(OrderStatus::Pending),
        delivery_status: Set(DeliveryStatus::Pending),
        shipping_address: Set(details.address),
        phone_number: Set(details.phone),
        notes: Set(details.notes),
        cancellation_reason: Set(None),
        order_date: Set(stamp),
        delivered_date: Set(None),
        created_at: Set(stamp),
        updated_at: Set(stamp),
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());
    for (line_number, line) in (1..).zip(lines.iter()) {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            line_number: Set(line_number),
            product_name: Set(line.product_name.clone()),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            total_price: Set(line.total()),
            product_variant: Set(line.product_variant.clone()),
            created_at: Set(stamp),
        }
        .insert(&txn)
        .await?;
        items.push(item.into());

        inventory_service::decrement(
            &txn,
            line.product_id,
            line.quantity,
            policy.stock_retry_limit,
        )
        .await?;
    }

    let payment = PaymentActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        amount: Set(totals.grand_total),
        payment_method: Set(details.payment_method),
        payment_status: Set(PaymentStatus::Pending),
        transaction_code: Set(build_transaction_code(details.payment_method, now)),
        paid_at: Set(None),
        created_at: Set(stamp),
        updated_at: Set(stamp),
    }
    .insert(&txn)
    .await?;

    if policy.clear_cart_on_checkout {
        cart_service::clear_items(&txn, cart).await?;
    }

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        total_amount = order.total_amount,
        lines = items.len(),
        "order placed"
    );
    log_audit_best_effort(
        state,
        Some(user.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "total_amount": order.total_amount })),
    )
    .await;

    Ok(ApiResponse::success(
        "Checkout success",
        OrderWithItems {
            order: order.into(),
            items,
            payment: Some(payment.into()),
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::entity::sea_orm_active_enums::ProductStatus;

    fn product(name: &str, price: i64, stock: i32, status: ProductStatus) -> ProductModel {
        let now: DateTimeWithTimeZone = Utc::now().into();
        ProductModel {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            price,
            stock,
            sold_count: 0,
            status,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn cart_line(product: &ProductModel, quantity: i32, add_time_price: i64) -> CartItemModel {
        let now: DateTimeWithTimeZone = Utc::now().into();
        CartItemModel {
            id: Uuid::new_v4(),
            cart_id: Uuid::new_v4(),
            product_id: product.id,
            quantity,
            unit_price: add_time_price,
            total_price: add_time_price * i64::from(quantity),
            product_variant: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog(products: &[&ProductModel]) -> HashMap<Uuid, ProductModel> {
        products.iter().map(|p| (p.id, (*p).clone())).collect()
    }

    fn request(method: &str) -> CheckoutRequest {
        CheckoutRequest {
            shipping_address: " 1 Crab Street ".into(),
            phone_number: "0900000000".into(),
            payment_method: method.into(),
            notes: Some("   ".into()),
        }
    }

    #[test]
    fn totals_follow_the_reference_scenario() {
        let a = product("A", 100, 5, ProductStatus::Approved);
        let b = product("B", 50, 3, ProductStatus::Approved);
        let lines =
            price_lines(&[cart_line(&a, 2, 100), cart_line(&b, 1, 50)], &catalog(&[&a, &b]))
                .unwrap();

        let totals = price_order(&lines, 30);

        assert_eq!(totals.subtotal, 250);
        assert_eq!(totals.discount, 0);
        assert_eq!(totals.grand_total, 280);
        assert_eq!(
            lines.iter().map(PricedLine::total).sum::<i64>(),
            totals.subtotal
        );
    }

    #[test]
    fn lines_are_repriced_from_the_catalog() {
        let a = product("A", 120, 5, ProductStatus::Approved);
        let lines = price_lines(&[cart_line(&a, 2, 1)], &catalog(&[&a])).unwrap();

        assert_eq!(lines[0].unit_price, 120);
        assert_eq!(lines[0].total(), 240);
    }

    #[test]
    fn unapproved_products_are_unavailable() {
        let a = product("A", 100, 5, ProductStatus::Discontinued);
        let err = price_lines(&[cart_line(&a, 1, 100)], &catalog(&[&a])).unwrap_err();

        assert!(matches!(err, AppError::ProductUnavailable { product } if product == "A"));
    }

    #[test]
    fn missing_products_are_unavailable() {
        let a = product("A", 100, 5, ProductStatus::Approved);
        let err = price_lines(&[cart_line(&a, 1, 100)], &HashMap::new()).unwrap_err();

        assert!(matches!(err, AppError::ProductUnavailable { .. }));
    }

    #[test]
    fn short_stock_reports_available_and_requested() {
        let a = product("A", 100, 1, ProductStatus::Approved);
        let err = price_lines(&[cart_line(&a, 3, 100)], &catalog(&[&a])).unwrap_err();

        assert!(matches!(
            err,
            AppError::InsufficientStock { product, available: 1, requested: 3 } if product == "A"
        ));
    }

    #[test]
    fn request_is_trimmed_and_payment_method_parsed() {
        let details = validate_request(request("cod")).unwrap();

        assert_eq!(details.address, "1 Crab Street");
        assert_eq!(details.notes, None);
        assert_eq!(details.payment_method, PaymentMethod::CashOnDelivery);
    }

    #[test]
    fn unknown_payment_method_is_rejected() {
        let err = validate_request(request("bitcoin")).unwrap_err();
        assert!(matches!(err, AppError::InvalidPaymentMethod(m) if m == "bitcoin"));
    }

    #[test]
    fn blank_or_oversized_contact_details_are_rejected() {
        let mut blank = request("QR");
        blank.shipping_address = "  ".into();
        assert!(matches!(validate_request(blank), Err(AppError::BadRequest(_))));

        let mut long_phone = request("QR");
        long_phone.phone_number = "1".repeat(MAX_PHONE_LEN + 1);
        assert!(matches!(validate_request(long_phone), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn order_number_carries_date_and_id_prefix() {
        let id = Uuid::parse_str("1b4e28ba-2fa1-11d2-883f-0016d3cca427").unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();

        assert_eq!(build_order_number(id, now), "ORD-20261018-1B4E28BA");
    }

    #[test]
    fn transaction_code_is_method_specific() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let cod = build_transaction_code(PaymentMethod::CashOnDelivery, now);
        let qr = build_transaction_code(PaymentMethod::Qr, now);

        assert!(cod.starts_with("COD-TXN"));
        assert!(qr.starts_with("QR-TXN"));
        assert_eq!(cod.len(), "COD-TXN".len() + 8);
    }
}
