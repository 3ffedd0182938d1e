use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    cart_items::Model as CartItemModel,
    carts::Model as CartModel,
    order_items::Model as OrderItemModel,
    orders::Model as OrderModel,
    payments::Model as PaymentModel,
    products::Model as ProductModel,
    sea_orm_active_enums::{DeliveryStatus, OrderStatus, PaymentMethod, PaymentStatus},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    /// Live stock, for display only.
    pub product_stock: i32,
    pub quantity: i32,
    /// Price captured when the line was added or last re-quantified.
    pub unit_price: i64,
    pub total_price: i64,
    pub product_variant: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    pub fn from_entity(model: CartItemModel, product: Option<&ProductModel>) -> Self {
        Self {
            id: model.id,
            cart_id: model.cart_id,
            product_id: model.product_id,
            product_name: product.map(|p| p.name.clone()).unwrap_or_default(),
            product_stock: product.map(|p| p.stock).unwrap_or(0),
            quantity: model.quantity,
            unit_price: model.unit_price,
            total_price: model.total_price,
            product_variant: model.product_variant,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartItem>,
    pub total_items: i32,
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn from_entity(model: CartModel, items: Vec<CartItem>) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            total_items: items.iter().map(|item| item.quantity).sum(),
            items,
            total_amount: model.total_amount,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub discount: i64,
    pub total_amount: i64,
    pub order_status: OrderStatus,
    pub delivery_status: DeliveryStatus,
    pub shipping_address: String,
    pub phone_number: String,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub order_date: DateTime<Utc>,
    pub delivered_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderModel> for Order {
    fn from(model: OrderModel) -> Self {
        Self {
            id: model.id,
            order_number: model.order_number,
            user_id: model.user_id,
            subtotal: model.subtotal,
            shipping_fee: model.shipping_fee,
            discount: model.discount,
            total_amount: model.total_amount,
            order_status: model.order_status,
            delivery_status: model.delivery_status,
            shipping_address: model.shipping_address,
            phone_number: model.phone_number,
            notes: model.notes,
            cancellation_reason: model.cancellation_reason,
            order_date: model.order_date.with_timezone(&Utc),
            delivered_date: model.delivered_date.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub line_number: i32,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub total_price: i64,
    pub product_variant: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<OrderItemModel> for OrderItem {
    fn from(model: OrderItemModel) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            line_number: model.line_number,
            product_name: model.product_name,
            quantity: model.quantity,
            unit_price: model.unit_price,
            total_price: model.total_price,
            product_variant: model.product_variant,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub transaction_code: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PaymentModel> for Payment {
    fn from(model: PaymentModel) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            amount: model.amount,
            payment_method: model.payment_method,
            payment_status: model.payment_status,
            transaction_code: model.transaction_code,
            paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct OrderStatistics {
    pub total_count: u64,
    pub pending_count: u64,
    pub shipping_count: u64,
    pub completed_count: u64,
    pub cancelled_count: u64,
}
