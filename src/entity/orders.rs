use sea_orm::entity::prelude::*;

use super::sea_orm_active_enums::{DeliveryStatus, OrderStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
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
    pub order_date: DateTimeWithTimeZone,
    pub delivered_date: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
    #[sea_orm(has_one = "super::payments::Entity")]
    Payments,
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
