use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::{order_items, orders};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = orders)]
pub struct OrderEntity {
    pub id: Uuid,
    pub order_ref: String,
    pub user_id: Uuid,
    pub subtotal: i64,
    pub shipping_cost: i64,
    pub tax: i64,
    pub total_amount: i64,
    pub status: String,
    pub payment_status: String,
    pub payment_method: Option<String>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub ship_name: String,
    pub ship_phone: String,
    pub ship_address_line1: String,
    pub ship_address_line2: Option<String>,
    pub ship_city: String,
    pub ship_state: String,
    pub ship_pincode: String,
    pub notes: String,
    pub payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = orders)]
pub struct InsertOrderEntity {
    pub order_ref: String,
    pub user_id: Uuid,
    pub subtotal: i64,
    pub shipping_cost: i64,
    pub tax: i64,
    pub total_amount: i64,
    pub status: String,
    pub payment_status: String,
    pub ship_name: String,
    pub ship_phone: String,
    pub ship_address_line1: String,
    pub ship_address_line2: Option<String>,
    pub ship_city: String,
    pub ship_state: String,
    pub ship_pincode: String,
    pub notes: String,
}

/// Snapshot rows. Name, image and price are copied from the product at
/// checkout time so later product edits or deletions never rewrite history.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable, Associations)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderEntity, foreign_key = order_id))]
pub struct OrderItemEntity {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_image: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
    pub price: i64,
    pub subtotal: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = order_items)]
pub struct InsertOrderItemEntity {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_image: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
    pub price: i64,
    pub subtotal: i64,
}

#[derive(Debug, Clone)]
pub struct OrderWithItems {
    pub order: OrderEntity,
    pub items: Vec<OrderItemEntity>,
}
