use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::{cart_items, carts};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = carts)]
pub struct CartEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub total_quantity: i32,
    pub total_price: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = carts)]
pub struct InsertCartEntity {
    pub user_id: Uuid,
    pub kind: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, Associations)]
#[diesel(table_name = cart_items)]
#[diesel(belongs_to(CartEntity, foreign_key = cart_id))]
pub struct CartItemEntity {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
    pub price: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = cart_items)]
pub struct InsertCartItemEntity {
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
    pub price: i64,
}

#[derive(Debug, Clone)]
pub struct CartWithItems {
    pub cart: CartEntity,
    pub items: Vec<CartItemEntity>,
}
