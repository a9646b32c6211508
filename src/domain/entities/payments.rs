use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::payments;

/// Audit log of gateway transaction attempts. The order's own payment
/// columns stay the operational source of truth.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub gateway: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub error_description: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub gateway: String,
    pub gateway_order_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}
