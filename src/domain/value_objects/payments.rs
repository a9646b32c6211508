use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::payments::PaymentEntity;

pub const DEFAULT_CURRENCY: &str = "INR";

/// Signature recorded for mock-mode verifications, which never touch the
/// gateway and therefore have nothing real to store.
pub const MOCK_SIGNATURE: &str = "mock_signature";

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentModel {
    pub order_ref: String,
    #[serde(default)]
    pub mock_mode: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntentDto {
    pub gateway_order_id: String,
    pub amount: i64,
    pub currency: String,
    pub order_ref: String,
    pub key_id: Option<String>,
    pub mock_mode: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPaymentModel {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: Option<String>,
    #[serde(default)]
    pub mock_mode: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentVerifiedDto {
    pub order_ref: String,
    pub status: String,
    pub gateway_payment_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentDto {
    pub gateway: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub error_description: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentEntity> for PaymentDto {
    fn from(payment: PaymentEntity) -> Self {
        Self {
            gateway: payment.gateway,
            gateway_order_id: payment.gateway_order_id,
            gateway_payment_id: payment.gateway_payment_id,
            amount: payment.amount,
            currency: payment.currency,
            status: payment.status,
            error_description: payment.error_description,
            completed_at: payment.completed_at,
            created_at: payment.created_at,
        }
    }
}
