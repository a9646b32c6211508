use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::payments::{InsertPaymentEntity, PaymentEntity};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentRepository {
    async fn record_intent(&self, payment: InsertPaymentEntity) -> Result<Uuid>;
    async fn find_latest_by_order(&self, order_id: Uuid) -> Result<Option<PaymentEntity>>;
}
