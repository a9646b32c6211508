use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    entities::orders::{OrderEntity, OrderWithItems},
    value_objects::{
        enums::payment_methods::PaymentMethod,
        orders::{NewOrder, OrderCreationOutcome, OrderItemSnapshot, PaymentFinalization},
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository {
    /// Writes the order and its item snapshots in one transaction, after
    /// re-checking every line against stock rows locked for the duration.
    /// Any shortage aborts the whole order.
    async fn create_order_guarded(
        &self,
        order: NewOrder,
        items: Vec<OrderItemSnapshot>,
    ) -> Result<OrderCreationOutcome>;

    async fn find_by_order_ref(&self, order_ref: &str) -> Result<Option<OrderWithItems>>;
    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<OrderWithItems>>;
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderEntity>>;

    /// Records the gateway transaction id and payment method on the order.
    async fn attach_payment_intent(
        &self,
        order_id: Uuid,
        gateway_order_id: &str,
        method: PaymentMethod,
    ) -> Result<()>;

    /// Single transaction: order to confirmed/completed, audit row to
    /// success, standard cart cleared. A replay against an already-completed
    /// order writes nothing and says so.
    async fn finalize_payment_success(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<PaymentFinalization>;

    /// Single transaction: order to payment_failed/failed, audit row to
    /// failed with the reason. Stock and cart are left untouched.
    async fn finalize_payment_failure(
        &self,
        order_id: Uuid,
        gateway_order_id: &str,
        reason: &str,
    ) -> Result<()>;
}
