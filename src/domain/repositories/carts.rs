use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    entities::carts::{CartWithItems, InsertCartItemEntity},
    value_objects::enums::cart_kinds::CartKind,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartRepository {
    /// Expired buy-now carts are purged on read and reported as absent.
    async fn find(&self, user_id: Uuid, kind: CartKind) -> Result<Option<CartWithItems>>;

    /// Creates the user's cart of the given kind if it does not exist yet,
    /// refreshing the expiry either way. Returns the cart id.
    async fn ensure(
        &self,
        user_id: Uuid,
        kind: CartKind,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Uuid>;

    /// Swaps the cart's lines and totals in one transaction.
    async fn replace_items(
        &self,
        cart_id: Uuid,
        items: Vec<InsertCartItemEntity>,
        total_quantity: i32,
        total_price: i64,
    ) -> Result<()>;
}
