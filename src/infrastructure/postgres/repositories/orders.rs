use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use diesel::{
    RunQueryDsl, delete, insert_into,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    update,
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    domain::{
        entities::orders::{
            InsertOrderEntity, InsertOrderItemEntity, OrderEntity, OrderItemEntity, OrderWithItems,
        },
        repositories::orders::OrderRepository,
        value_objects::{
            enums::{
                cart_kinds::CartKind, order_statuses::OrderStatus, payment_methods::PaymentMethod,
                payment_statuses::PaymentStatus, transaction_statuses::TransactionStatus,
            },
            orders::{
                CreatedOrder, MAX_ORDER_REF_ATTEMPTS, NewOrder, OrderCreationOutcome,
                OrderItemSnapshot, PaymentFinalization, StockShortage, generate_order_ref,
            },
        },
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{cart_items, carts, order_items, orders, payments, product_variants},
    },
};

pub struct OrderPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl OrderPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    fn insert_row(order: &NewOrder, order_ref: String) -> InsertOrderEntity {
        InsertOrderEntity {
            order_ref,
            user_id: order.user_id,
            subtotal: order.totals.subtotal,
            shipping_cost: order.totals.shipping_cost,
            tax: order.totals.tax,
            total_amount: order.totals.total_amount,
            status: OrderStatus::Pending.to_string(),
            payment_status: PaymentStatus::Pending.to_string(),
            ship_name: order.shipping_address.name.clone(),
            ship_phone: order.shipping_address.phone.clone(),
            ship_address_line1: order.shipping_address.address_line1.clone(),
            ship_address_line2: order.shipping_address.address_line2.clone(),
            ship_city: order.shipping_address.city.clone(),
            ship_state: order.shipping_address.state.clone(),
            ship_pincode: order.shipping_address.pincode.clone(),
            notes: order.notes.clone(),
        }
    }

    fn is_order_ref_collision(err: &DieselError) -> bool {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                info.constraint_name() == Some("orders_order_ref_key")
            }
            _ => false,
        }
    }

    fn load_items(conn: &mut PgConnection, order: OrderEntity) -> Result<OrderWithItems> {
        let items = order_items::table
            .filter(order_items::order_id.eq(order.id))
            .select(OrderItemEntity::as_select())
            .load::<OrderItemEntity>(conn)?;

        Ok(OrderWithItems { order, items })
    }
}

#[async_trait]
impl OrderRepository for OrderPostgres {
    async fn create_order_guarded(
        &self,
        order: NewOrder,
        items: Vec<OrderItemSnapshot>,
    ) -> Result<OrderCreationOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        for attempt in 1..=MAX_ORDER_REF_ATTEMPTS {
            let order_ref = generate_order_ref();
            let insert = Self::insert_row(&order, order_ref.clone());
            let items = items.clone();

            let result = conn.transaction::<OrderCreationOutcome, DieselError, _>(|conn| {
                // Lock every demanded stock row, then re-check; the advisory
                // check the caller already ran can be stale by now. Locks are
                // taken in a stable order so two concurrent checkouts over
                // the same products cannot deadlock.
                let mut demands: Vec<&OrderItemSnapshot> = items.iter().collect();
                demands.sort_by(|a, b| {
                    (a.product_id, &a.size, &a.color).cmp(&(b.product_id, &b.size, &b.color))
                });

                for item in demands {
                    let available = product_variants::table
                        .filter(product_variants::product_id.eq(item.product_id))
                        .filter(product_variants::size.is_not_distinct_from(item.size.clone()))
                        .filter(product_variants::color.is_not_distinct_from(item.color.clone()))
                        .select(product_variants::quantity)
                        .for_update()
                        .first::<i32>(conn)
                        .optional()?
                        .unwrap_or(0);

                    if available < item.quantity {
                        return Ok(OrderCreationOutcome::InsufficientStock(StockShortage {
                            product_name: item.product_name.clone(),
                            size: item.size.clone(),
                            color: item.color.clone(),
                            available,
                        }));
                    }
                }

                let order_pk = insert_into(orders::table)
                    .values(&insert)
                    .returning(orders::id)
                    .get_result::<Uuid>(conn)?;

                let item_rows: Vec<InsertOrderItemEntity> = items
                    .iter()
                    .map(|item| InsertOrderItemEntity {
                        order_id: order_pk,
                        product_id: item.product_id,
                        product_name: item.product_name.clone(),
                        product_image: item.product_image.clone(),
                        size: item.size.clone(),
                        color: item.color.clone(),
                        quantity: item.quantity,
                        price: item.price,
                        subtotal: item.subtotal,
                    })
                    .collect();

                insert_into(order_items::table).values(&item_rows).execute(conn)?;

                Ok(OrderCreationOutcome::Created(CreatedOrder {
                    id: order_pk,
                    order_ref: insert.order_ref.clone(),
                    total_amount: insert.total_amount,
                }))
            });

            match result {
                Ok(outcome) => return Ok(outcome),
                Err(err) if Self::is_order_ref_collision(&err) => {
                    warn!(
                        %order_ref,
                        attempt,
                        "orders: order reference collided, regenerating"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        bail!(
            "order reference generation collided {} times in a row",
            MAX_ORDER_REF_ATTEMPTS
        );
    }

    async fn find_by_order_ref(&self, order_ref: &str) -> Result<Option<OrderWithItems>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let order = orders::table
            .filter(orders::order_ref.eq(order_ref))
            .select(OrderEntity::as_select())
            .first::<OrderEntity>(&mut conn)
            .optional()?;

        match order {
            Some(order) => Ok(Some(Self::load_items(&mut conn, order)?)),
            None => Ok(None),
        }
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<OrderWithItems>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let order = orders::table
            .filter(orders::gateway_order_id.eq(gateway_order_id))
            .select(OrderEntity::as_select())
            .first::<OrderEntity>(&mut conn)
            .optional()?;

        match order {
            Some(order) => Ok(Some(Self::load_items(&mut conn, order)?)),
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = orders::table
            .filter(orders::user_id.eq(user_id))
            .order(orders::created_at.desc())
            .select(OrderEntity::as_select())
            .load::<OrderEntity>(&mut conn)?;

        Ok(results)
    }

    async fn attach_payment_intent(
        &self,
        order_id: Uuid,
        gateway_order_id: &str,
        method: PaymentMethod,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(orders::table.find(order_id))
            .set((
                orders::gateway_order_id.eq(gateway_order_id),
                orders::payment_method.eq(method.to_string()),
                orders::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn finalize_payment_success(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<PaymentFinalization> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        conn.transaction::<PaymentFinalization, DieselError, _>(|conn| {
            let payment_status = orders::table
                .find(order_id)
                .select(orders::payment_status)
                .for_update()
                .first::<String>(conn)?;

            // Replayed verification of a completed order must not repeat any
            // of the side effects.
            if payment_status == PaymentStatus::Completed.as_str() {
                return Ok(PaymentFinalization::AlreadyFinalized);
            }

            update(orders::table.find(order_id))
                .set((
                    orders::status.eq(OrderStatus::Confirmed.to_string()),
                    orders::payment_status.eq(PaymentStatus::Completed.to_string()),
                    orders::gateway_payment_id.eq(gateway_payment_id),
                    orders::gateway_signature.eq(signature),
                    orders::payment_date.eq(now),
                    orders::updated_at.eq(now),
                ))
                .execute(conn)?;

            update(
                payments::table
                    .filter(payments::order_id.eq(order_id))
                    .filter(payments::gateway_order_id.eq(gateway_order_id)),
            )
            .set((
                payments::status.eq(TransactionStatus::Success.to_string()),
                payments::gateway_payment_id.eq(gateway_payment_id),
                payments::gateway_signature.eq(signature),
                payments::completed_at.eq(now),
                payments::updated_at.eq(now),
            ))
            .execute(conn)?;

            let cart_id = carts::table
                .filter(carts::user_id.eq(user_id))
                .filter(carts::kind.eq(CartKind::Standard.as_str()))
                .select(carts::id)
                .first::<Uuid>(conn)
                .optional()?;

            if let Some(cart_id) = cart_id {
                delete(cart_items::table.filter(cart_items::cart_id.eq(cart_id))).execute(conn)?;
                update(carts::table.find(cart_id))
                    .set((
                        carts::total_quantity.eq(0),
                        carts::total_price.eq(0_i64),
                        carts::updated_at.eq(now),
                    ))
                    .execute(conn)?;
            }

            Ok(PaymentFinalization::Finalized)
        })
        .map_err(Into::into)
    }

    async fn finalize_payment_failure(
        &self,
        order_id: Uuid,
        gateway_order_id: &str,
        reason: &str,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        conn.transaction::<(), DieselError, _>(|conn| {
            update(orders::table.find(order_id))
                .set((
                    orders::status.eq(OrderStatus::PaymentFailed.to_string()),
                    orders::payment_status.eq(PaymentStatus::Failed.to_string()),
                    orders::updated_at.eq(now),
                ))
                .execute(conn)?;

            update(
                payments::table
                    .filter(payments::order_id.eq(order_id))
                    .filter(payments::gateway_order_id.eq(gateway_order_id)),
            )
            .set((
                payments::status.eq(TransactionStatus::Failed.to_string()),
                payments::error_description.eq(reason),
                payments::updated_at.eq(now),
            ))
            .execute(conn)?;

            Ok(())
        })
        .map_err(Into::into)
    }
}
