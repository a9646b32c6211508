use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, delete, insert_into, prelude::*, result::Error as DieselError, update};
use uuid::Uuid;

use crate::{
    domain::{
        entities::carts::{
            CartEntity, CartItemEntity, CartWithItems, InsertCartEntity, InsertCartItemEntity,
        },
        repositories::carts::CartRepository,
        value_objects::enums::cart_kinds::CartKind,
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{cart_items, carts},
    },
};

pub struct CartPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CartPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CartRepository for CartPostgres {
    async fn find(&self, user_id: Uuid, kind: CartKind) -> Result<Option<CartWithItems>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let cart = carts::table
            .filter(carts::user_id.eq(user_id))
            .filter(carts::kind.eq(kind.as_str()))
            .select(CartEntity::as_select())
            .first::<CartEntity>(&mut conn)
            .optional()?;

        let Some(cart) = cart else {
            return Ok(None);
        };

        // Expired buy-now carts are purged lazily on read.
        if let Some(expires_at) = cart.expires_at {
            if expires_at <= Utc::now() {
                conn.transaction::<(), DieselError, _>(|conn| {
                    delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id)))
                        .execute(conn)?;
                    delete(carts::table.find(cart.id)).execute(conn)?;
                    Ok(())
                })?;
                return Ok(None);
            }
        }

        let items = cart_items::table
            .filter(cart_items::cart_id.eq(cart.id))
            .select(CartItemEntity::as_select())
            .load::<CartItemEntity>(&mut conn)?;

        Ok(Some(CartWithItems { cart, items }))
    }

    async fn ensure(
        &self,
        user_id: Uuid,
        kind: CartKind,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let cart_id = insert_into(carts::table)
            .values(InsertCartEntity {
                user_id,
                kind: kind.as_str().to_string(),
                expires_at,
            })
            .on_conflict((carts::user_id, carts::kind))
            .do_update()
            .set((
                carts::expires_at.eq(expires_at),
                carts::updated_at.eq(Utc::now()),
            ))
            .returning(carts::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(cart_id)
    }

    async fn replace_items(
        &self,
        cart_id: Uuid,
        items: Vec<InsertCartItemEntity>,
        total_quantity: i32,
        total_price: i64,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<(), DieselError, _>(|conn| {
            delete(cart_items::table.filter(cart_items::cart_id.eq(cart_id))).execute(conn)?;

            if !items.is_empty() {
                insert_into(cart_items::table).values(&items).execute(conn)?;
            }

            update(carts::table.find(cart_id))
                .set((
                    carts::total_quantity.eq(total_quantity),
                    carts::total_price.eq(total_price),
                    carts::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;

            Ok(())
        })
        .map_err(Into::into)
    }
}
