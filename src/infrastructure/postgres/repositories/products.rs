use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{
    RunQueryDsl, delete, insert_into,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    update,
};
use uuid::Uuid;

use crate::{
    domain::{
        entities::products::{
            InsertProductEntity, InsertProductVariantEntity, ProductEntity, ProductVariantEntity,
            ProductWithVariants, UpdateProductEntity,
        },
        repositories::products::ProductRepository,
        value_objects::products::{ProductCreation, VariantKey, VariantModel},
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{product_variants, products},
    },
};

pub struct ProductPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ProductPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    fn attach_variants(
        conn: &mut PgConnection,
        products: Vec<ProductEntity>,
    ) -> Result<Vec<ProductWithVariants>> {
        let variants = ProductVariantEntity::belonging_to(&products)
            .select(ProductVariantEntity::as_select())
            .load::<ProductVariantEntity>(conn)?;

        let grouped = variants.grouped_by(&products);

        Ok(products
            .into_iter()
            .zip(grouped)
            .map(|(product, variants)| ProductWithVariants { product, variants })
            .collect())
    }

    fn variant_rows(product_pk: Uuid, variants: Vec<VariantModel>) -> Vec<InsertProductVariantEntity> {
        variants
            .into_iter()
            .map(|variant| InsertProductVariantEntity {
                product_id: product_pk,
                size: variant.size,
                color: variant.color,
                quantity: variant.quantity,
            })
            .collect()
    }
}

#[async_trait]
impl ProductRepository for ProductPostgres {
    async fn list(&self) -> Result<Vec<ProductWithVariants>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = products::table
            .order(products::created_at.desc())
            .select(ProductEntity::as_select())
            .load::<ProductEntity>(&mut conn)?;

        Self::attach_variants(&mut conn, results)
    }

    async fn find_by_product_id(&self, product_id: &str) -> Result<Option<ProductWithVariants>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let product = products::table
            .filter(products::product_id.eq(product_id))
            .select(ProductEntity::as_select())
            .first::<ProductEntity>(&mut conn)
            .optional()?;

        let Some(product) = product else {
            return Ok(None);
        };

        Ok(Self::attach_variants(&mut conn, vec![product])?.into_iter().next())
    }

    async fn find_many_with_variants(&self, ids: Vec<Uuid>) -> Result<Vec<ProductWithVariants>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = products::table
            .filter(products::id.eq_any(ids))
            .select(ProductEntity::as_select())
            .load::<ProductEntity>(&mut conn)?;

        Self::attach_variants(&mut conn, results)
    }

    async fn create(
        &self,
        product: InsertProductEntity,
        variants: Vec<VariantModel>,
    ) -> Result<ProductCreation> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<Uuid, DieselError, _>(|conn| {
            let product_pk = insert_into(products::table)
                .values(&product)
                .returning(products::id)
                .get_result::<Uuid>(conn)?;

            insert_into(product_variants::table)
                .values(Self::variant_rows(product_pk, variants.clone()))
                .execute(conn)?;

            Ok(product_pk)
        });

        match result {
            Ok(product_pk) => Ok(ProductCreation::Created(product_pk)),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Ok(ProductCreation::DuplicateProductId)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update(
        &self,
        product_id: &str,
        changes: UpdateProductEntity,
        variants: Option<Vec<VariantModel>>,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<bool, DieselError, _>(|conn| {
            let product_pk = products::table
                .filter(products::product_id.eq(product_id))
                .select(products::id)
                .first::<Uuid>(conn)
                .optional()?;

            let Some(product_pk) = product_pk else {
                return Ok(false);
            };

            update(products::table.find(product_pk))
                .set(&changes)
                .execute(conn)?;

            if let Some(variants) = variants {
                delete(product_variants::table.filter(product_variants::product_id.eq(product_pk)))
                    .execute(conn)?;
                insert_into(product_variants::table)
                    .values(Self::variant_rows(product_pk, variants))
                    .execute(conn)?;
            }

            Ok(true)
        })
        .map_err(Into::into)
    }

    async fn delete(&self, product_id: &str) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<bool, DieselError, _>(|conn| {
            let product_pk = products::table
                .filter(products::product_id.eq(product_id))
                .select(products::id)
                .first::<Uuid>(conn)
                .optional()?;

            let Some(product_pk) = product_pk else {
                return Ok(false);
            };

            delete(product_variants::table.filter(product_variants::product_id.eq(product_pk)))
                .execute(conn)?;
            delete(products::table.find(product_pk)).execute(conn)?;

            Ok(true)
        })
        .map_err(Into::into)
    }

    async fn decrement_stock(
        &self,
        product_pk: Uuid,
        key: VariantKey,
        quantity: i32,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<bool, DieselError, _>(|conn| {
            let current = product_variants::table
                .filter(product_variants::product_id.eq(product_pk))
                .filter(product_variants::size.is_not_distinct_from(key.size.clone()))
                .filter(product_variants::color.is_not_distinct_from(key.color.clone()))
                .select((product_variants::id, product_variants::quantity))
                .for_update()
                .first::<(Uuid, i32)>(conn)
                .optional()?;

            let Some((variant_pk, available)) = current else {
                return Ok(false);
            };

            // Floor at zero; a concurrent oversell must never drive stock negative.
            let remaining = (available - quantity).max(0);

            update(product_variants::table.find(variant_pk))
                .set(product_variants::quantity.eq(remaining))
                .execute(conn)?;

            update(products::table.find(product_pk))
                .set(products::updated_at.eq(Utc::now()))
                .execute(conn)?;

            Ok(true)
        })
        .map_err(Into::into)
    }
}
