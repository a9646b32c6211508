use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    entities::products::{InsertProductEntity, ProductWithVariants, UpdateProductEntity},
    value_objects::products::{ProductCreation, VariantKey, VariantModel},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository {
    async fn list(&self) -> Result<Vec<ProductWithVariants>>;
    async fn find_by_product_id(&self, product_id: &str) -> Result<Option<ProductWithVariants>>;
    async fn find_many_with_variants(&self, ids: Vec<Uuid>) -> Result<Vec<ProductWithVariants>>;
    async fn create(
        &self,
        product: InsertProductEntity,
        variants: Vec<VariantModel>,
    ) -> Result<ProductCreation>;
    async fn update(
        &self,
        product_id: &str,
        changes: UpdateProductEntity,
        variants: Option<Vec<VariantModel>>,
    ) -> Result<bool>;
    async fn delete(&self, product_id: &str) -> Result<bool>;

    /// Atomically lowers one stock row, flooring at zero. Returns false when
    /// no row matches the key.
    async fn decrement_stock(
        &self,
        product_pk: Uuid,
        key: VariantKey,
        quantity: i32,
    ) -> Result<bool>;
}
