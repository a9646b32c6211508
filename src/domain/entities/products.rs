use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::{product_variants, products};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = products)]
pub struct ProductEntity {
    pub id: Uuid,
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub image_url: String,
    pub has_variants: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = products)]
pub struct InsertProductEntity {
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub image_url: String,
    pub has_variants: bool,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = products)]
pub struct UpdateProductEntity {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub image_url: Option<String>,
    pub has_variants: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Stock rows. A product without variant selection still owns exactly one
/// row here, with both discriminators null.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable, Associations)]
#[diesel(table_name = product_variants)]
#[diesel(belongs_to(ProductEntity, foreign_key = product_id))]
pub struct ProductVariantEntity {
    pub id: Uuid,
    pub product_id: Uuid,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = product_variants)]
pub struct InsertProductVariantEntity {
    pub product_id: Uuid,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct ProductWithVariants {
    pub product: ProductEntity,
    pub variants: Vec<ProductVariantEntity>,
}
