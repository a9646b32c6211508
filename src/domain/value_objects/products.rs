use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::products::{ProductVariantEntity, ProductWithVariants};

pub const DEFAULT_PRODUCT_IMAGE: &str = "/placeholder.png";

/// Identifies one stock row of a product. Both fields empty means the
/// discriminator-free row of a product without variant selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantKey {
    pub size: Option<String>,
    pub color: Option<String>,
}

impl VariantKey {
    pub fn new(size: Option<String>, color: Option<String>) -> Self {
        Self { size, color }
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_none() && self.color.is_none()
    }

    pub fn matches(&self, variant: &ProductVariantEntity) -> bool {
        self.size == variant.size && self.color == variant.color
    }

    /// Human-readable label for error messages, e.g. `"M / Red"`.
    pub fn label(&self) -> Option<String> {
        match (&self.size, &self.color) {
            (None, None) => None,
            (Some(size), None) => Some(size.clone()),
            (None, Some(color)) => Some(color.clone()),
            (Some(size), Some(color)) => Some(format!("{size} / {color}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantModel {
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsertProductModel {
    pub product_id: String,
    pub name: String,
    pub price: i64,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub variants: Option<Vec<VariantModel>>,
    pub stock_quantity: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProductModel {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub variants: Option<Vec<VariantModel>>,
}

/// Result of inserting a product; the external id carries a uniqueness
/// constraint and a duplicate is an expected outcome, not a failure.
#[derive(Debug, Clone)]
pub enum ProductCreation {
    Created(Uuid),
    DuplicateProductId,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDto {
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub image_url: String,
    pub has_variants: bool,
    pub variants: Vec<VariantModel>,
}

impl From<ProductWithVariants> for ProductDto {
    fn from(value: ProductWithVariants) -> Self {
        Self {
            product_id: value.product.product_id,
            name: value.product.name,
            description: value.product.description,
            price: value.product.price,
            image_url: value.product.image_url,
            has_variants: value.product.has_variants,
            variants: value
                .variants
                .into_iter()
                .map(|variant| VariantModel {
                    size: variant.size,
                    color: variant.color,
                    quantity: variant.quantity,
                })
                .collect(),
        }
    }
}

/// Folds the two admin input shapes into the single stored representation:
/// either an explicit variant list (every row must carry a discriminator),
/// or a flat quantity stored as one discriminator-free row.
pub fn normalize_stock(
    variants: Option<Vec<VariantModel>>,
    stock_quantity: Option<i32>,
) -> Result<(bool, Vec<VariantModel>), &'static str> {
    match variants {
        Some(variants) if !variants.is_empty() => {
            for variant in &variants {
                if variant.size.is_none() && variant.color.is_none() {
                    return Err("every variant needs a size or a color");
                }
                if variant.quantity < 0 {
                    return Err("variant stock cannot be negative");
                }
            }
            Ok((true, variants))
        }
        _ => {
            let quantity = stock_quantity.unwrap_or(0);
            if quantity < 0 {
                return Err("stock quantity cannot be negative");
            }
            Ok((
                false,
                vec![VariantModel {
                    size: None,
                    color: None,
                    quantity,
                }],
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_list_is_kept_and_flags_the_product() {
        let (has_variants, variants) = normalize_stock(
            Some(vec![VariantModel {
                size: Some("M".to_string()),
                color: None,
                quantity: 3,
            }]),
            None,
        )
        .unwrap();

        assert!(has_variants);
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].quantity, 3);
    }

    #[test]
    fn flat_quantity_becomes_a_single_blank_variant() {
        let (has_variants, variants) = normalize_stock(None, Some(7)).unwrap();

        assert!(!has_variants);
        assert_eq!(variants.len(), 1);
        assert!(variants[0].size.is_none());
        assert!(variants[0].color.is_none());
        assert_eq!(variants[0].quantity, 7);
    }

    #[test]
    fn discriminator_free_variant_row_is_rejected() {
        let result = normalize_stock(
            Some(vec![VariantModel {
                size: None,
                color: None,
                quantity: 1,
            }]),
            None,
        );

        assert!(result.is_err());
    }

    #[test]
    fn variant_key_labels_combine_size_and_color() {
        let key = VariantKey::new(Some("M".to_string()), Some("Red".to_string()));
        assert_eq!(key.label().as_deref(), Some("M / Red"));
        assert_eq!(VariantKey::default().label(), None);
    }
}
