use thiserror::Error;

use crate::domain::{
    entities::products::ProductWithVariants, value_objects::products::VariantKey,
};

/// Availability decision for one requested line. `available` feeds the
/// user-facing "only N left" message as well as the sufficiency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockCheck {
    pub sufficient: bool,
    pub available: i32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StockError {
    #[error("variant selection is required")]
    VariantRequired,
}

/// Advisory availability check against a loaded product. The authoritative
/// check happens again under row locks when the order is written.
///
/// Products with variant selection require a discriminator and match it
/// exactly; an unknown discriminator reads as zero stock, not as an error.
/// Products without variant selection use their single discriminator-free
/// row and ignore any supplied discriminator.
pub fn check_availability(
    product: &ProductWithVariants,
    key: &VariantKey,
    quantity: i32,
) -> Result<StockCheck, StockError> {
    let available = if product.product.has_variants {
        if key.is_empty() {
            return Err(StockError::VariantRequired);
        }
        product
            .variants
            .iter()
            .find(|variant| key.matches(variant))
            .map(|variant| variant.quantity)
            .unwrap_or(0)
    } else {
        product
            .variants
            .iter()
            .find(|variant| variant.size.is_none() && variant.color.is_none())
            .map(|variant| variant.quantity)
            .unwrap_or(0)
    };

    Ok(StockCheck {
        sufficient: available >= quantity,
        available,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::products::{ProductEntity, ProductVariantEntity};
    use chrono::Utc;
    use uuid::Uuid;

    fn product(has_variants: bool, variants: Vec<(Option<&str>, Option<&str>, i32)>) -> ProductWithVariants {
        let id = Uuid::new_v4();
        let now = Utc::now();
        ProductWithVariants {
            product: ProductEntity {
                id,
                product_id: "tee-01".to_string(),
                name: "Tee".to_string(),
                description: String::new(),
                price: 250,
                image_url: "/placeholder.png".to_string(),
                has_variants,
                created_at: now,
                updated_at: now,
            },
            variants: variants
                .into_iter()
                .map(|(size, color, quantity)| ProductVariantEntity {
                    id: Uuid::new_v4(),
                    product_id: id,
                    size: size.map(str::to_string),
                    color: color.map(str::to_string),
                    quantity,
                })
                .collect(),
        }
    }

    #[test]
    fn variant_product_requires_a_discriminator() {
        let product = product(true, vec![(Some("M"), None, 5)]);

        let result = check_availability(&product, &VariantKey::default(), 1);

        assert_eq!(result, Err(StockError::VariantRequired));
    }

    #[test]
    fn exact_match_reports_the_available_quantity() {
        let product = product(true, vec![(Some("M"), None, 5), (Some("L"), None, 1)]);

        let check = check_availability(
            &product,
            &VariantKey::new(Some("L".to_string()), None),
            2,
        )
        .unwrap();

        assert!(!check.sufficient);
        assert_eq!(check.available, 1);
    }

    #[test]
    fn unknown_discriminator_is_out_of_stock_not_an_error() {
        let product = product(true, vec![(Some("M"), None, 5)]);

        let check = check_availability(
            &product,
            &VariantKey::new(Some("XL".to_string()), None),
            1,
        )
        .unwrap();

        assert_eq!(check.available, 0);
        assert!(!check.sufficient);
    }

    #[test]
    fn flat_product_ignores_a_supplied_discriminator() {
        let product = product(false, vec![(None, None, 4)]);

        let check = check_availability(
            &product,
            &VariantKey::new(Some("M".to_string()), None),
            4,
        )
        .unwrap();

        assert!(check.sufficient);
        assert_eq!(check.available, 4);
    }
}
