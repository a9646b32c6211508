use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::carts::{CartItemEntity, CartWithItems},
    value_objects::products::VariantKey,
};

/// How long a buy-now cart stays alive before reads treat it as gone.
pub fn buy_now_ttl() -> Duration {
    Duration::hours(1)
}

/// One cart line, detached from storage. Price is the snapshot taken when
/// the line was first added, not the product's live price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
    pub price: i64,
}

impl CartLine {
    pub fn variant_key(&self) -> VariantKey {
        VariantKey::new(self.size.clone(), self.color.clone())
    }

    fn matches(&self, product_id: Uuid, key: &VariantKey) -> bool {
        self.product_id == product_id && self.size == key.size && self.color == key.color
    }
}

impl From<CartItemEntity> for CartLine {
    fn from(item: CartItemEntity) -> Self {
        Self {
            product_id: item.product_id,
            size: item.size,
            color: item.color,
            quantity: item.quantity,
            price: item.price,
        }
    }
}

/// Adds to an existing (product, variant) line or appends a new one; the
/// cart never holds two lines for the same pair.
pub fn upsert_line(lines: &mut Vec<CartLine>, line: CartLine) {
    let key = line.variant_key();
    match lines
        .iter_mut()
        .find(|existing| existing.matches(line.product_id, &key))
    {
        Some(existing) => existing.quantity += line.quantity,
        None => lines.push(line),
    }
}

/// Overwrites the quantity of a line. Returns false when the line is absent.
pub fn set_line_quantity(
    lines: &mut [CartLine],
    product_id: Uuid,
    key: &VariantKey,
    quantity: i32,
) -> bool {
    match lines
        .iter_mut()
        .find(|existing| existing.matches(product_id, key))
    {
        Some(existing) => {
            existing.quantity = quantity;
            true
        }
        None => false,
    }
}

/// Removing an absent line is a no-op.
pub fn remove_line(lines: &mut Vec<CartLine>, product_id: Uuid, key: &VariantKey) {
    lines.retain(|existing| !existing.matches(product_id, key));
}

/// Derived totals, always recomputed from the lines and never taken from
/// client input.
pub fn cart_totals(lines: &[CartLine]) -> (i32, i64) {
    let total_quantity = lines.iter().map(|line| line.quantity).sum();
    let total_price = lines
        .iter()
        .map(|line| i64::from(line.quantity) * line.price)
        .sum();
    (total_quantity, total_price)
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddCartItemModel {
    pub product_id: String,
    pub size: Option<String>,
    pub color: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCartItemModel {
    pub product_id: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoveCartItemModel {
    pub product_id: String,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuyNowModel {
    pub product_id: String,
    pub size: Option<String>,
    pub color: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize)]
pub struct CartItemDto {
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
    pub price: i64,
    pub line_total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartDto {
    pub items: Vec<CartItemDto>,
    pub total_quantity: i32,
    pub total_price: i64,
}

impl CartDto {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_quantity: 0,
            total_price: 0,
        }
    }
}

impl CartWithItems {
    pub fn lines(&self) -> Vec<CartLine> {
        self.items.iter().cloned().map(CartLine::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: Uuid, size: Option<&str>, quantity: i32, price: i64) -> CartLine {
        CartLine {
            product_id,
            size: size.map(str::to_string),
            color: None,
            quantity,
            price,
        }
    }

    #[test]
    fn totals_follow_the_lines_after_every_mutation() {
        let product = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut lines = Vec::new();

        upsert_line(&mut lines, line(product, Some("M"), 2, 250));
        upsert_line(&mut lines, line(other, None, 1, 100));
        let (quantity, price) = cart_totals(&lines);
        assert_eq!((quantity, price), (3, 600));

        set_line_quantity(
            &mut lines,
            product,
            &VariantKey::new(Some("M".to_string()), None),
            5,
        );
        let (quantity, price) = cart_totals(&lines);
        assert_eq!((quantity, price), (6, 1350));

        remove_line(&mut lines, other, &VariantKey::default());
        let (quantity, price) = cart_totals(&lines);
        assert_eq!((quantity, price), (5, 1250));
    }

    #[test]
    fn adding_the_same_product_and_variant_twice_merges_lines() {
        let product = Uuid::new_v4();
        let mut lines = Vec::new();

        upsert_line(&mut lines, line(product, Some("M"), 1, 250));
        upsert_line(&mut lines, line(product, Some("M"), 2, 250));

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);
    }

    #[test]
    fn different_variants_of_one_product_stay_separate_lines() {
        let product = Uuid::new_v4();
        let mut lines = Vec::new();

        upsert_line(&mut lines, line(product, Some("M"), 1, 250));
        upsert_line(&mut lines, line(product, Some("L"), 1, 250));

        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn removing_an_absent_line_is_a_no_op() {
        let product = Uuid::new_v4();
        let mut lines = vec![line(product, Some("M"), 1, 250)];

        remove_line(&mut lines, Uuid::new_v4(), &VariantKey::default());

        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn set_quantity_reports_missing_lines() {
        let mut lines = vec![line(Uuid::new_v4(), None, 1, 100)];

        let found = set_line_quantity(&mut lines, Uuid::new_v4(), &VariantKey::default(), 4);

        assert!(!found);
    }
}
