use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::orders::{OrderEntity, OrderWithItems};

pub const FREE_SHIPPING_THRESHOLD: i64 = 500;
pub const FLAT_SHIPPING_FEE: i64 = 50;
pub const TAX_RATE_PERCENT: i64 = 18;

pub const ORDER_REF_PREFIX: &str = "ORD";
pub const MAX_ORDER_REF_ATTEMPTS: usize = 3;

/// `ORD-YYYYMMDD-XXXXX`. The five-digit suffix is random; the storage layer
/// retries with a fresh reference when it collides.
pub fn generate_order_ref() -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix: u32 = rand::thread_rng().gen_range(10_000..=99_999);
    format!("{ORDER_REF_PREFIX}-{date}-{suffix}")
}

pub fn shipping_cost(subtotal: i64) -> i64 {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        0
    } else {
        FLAT_SHIPPING_FEE
    }
}

/// Flat-rate tax on the subtotal, rounded to the nearest currency unit.
pub fn tax_amount(subtotal: i64) -> i64 {
    (subtotal * TAX_RATE_PERCENT + 50) / 100
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: i64,
    pub shipping_cost: i64,
    pub tax: i64,
    pub total_amount: i64,
}

pub fn compute_order_totals(subtotal: i64) -> OrderTotals {
    let shipping_cost = shipping_cost(subtotal);
    let tax = tax_amount(subtotal);
    OrderTotals {
        subtotal,
        shipping_cost,
        tax,
        total_amount: subtotal + shipping_cost + tax,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingAddressModel {
    pub name: String,
    pub phone: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl ShippingAddressModel {
    /// All fields except the second address line are required.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("name")
        } else if self.phone.trim().is_empty() {
            Some("phone")
        } else if self.address_line1.trim().is_empty() {
            Some("address_line1")
        } else if self.city.trim().is_empty() {
            Some("city")
        } else if self.state.trim().is_empty() {
            Some("state")
        } else if self.pincode.trim().is_empty() {
            Some("pincode")
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderModel {
    pub shipping_address: ShippingAddressModel,
    pub notes: Option<String>,
    #[serde(default)]
    pub buy_now: bool,
}

/// Order to be persisted; the reference is generated at insert time.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub totals: OrderTotals,
    pub shipping_address: ShippingAddressModel,
    pub notes: String,
}

/// Line snapshot handed to the storage layer, which re-checks stock under a
/// row lock before any of these are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemSnapshot {
    pub product_id: Uuid,
    pub product_name: String,
    pub product_image: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
    pub price: i64,
    pub subtotal: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockShortage {
    pub product_name: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub available: i32,
}

#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub id: Uuid,
    pub order_ref: String,
    pub total_amount: i64,
}

/// Outcome of the guarded order insert: either everything was written, or a
/// locked re-check found a shortage and nothing was.
#[derive(Debug, Clone)]
pub enum OrderCreationOutcome {
    Created(CreatedOrder),
    InsufficientStock(StockShortage),
}

/// Outcome of the payment-success transaction. `AlreadyFinalized` means a
/// replayed verification found the order completed and wrote nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentFinalization {
    Finalized,
    AlreadyFinalized,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrderDto {
    pub order_ref: String,
    pub total_amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItemDto {
    pub product_name: String,
    pub product_image: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
    pub price: i64,
    pub subtotal: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDto {
    pub order_ref: String,
    pub status: String,
    pub payment_status: String,
    pub subtotal: i64,
    pub shipping_cost: i64,
    pub tax: i64,
    pub total_amount: i64,
    pub shipping_address: ShippingAddressModel,
    pub notes: String,
    pub items: Vec<OrderItemDto>,
    pub created_at: DateTime<Utc>,
    pub payment_date: Option<DateTime<Utc>>,
}

impl From<OrderWithItems> for OrderDto {
    fn from(value: OrderWithItems) -> Self {
        let order = value.order;
        Self {
            order_ref: order.order_ref,
            status: order.status,
            payment_status: order.payment_status,
            subtotal: order.subtotal,
            shipping_cost: order.shipping_cost,
            tax: order.tax,
            total_amount: order.total_amount,
            shipping_address: ShippingAddressModel {
                name: order.ship_name,
                phone: order.ship_phone,
                address_line1: order.ship_address_line1,
                address_line2: order.ship_address_line2,
                city: order.ship_city,
                state: order.ship_state,
                pincode: order.ship_pincode,
            },
            notes: order.notes,
            items: value
                .items
                .into_iter()
                .map(|item| OrderItemDto {
                    product_name: item.product_name,
                    product_image: item.product_image,
                    size: item.size,
                    color: item.color,
                    quantity: item.quantity,
                    price: item.price,
                    subtotal: item.subtotal,
                })
                .collect(),
            created_at: order.created_at,
            payment_date: order.payment_date,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderSummaryDto {
    pub order_ref: String,
    pub status: String,
    pub payment_status: String,
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
}

impl From<OrderEntity> for OrderSummaryDto {
    fn from(order: OrderEntity) -> Self {
        Self {
            order_ref: order.order_ref,
            status: order.status,
            payment_status: order.payment_status,
            total_amount: order.total_amount,
            created_at: order.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipping_is_waived_at_the_threshold() {
        assert_eq!(shipping_cost(499), FLAT_SHIPPING_FEE);
        assert_eq!(shipping_cost(500), 0);
        assert_eq!(shipping_cost(5_000), 0);
    }

    #[test]
    fn tax_rounds_to_the_nearest_unit() {
        // 499 * 0.18 = 89.82
        assert_eq!(tax_amount(499), 90);
        // 175 * 0.18 = 31.5 rounds up
        assert_eq!(tax_amount(175), 32);
        assert_eq!(tax_amount(0), 0);
    }

    #[test]
    fn totals_for_two_items_at_250_each() {
        let totals = compute_order_totals(500);

        assert_eq!(totals.subtotal, 500);
        assert_eq!(totals.shipping_cost, 0);
        assert_eq!(totals.tax, 90);
        assert_eq!(totals.total_amount, 590);
    }

    #[test]
    fn total_is_always_the_sum_of_its_parts() {
        for subtotal in [1, 49, 50, 499, 500, 501, 12_345] {
            let totals = compute_order_totals(subtotal);
            assert_eq!(
                totals.total_amount,
                totals.subtotal + totals.shipping_cost + totals.tax
            );
        }
    }

    #[test]
    fn order_refs_follow_the_expected_shape() {
        let order_ref = generate_order_ref();
        let parts: Vec<&str> = order_ref.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], ORDER_REF_PREFIX);
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 5);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn missing_address_fields_are_named() {
        let mut address = ShippingAddressModel {
            name: "A Customer".to_string(),
            phone: "9999999999".to_string(),
            address_line1: "1 Main St".to_string(),
            address_line2: None,
            city: "Pune".to_string(),
            state: "MH".to_string(),
            pincode: "411001".to_string(),
        };
        assert_eq!(address.missing_field(), None);

        address.city = "  ".to_string();
        assert_eq!(address.missing_field(), Some("city"));
    }
}
