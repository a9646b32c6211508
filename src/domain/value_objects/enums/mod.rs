pub mod cart_kinds;
pub mod order_statuses;
pub mod payment_methods;
pub mod payment_statuses;
pub mod transaction_statuses;
