use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// How an order is (to be) paid. `Mock` fabricates gateway identifiers and
/// skips signature verification entirely.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    Razorpay,
    Mock,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Razorpay => "razorpay",
            PaymentMethod::Mock => "mock",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "razorpay" => Some(PaymentMethod::Razorpay),
            "mock" => Some(PaymentMethod::Mock),
            _ => None,
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
