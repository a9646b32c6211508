use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A user has at most one cart per kind. `BuyNow` carts hold a single line
/// and expire automatically; `Standard` carts live until payment clears them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CartKind {
    Standard,
    BuyNow,
}

impl CartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartKind::Standard => "standard",
            CartKind::BuyNow => "buy_now",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "standard" => Some(CartKind::Standard),
            "buy_now" => Some(CartKind::BuyNow),
            _ => None,
        }
    }
}

impl Display for CartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
