//! Fill — asynchronous execution notification from the venue.

use super::ids::OrderId;
use serde::{Deserialize, Serialize};

/// A fill notification for a previously submitted order.
///
/// Delivered by the venue some time after submission, possibly within the
/// same bar, possibly several bars later. Quantity is signed (negative for
/// sells), matching the submitted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub symbol: String,
    pub quantity: f64,
    pub price: f64,
}

impl Fill {
    /// Cash delta from this fill: negative for buys, positive for sells.
    pub fn cash_delta(&self) -> f64 {
        -self.quantity * self.price
    }
}
