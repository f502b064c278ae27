//! Execution venue seam.
//!
//! The controller talks to the market through this trait: fire-and-forget
//! order submission plus read-only queries against venue-owned state (cash,
//! positions, prices). Fills come back later through
//! `RotationController::on_fill`, possibly within the same bar, possibly
//! several bars on.

use crate::domain::OrderId;
use thiserror::Error;

/// Errors from order submission.
#[derive(Debug, Error)]
pub enum VenueError {
    #[error("no price known for symbol {0}")]
    UnknownSymbol(String),

    #[error("invalid quantity {quantity} for {symbol}")]
    InvalidQuantity { symbol: String, quantity: f64 },

    #[error("order rejected: {0}")]
    Rejected(String),
}

/// Order placement and account queries, owned by the execution venue.
///
/// Quantities are signed: positive buys, negative sells. Submissions return
/// the venue-assigned order id immediately; they never block on a fill.
pub trait ExecutionVenue {
    fn submit_market_order(&mut self, symbol: &str, quantity: f64) -> Result<OrderId, VenueError>;

    fn submit_stop_order(
        &mut self,
        symbol: &str,
        quantity: f64,
        stop_price: f64,
    ) -> Result<OrderId, VenueError>;

    /// Close the full position in `symbol` at market.
    fn liquidate(&mut self, symbol: &str) -> Result<OrderId, VenueError>;

    fn cash(&self) -> f64;

    /// Signed position size; 0.0 when flat.
    fn position_qty(&self, symbol: &str) -> f64;

    /// Average entry price of the open position, if any.
    fn avg_entry_price(&self, symbol: &str) -> Option<f64>;

    /// Last known close price.
    fn close_price(&self, symbol: &str) -> Option<f64>;

    /// Whether any position (benchmark included) is open.
    fn is_invested(&self) -> bool;
}
