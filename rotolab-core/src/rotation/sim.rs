//! Simulated execution venue for tests and offline sessions.
//!
//! Market orders fill at the current close, immediately at submission or
//! deferred until the next `drain_fills` call, so the controller's
//! EntryPending path can be exercised with any gap between submission and
//! fill. Protective stops are held and executed by `evaluate_stops` when
//! the price crosses their trigger. The venue owns the cash/position
//! ledger; the controller only queries it.

use crate::domain::{Fill, IdGen, OrderId};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

use super::venue::{ExecutionVenue, VenueError};

/// When market orders fill relative to submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    /// Applied at submission; the notification waits in the delivery queue.
    Immediate,
    /// Applied (at the submission-time price) on the next `drain_fills`.
    Deferred,
}

/// An open position lot.
#[derive(Debug, Clone, Default)]
struct PositionLot {
    quantity: f64,
    avg_price: f64,
}

/// A resting protective stop.
#[derive(Debug, Clone)]
pub struct StopOrder {
    pub id: OrderId,
    pub symbol: String,
    pub quantity: f64,
    pub stop_price: f64,
}

/// A market order waiting for its deferred fill.
#[derive(Debug, Clone)]
struct QueuedOrder {
    id: OrderId,
    symbol: String,
    quantity: f64,
    price: f64,
}

pub struct SimVenue {
    fill_mode: FillMode,
    cash: f64,
    positions: HashMap<String, PositionLot>,
    prices: HashMap<String, f64>,
    id_gen: IdGen,
    queued: VecDeque<QueuedOrder>,
    delivery: VecDeque<Fill>,
    stops: Vec<StopOrder>,
    orders_submitted: usize,
}

impl SimVenue {
    pub fn new(initial_cash: f64, fill_mode: FillMode) -> Self {
        Self {
            fill_mode,
            cash: initial_cash,
            positions: HashMap::new(),
            prices: HashMap::new(),
            id_gen: IdGen::new(),
            queued: VecDeque::new(),
            delivery: VecDeque::new(),
            stops: Vec::new(),
            orders_submitted: 0,
        }
    }

    pub fn fill_mode(&self) -> FillMode {
        self.fill_mode
    }

    /// Record the current close for a symbol.
    pub fn set_price(&mut self, symbol: &str, price: f64) {
        self.prices.insert(symbol.to_string(), price);
    }

    /// Install a position directly, bypassing order flow. Test setup only.
    pub fn set_position(&mut self, symbol: &str, quantity: f64, avg_price: f64) {
        self.positions.insert(
            symbol.to_string(),
            PositionLot {
                quantity,
                avg_price,
            },
        );
    }

    /// Apply any deferred orders, then hand over every fill awaiting
    /// delivery. The caller forwards these to the controller serially.
    pub fn drain_fills(&mut self) -> Vec<Fill> {
        while let Some(order) = self.queued.pop_front() {
            self.apply_fill(&order.symbol, order.quantity, order.price);
            self.delivery.push_back(Fill {
                order_id: order.id,
                symbol: order.symbol,
                quantity: order.quantity,
                price: order.price,
            });
        }
        self.delivery.drain(..).collect()
    }

    /// Execute any resting stop whose trigger the current price has crossed.
    pub fn evaluate_stops(&mut self) {
        loop {
            let triggered = self.stops.iter().position(|stop| {
                match self.prices.get(&stop.symbol) {
                    Some(&price) => {
                        if stop.quantity < 0.0 {
                            price <= stop.stop_price
                        } else {
                            price >= stop.stop_price
                        }
                    }
                    None => false,
                }
            });
            let Some(index) = triggered else {
                return;
            };
            let stop = self.stops.remove(index);
            let price = self.prices[&stop.symbol];
            debug!(symbol = %stop.symbol, stop_price = stop.stop_price, price, "stop executed");
            self.apply_fill(&stop.symbol, stop.quantity, price);
            self.delivery.push_back(Fill {
                order_id: stop.id,
                symbol: stop.symbol,
                quantity: stop.quantity,
                price,
            });
        }
    }

    pub fn stop_orders(&self) -> &[StopOrder] {
        &self.stops
    }

    pub fn orders_submitted(&self) -> usize {
        self.orders_submitted
    }

    /// Cash plus position market value at current prices.
    pub fn equity(&self) -> f64 {
        let position_value: f64 = self
            .positions
            .iter()
            .map(|(symbol, lot)| {
                let price = self.prices.get(symbol).copied().unwrap_or(lot.avg_price);
                lot.quantity * price
            })
            .sum();
        self.cash + position_value
    }

    fn apply_fill(&mut self, symbol: &str, quantity: f64, price: f64) {
        let lot = self.positions.entry(symbol.to_string()).or_default();
        if quantity > 0.0 {
            let new_quantity = lot.quantity + quantity;
            lot.avg_price = (lot.avg_price * lot.quantity + price * quantity) / new_quantity;
            lot.quantity = new_quantity;
        } else {
            lot.quantity += quantity;
        }
        self.cash -= quantity * price;

        if lot.quantity.abs() < 1e-9 {
            self.positions.remove(symbol);
            // A closed position no longer needs protection.
            self.stops.retain(|stop| stop.symbol != symbol);
        }
    }

    fn price_for(&self, symbol: &str) -> Result<f64, VenueError> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| VenueError::UnknownSymbol(symbol.to_string()))
    }
}

impl ExecutionVenue for SimVenue {
    fn submit_market_order(&mut self, symbol: &str, quantity: f64) -> Result<OrderId, VenueError> {
        if quantity == 0.0 || !quantity.is_finite() {
            return Err(VenueError::InvalidQuantity {
                symbol: symbol.to_string(),
                quantity,
            });
        }
        let price = self.price_for(symbol)?;
        let id = self.id_gen.next_id();
        self.orders_submitted += 1;
        match self.fill_mode {
            FillMode::Immediate => {
                self.apply_fill(symbol, quantity, price);
                self.delivery.push_back(Fill {
                    order_id: id,
                    symbol: symbol.to_string(),
                    quantity,
                    price,
                });
            }
            FillMode::Deferred => {
                self.queued.push_back(QueuedOrder {
                    id,
                    symbol: symbol.to_string(),
                    quantity,
                    price,
                });
            }
        }
        Ok(id)
    }

    fn submit_stop_order(
        &mut self,
        symbol: &str,
        quantity: f64,
        stop_price: f64,
    ) -> Result<OrderId, VenueError> {
        if quantity == 0.0 || !quantity.is_finite() {
            return Err(VenueError::InvalidQuantity {
                symbol: symbol.to_string(),
                quantity,
            });
        }
        self.price_for(symbol)?;
        let id = self.id_gen.next_id();
        self.orders_submitted += 1;
        self.stops.push(StopOrder {
            id,
            symbol: symbol.to_string(),
            quantity,
            stop_price,
        });
        Ok(id)
    }

    fn liquidate(&mut self, symbol: &str) -> Result<OrderId, VenueError> {
        let quantity = self.position_qty(symbol);
        if quantity == 0.0 {
            return Err(VenueError::Rejected(format!(
                "no position to liquidate in {symbol}"
            )));
        }
        self.submit_market_order(symbol, -quantity)
    }

    fn cash(&self) -> f64 {
        self.cash
    }

    fn position_qty(&self, symbol: &str) -> f64 {
        self.positions
            .get(symbol)
            .map(|lot| lot.quantity)
            .unwrap_or(0.0)
    }

    fn avg_entry_price(&self, symbol: &str) -> Option<f64> {
        self.positions.get(symbol).map(|lot| lot.avg_price)
    }

    fn close_price(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).copied()
    }

    fn is_invested(&self) -> bool {
        self.positions.values().any(|lot| lot.quantity != 0.0)
    }
}
