//! Rotation controller — moves capital between the benchmark holding and
//! active instrument positions.
//!
//! Per instrument, a three-state machine:
//!
//! ```text
//! Idle ──buy signal──▶ EntryPending ──funding fill──▶ Holding ──sell──▶ Idle
//!   ▲                       │                            │
//!   └──────timeout──────────┘      (stop-out reconciliation)──▶ Idle
//! ```
//!
//! The controller owns the pending-order table (order id → instrument being
//! funded) and the machine states; all mutation goes through its methods so
//! the per-bar invariants (at most one in-flight entry per instrument,
//! fills tolerated at any delay) are enforced in one place.

use crate::config::{EntryFunding, ProtectiveStop, RotationConfig};
use crate::domain::{Fill, OrderId};
use crate::signal::{SignalEngine, SignalPolicy};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::venue::{ExecutionVenue, VenueError};

/// Errors from controller decisions.
#[derive(Debug, Error)]
pub enum RotationError {
    #[error(transparent)]
    Venue(#[from] VenueError),
}

/// Per-instrument rotation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoldState {
    #[default]
    Idle,
    /// A benchmark-defunding order is in flight; the entry and its stop are
    /// placed once that order's fill is observed.
    EntryPending,
    Holding,
}

/// An outstanding benchmark-defunding order and the instrument it funds.
#[derive(Debug, Clone)]
struct PendingEntry {
    symbol: String,
    submitted_bar: usize,
}

pub struct RotationController {
    config: RotationConfig,
    policy: Box<dyn SignalPolicy>,
    machines: HashMap<String, HoldState>,
    pending: HashMap<OrderId, PendingEntry>,
    /// Symbols whose position has been observed at the venue while Holding.
    /// Distinguishes "stopped out" from "entry fill still in flight".
    seen_position: HashSet<String>,
}

impl RotationController {
    pub fn new(config: RotationConfig, policy: Box<dyn SignalPolicy>) -> Self {
        Self {
            config,
            policy,
            machines: HashMap::new(),
            pending: HashMap::new(),
            seen_position: HashSet::new(),
        }
    }

    /// Current machine state for an instrument (Idle if never seen).
    pub fn hold_state(&self, symbol: &str) -> HoldState {
        self.machines.get(symbol).copied().unwrap_or_default()
    }

    /// Number of in-flight entry-funding orders.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Run one bar of decisions over the current universe.
    ///
    /// `bar_index` is the session's day counter, used for pending-order
    /// timeouts. Instruments whose signal state is not ready are skipped.
    pub fn on_bar(
        &mut self,
        engine: &SignalEngine,
        universe: &[String],
        venue: &mut dyn ExecutionVenue,
        bar_index: usize,
    ) -> Result<(), RotationError> {
        self.allocate_idle_capital(venue)?;
        self.expire_stale_pending(bar_index);

        for symbol in universe {
            if *symbol == self.config.benchmark_symbol {
                continue;
            }
            let Some(state) = engine.state(symbol) else {
                continue;
            };
            if !state.is_ready() {
                continue;
            }
            let reading = state.reading();

            match self.hold_state(symbol) {
                HoldState::Idle => {
                    if self.policy.should_buy(&reading) {
                        self.enter(symbol, engine, venue, bar_index)?;
                    } else {
                        debug!(symbol = %symbol, "no entry signal");
                    }
                }
                HoldState::EntryPending => {
                    // Waiting on the funding fill; no new decision.
                }
                HoldState::Holding => {
                    if venue.position_qty(symbol) == 0.0 {
                        if self.seen_position.remove(symbol) {
                            // The protective stop took us out; fold back to
                            // Idle.
                            info!(symbol = %symbol, "position stopped out");
                            self.machines.insert(symbol.clone(), HoldState::Idle);
                        }
                        // Otherwise the entry fill is still in flight.
                        continue;
                    }
                    self.seen_position.insert(symbol.clone());
                    if self.policy.should_sell(&reading) && self.profit_gate(symbol, venue) {
                        self.exit(symbol, venue)?;
                    } else {
                        debug!(symbol = %symbol, "holding");
                    }
                }
            }
        }
        Ok(())
    }

    /// Handle a fill notification from the venue.
    ///
    /// Only fills for tracked funding orders advance a machine; everything
    /// else (benchmark buys, liquidations, stop executions) is ignored.
    pub fn on_fill(
        &mut self,
        fill: &Fill,
        engine: &SignalEngine,
        venue: &mut dyn ExecutionVenue,
    ) -> Result<(), RotationError> {
        let Some(entry) = self.pending.remove(&fill.order_id) else {
            debug!(order_id = %fill.order_id, symbol = %fill.symbol, "untracked fill ignored");
            return Ok(());
        };
        let symbol = entry.symbol;

        let Some(price) = venue.close_price(&symbol) else {
            warn!(symbol = %symbol, "no price at funding fill; entry abandoned");
            self.machines.insert(symbol, HoldState::Idle);
            return Ok(());
        };

        let quantity = entry_quantity(
            self.config.trade_notional,
            venue.cash(),
            price,
            self.config.slippage_headroom,
        );
        if quantity < 1.0 {
            warn!(symbol = %symbol, price, "funding filled but no entry affordable");
            self.machines.insert(symbol, HoldState::Idle);
            return Ok(());
        }

        venue.submit_market_order(&symbol, quantity)?;
        let stop_price = self.stop_price(&symbol, price, engine);
        venue.submit_stop_order(&symbol, -quantity, stop_price)?;
        info!(symbol = %symbol, quantity, price, stop_price, "entry placed after funding fill");
        self.machines.insert(symbol, HoldState::Holding);
        Ok(())
    }

    // ── Decision legs ──────────────────────────────────────────────────

    /// With no holdings at all, park 100% of capital in the benchmark.
    fn allocate_idle_capital(
        &mut self,
        venue: &mut dyn ExecutionVenue,
    ) -> Result<(), RotationError> {
        if venue.is_invested() || !self.pending.is_empty() {
            return Ok(());
        }
        let Some(price) = venue.close_price(&self.config.benchmark_symbol) else {
            return Ok(());
        };
        let quantity = (venue.cash() / price).floor();
        if quantity >= 1.0 {
            venue.submit_market_order(&self.config.benchmark_symbol, quantity)?;
            info!(quantity, price, "allocated idle capital to benchmark");
        }
        Ok(())
    }

    /// Abandon entries whose funding order has been in flight too long.
    fn expire_stale_pending(&mut self, bar_index: usize) {
        let Some(timeout) = self.config.pending_timeout_bars else {
            return;
        };
        let expired: Vec<OrderId> = self
            .pending
            .iter()
            .filter(|(_, entry)| bar_index.saturating_sub(entry.submitted_bar) >= timeout)
            .map(|(&id, _)| id)
            .collect();
        for id in expired {
            if let Some(entry) = self.pending.remove(&id) {
                warn!(
                    order_id = %id,
                    symbol = %entry.symbol,
                    timeout,
                    "funding order unfilled past timeout; entry abandoned"
                );
                self.machines.insert(entry.symbol, HoldState::Idle);
            }
        }
    }

    fn enter(
        &mut self,
        symbol: &str,
        engine: &SignalEngine,
        venue: &mut dyn ExecutionVenue,
        bar_index: usize,
    ) -> Result<(), RotationError> {
        let benchmark = self.config.benchmark_symbol.clone();
        let Some(benchmark_price) = venue.close_price(&benchmark) else {
            debug!(symbol = %symbol, "no benchmark price; entry skipped");
            return Ok(());
        };
        let defund_qty = (self.config.trade_notional / benchmark_price)
            .floor()
            .min(venue.position_qty(&benchmark));
        if defund_qty < 1.0 {
            debug!(symbol = %symbol, "benchmark cannot fund entry");
            return Ok(());
        }

        match self.config.entry_funding {
            EntryFunding::Tracked => {
                let order_id = venue.submit_market_order(&benchmark, -defund_qty)?;
                self.pending.insert(
                    order_id,
                    PendingEntry {
                        symbol: symbol.to_string(),
                        submitted_bar: bar_index,
                    },
                );
                self.machines
                    .insert(symbol.to_string(), HoldState::EntryPending);
                info!(symbol = %symbol, order_id = %order_id, defund_qty, "benchmark defund submitted");
            }
            EntryFunding::Immediate => {
                venue.submit_market_order(&benchmark, -defund_qty)?;
                let Some(price) = venue.close_price(symbol) else {
                    debug!(symbol = %symbol, "no instrument price; entry skipped");
                    return Ok(());
                };
                let quantity = entry_quantity(
                    self.config.trade_notional,
                    venue.cash(),
                    price,
                    self.config.slippage_headroom,
                );
                if quantity < 1.0 {
                    warn!(symbol = %symbol, "no entry affordable after benchmark offset");
                    return Ok(());
                }
                venue.submit_market_order(symbol, quantity)?;
                let stop_price = self.stop_price(symbol, price, engine);
                venue.submit_stop_order(symbol, -quantity, stop_price)?;
                self.machines.insert(symbol.to_string(), HoldState::Holding);
                info!(symbol = %symbol, quantity, price, stop_price, "immediate entry placed");
            }
        }
        Ok(())
    }

    fn exit(&mut self, symbol: &str, venue: &mut dyn ExecutionVenue) -> Result<(), RotationError> {
        venue.liquidate(symbol)?;
        info!(symbol = %symbol, "position liquidated on sell signal");

        let benchmark = self.config.benchmark_symbol.clone();
        if let Some(price) = venue.close_price(&benchmark) {
            let quantity = (venue.cash() / price).floor();
            if quantity >= 1.0 {
                venue.submit_market_order(&benchmark, quantity)?;
                info!(quantity, price, "freed cash redeployed to benchmark");
            }
        }
        self.machines.insert(symbol.to_string(), HoldState::Idle);
        self.seen_position.remove(symbol);
        Ok(())
    }

    /// When configured, only sell above the recorded average entry price.
    fn profit_gate(&self, symbol: &str, venue: &dyn ExecutionVenue) -> bool {
        if !self.config.require_profit_on_sell {
            return true;
        }
        match (venue.close_price(symbol), venue.avg_entry_price(symbol)) {
            (Some(price), Some(avg_entry)) => price > avg_entry,
            _ => false,
        }
    }

    fn stop_price(&self, symbol: &str, price: f64, engine: &SignalEngine) -> f64 {
        match &self.config.protective_stop {
            ProtectiveStop::PercentBelow { fraction } => fraction * price,
            ProtectiveStop::LongSma {
                lookback,
                fallback_fraction,
            } => match engine.state(symbol).and_then(|s| s.sma(*lookback)) {
                Some(sma) => sma,
                None => {
                    warn!(symbol = %symbol, lookback, "stop SMA not warm; falling back to percent stop");
                    fallback_fraction * price
                }
            },
        }
    }
}

/// Entry size at fill time: headroom-discounted notional, floored to whole
/// shares. The headroom divisor reserves room for price movement between
/// sizing and the entry's own fill.
pub(crate) fn entry_quantity(notional: f64, cash: f64, price: f64, headroom: f64) -> f64 {
    (notional.min(cash) / (price * headroom)).floor()
}
