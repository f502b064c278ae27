//! Session driver — the day-by-day event loop.
//!
//! Each trading day, in order:
//! 1. Deliver fills the venue produced since the last bar (deferred mode).
//! 2. Record the day's closes with the venue.
//! 3. Rank today's universe and register new instruments.
//! 4. Update every instrument's signal state from its bar.
//! 5. Execute any protective stops the day's prices crossed.
//! 6. Run the rotation controller's decisions.
//! 7. In same-instant fill mode, deliver the fills those decisions produced.
//!
//! Bars and fills are delivered strictly serially on this one thread, the
//! host precondition the whole engine is built on.

use crate::config::StrategyConfig;
use crate::domain::Bar;
use crate::rotation::{ExecutionVenue, FillMode, RotationController, RotationError, SimVenue};
use crate::signal::{SignalEngine, SignalScorer};
use crate::universe::{rank_universe, UniverseEntry};
use tracing::info;

/// Result of a complete session run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub trading_days: usize,
    pub instruments_tracked: usize,
    pub orders_submitted: usize,
    pub fills_delivered: usize,
    pub final_cash: f64,
    pub final_equity: f64,
}

/// Run a full rotation session over chronologically sorted bars.
pub fn run_session(
    config: &StrategyConfig,
    bars: &[Bar],
    venue: &mut SimVenue,
) -> Result<RunSummary, RotationError> {
    let mut engine = SignalEngine::new(config.signal.clone());
    let scorer = SignalScorer::new(config.signal.clone());
    let mut controller = RotationController::new(config.rotation.clone(), Box::new(scorer));

    let mut trading_days = 0;
    let mut fills_delivered = 0;

    let mut index = 0;
    while index < bars.len() {
        // One day's slice of bars.
        let date = bars[index].date;
        let mut end = index;
        while end < bars.len() && bars[end].date == date {
            end += 1;
        }
        let day = &bars[index..end];
        index = end;

        // Fills from earlier bars arrive before today's decisions.
        for fill in venue.drain_fills() {
            controller.on_fill(&fill, &engine, venue)?;
            fills_delivered += 1;
        }

        for bar in day {
            venue.set_price(&bar.symbol, bar.close);
        }

        let candidates: Vec<UniverseEntry> = day
            .iter()
            .map(|bar| UniverseEntry {
                symbol: bar.symbol.clone(),
                price: bar.close,
                dollar_volume: bar.dollar_volume(),
            })
            .collect();
        let universe = rank_universe(&candidates, &config.universe);
        engine.observe_universe(&universe);

        for bar in day {
            engine.update(bar);
        }

        venue.evaluate_stops();

        controller.on_bar(&engine, &universe, venue, trading_days)?;

        // Same-instant fills: deliver within the bar that produced them.
        if venue.fill_mode() == FillMode::Immediate {
            for fill in venue.drain_fills() {
                controller.on_fill(&fill, &engine, venue)?;
                fills_delivered += 1;
            }
        }

        trading_days += 1;
    }

    // Fills still in flight at the end of the data are delivered so the
    // ledger settles.
    for fill in venue.drain_fills() {
        controller.on_fill(&fill, &engine, venue)?;
        fills_delivered += 1;
    }

    let summary = RunSummary {
        trading_days,
        instruments_tracked: engine.len(),
        orders_submitted: venue.orders_submitted(),
        fills_delivered,
        final_cash: venue.cash(),
        final_equity: venue.equity(),
    };
    info!(
        trading_days = summary.trading_days,
        instruments = summary.instruments_tracked,
        orders = summary.orders_submitted,
        final_equity = summary.final_equity,
        "session complete"
    );
    Ok(summary)
}
