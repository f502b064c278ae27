//! Signal engine — the symbol → instrument state registry.
//!
//! States are created the first time a symbol appears in the tracked
//! universe and never destroyed; an instrument that drops out of the
//! universe simply stops receiving bars and goes inert.

use crate::config::SignalConfig;
use crate::domain::Bar;
use std::collections::HashMap;
use tracing::debug;

use super::state::InstrumentState;

#[derive(Debug)]
pub struct SignalEngine {
    config: SignalConfig,
    states: HashMap<String, InstrumentState>,
}

impl SignalEngine {
    pub fn new(config: SignalConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
        }
    }

    /// Register today's eligible symbols, creating state for new arrivals.
    pub fn observe_universe(&mut self, symbols: &[String]) {
        for symbol in symbols {
            if !self.states.contains_key(symbol) {
                debug!(symbol = %symbol, "tracking new instrument");
                self.states
                    .insert(symbol.clone(), InstrumentState::new(&self.config));
            }
        }
    }

    /// Route one bar to its instrument's state. Bars for symbols that have
    /// never appeared in the universe are ignored.
    pub fn update(&mut self, bar: &Bar) {
        match self.states.get_mut(&bar.symbol) {
            Some(state) => state.update(bar),
            None => debug!(symbol = %bar.symbol, "bar for untracked symbol ignored"),
        }
    }

    pub fn state(&self, symbol: &str) -> Option<&InstrumentState> {
        self.states.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
