//! Per-instrument signal state — the four base indicators plus the derived
//! trailing windows, updated atomically once per bar.
//!
//! Update order is fixed: base indicators first, then derived windows, then
//! the current price. A window read during the same bar therefore always
//! reflects the current bar's indicator outputs. Bars must arrive in
//! chronological order, at most once per bar; duplicates and out-of-order
//! delivery are undefined behavior (the host feed contract).

use crate::config::SignalConfig;
use crate::domain::Bar;
use crate::indicators::{Macd, Rsi, Sma, Stochastic};
use std::collections::BTreeMap;

use super::trend;
use super::window::TrailingWindow;

#[derive(Debug, Clone)]
pub struct InstrumentState {
    stochastic: Stochastic,
    rsi: Rsi,
    macd: Macd,
    /// Lookback → streaming SMA. BTreeMap for deterministic iteration.
    smas: BTreeMap<usize, Sma>,
    /// Previous bar's SMA values, for cross detection in the sell rule.
    prev_smas: BTreeMap<usize, f64>,

    rsi_window: TrailingWindow,
    histogram_window: TrailingWindow,
    slow_d_window: TrailingWindow,
    volume_window: TrailingWindow,

    current_price: Option<f64>,
    bars_seen: usize,
}

impl InstrumentState {
    pub fn new(config: &SignalConfig) -> Self {
        Self {
            stochastic: Stochastic::new(
                config.stochastic_period,
                config.stochastic_k_smoothing,
                config.stochastic_d_smoothing,
            ),
            rsi: Rsi::new(config.rsi_period),
            macd: Macd::new(config.macd_fast, config.macd_slow, config.macd_signal),
            smas: config
                .sma_lookbacks
                .iter()
                .map(|&lookback| (lookback, Sma::new(lookback)))
                .collect(),
            prev_smas: BTreeMap::new(),
            rsi_window: TrailingWindow::new(config.rsi_window),
            histogram_window: TrailingWindow::new(config.histogram_window),
            slow_d_window: TrailingWindow::new(config.slow_d_window),
            volume_window: TrailingWindow::new(config.volume_window),
            current_price: None,
            bars_seen: 0,
        }
    }

    /// Consume one bar: indicators, then derived windows, then price.
    pub fn update(&mut self, bar: &Bar) {
        // Snapshot SMA values before they move, for cross detection.
        self.prev_smas = self
            .smas
            .iter()
            .filter_map(|(&lookback, sma)| sma.value().map(|v| (lookback, v)))
            .collect();

        self.stochastic.update(bar.high, bar.low, bar.close);
        self.rsi.update(bar.close);
        self.macd.update(bar.close);
        for sma in self.smas.values_mut() {
            sma.update(bar.close);
        }

        if let Some(rsi) = self.rsi.value() {
            self.rsi_window.push(rsi);
        }
        if let Some(histogram) = self.macd.histogram() {
            self.histogram_window.push(histogram);
        }
        if let Some(slow_d) = self.stochastic.slow_d() {
            self.slow_d_window.push(slow_d);
        }
        self.volume_window.push(bar.volume as f64);

        self.current_price = Some(bar.close);
        self.bars_seen += 1;
    }

    /// True once every base indicator (stochastic, RSI, MACD, and every
    /// configured SMA) has warmed up. Monotone under continuous feeding.
    pub fn is_ready(&self) -> bool {
        self.stochastic.is_ready()
            && self.rsi.is_ready()
            && self.macd.is_ready()
            && self.smas.values().all(Sma::is_ready)
    }

    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }

    pub fn current_price(&self) -> Option<f64> {
        self.current_price
    }

    /// Current value of one configured SMA, if warm.
    pub fn sma(&self, lookback: usize) -> Option<f64> {
        self.smas.get(&lookback).and_then(Sma::value)
    }

    /// Snapshot every derived value the scorer consumes.
    ///
    /// All fields are `Option`: a value missing because its indicator or
    /// window is still warming reads as `None`, never as a silent zero.
    pub fn reading(&self) -> SignalReading {
        SignalReading {
            ready: self.is_ready(),
            price: self.current_price,
            avg_volume: trend::mean(&self.volume_window),
            rsi: self.rsi.value(),
            rsi_slope: trend::slope(&self.rsi_window),
            histogram: self.macd.histogram(),
            histogram_slope: trend::slope(&self.histogram_window),
            histogram_intercept: trend::intercept(&self.histogram_window),
            slow_d: self.stochastic.slow_d(),
            sma: self
                .smas
                .iter()
                .filter_map(|(&lookback, sma)| sma.value().map(|v| (lookback, v)))
                .collect(),
            sma_prev: self.prev_smas.clone(),
        }
    }
}

/// A point-in-time view of an instrument's derived signal values.
///
/// The scorer operates on this view rather than on `InstrumentState`
/// directly, so synthetic readings can be constructed in tests.
#[derive(Debug, Clone, Default)]
pub struct SignalReading {
    pub ready: bool,
    pub price: Option<f64>,
    pub avg_volume: Option<f64>,
    pub rsi: Option<f64>,
    pub rsi_slope: Option<f64>,
    pub histogram: Option<f64>,
    pub histogram_slope: Option<f64>,
    pub histogram_intercept: Option<f64>,
    pub slow_d: Option<f64>,
    /// Lookback → current SMA value, warm SMAs only.
    pub sma: BTreeMap<usize, f64>,
    /// Lookback → previous bar's SMA value, where one existed.
    pub sma_prev: BTreeMap<usize, f64>,
}

impl SignalReading {
    pub fn sma(&self, lookback: usize) -> Option<f64> {
        self.sma.get(&lookback).copied()
    }

    pub fn sma_prev(&self, lookback: usize) -> Option<f64> {
        self.sma_prev.get(&lookback).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    /// Small periods so tests warm up quickly.
    fn small_config() -> SignalConfig {
        SignalConfig {
            stochastic_period: 3,
            stochastic_k_smoothing: 2,
            stochastic_d_smoothing: 2,
            rsi_period: 3,
            macd_fast: 2,
            macd_slow: 4,
            macd_signal: 2,
            sma_lookbacks: vec![2, 5],
            volume_window: 3,
            rsi_window: 3,
            histogram_window: 3,
            slow_d_window: 3,
            ..SignalConfig::default()
        }
    }

    fn feed(state: &mut InstrumentState, closes: &[f64]) {
        for bar in make_bars(closes) {
            state.update(&bar);
        }
    }

    #[test]
    fn not_ready_until_slowest_indicator_warm() {
        let config = small_config();
        let mut state = InstrumentState::new(&config);
        // Slowest warm-up here: macd slow(4) + signal(2) = 6 bars.
        feed(&mut state, &[10.0, 11.0, 12.0, 13.0, 14.0]);
        assert!(!state.is_ready());
        feed(&mut state, &[15.0]);
        assert!(state.is_ready());
    }

    #[test]
    fn readiness_is_monotone() {
        let config = small_config();
        let mut state = InstrumentState::new(&config);
        let mut was_ready = false;
        for close in 0..30 {
            feed(&mut state, &[100.0 + close as f64]);
            if was_ready {
                assert!(state.is_ready(), "readiness must never revert");
            }
            was_ready = state.is_ready();
        }
        assert!(was_ready);
    }

    #[test]
    fn update_order_windows_reflect_current_bar() {
        let config = small_config();
        let mut state = InstrumentState::new(&config);
        feed(
            &mut state,
            &[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0],
        );
        // The latest RSI window entry must equal the indicator's current
        // value: windows are pushed after the indicators update.
        let reading = state.reading();
        assert_eq!(
            state.rsi_window.latest().unwrap(),
            reading.rsi.unwrap(),
            "rsi window out of sync with rsi indicator"
        );
        assert_eq!(reading.price, Some(17.0));
    }

    #[test]
    fn reading_before_any_bar_is_all_none() {
        let config = small_config();
        let state = InstrumentState::new(&config);
        let reading = state.reading();
        assert!(!reading.ready);
        assert_eq!(reading.price, None);
        assert_eq!(reading.rsi, None);
        assert_eq!(reading.histogram_slope, None);
        assert!(reading.sma.is_empty());
    }

    #[test]
    fn volume_window_fills_from_first_bar() {
        let config = small_config();
        let mut state = InstrumentState::new(&config);
        feed(&mut state, &[10.0, 11.0]);
        // Volume is pushed every bar regardless of indicator warm-up.
        let reading = state.reading();
        assert_eq!(reading.avg_volume, Some(1000.0));
    }

    #[test]
    fn prev_sma_lags_current_by_one_bar() {
        let config = small_config();
        let mut state = InstrumentState::new(&config);
        feed(&mut state, &[10.0, 12.0, 14.0, 16.0, 18.0, 20.0]);
        let reading = state.reading();
        // sma_2 now = mean(18, 20) = 19; previous bar = mean(16, 18) = 17.
        assert_eq!(reading.sma(2), Some(19.0));
        assert_eq!(reading.sma_prev(2), Some(17.0));
    }

    #[test]
    fn instrument_never_destroyed_just_inert() {
        // Feeding stops (instrument left the universe): state keeps its
        // last values and stays ready.
        let config = small_config();
        let mut state = InstrumentState::new(&config);
        feed(&mut state, &[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        assert!(state.is_ready());
        let before = state.reading();
        let after = state.reading();
        assert_eq!(before.rsi, after.rsi);
        assert_eq!(before.slow_d, after.slow_d);
    }
}
