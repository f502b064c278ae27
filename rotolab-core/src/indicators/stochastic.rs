//! Stochastic oscillator, streaming.
//!
//! Fast %K = (close - lowest_low) / (highest_high - lowest_low) * 100 over
//! the lookback window. Slow %K = SMA(k_smoothing) of fast %K; slow %D =
//! SMA(d_smoothing) of slow %K. Warm-up: period + k_smoothing +
//! d_smoothing - 2 bars. A flat high/low range yields %K = 50.

use super::sma::Sma;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct Stochastic {
    period: usize,
    highs: VecDeque<f64>,
    lows: VecDeque<f64>,
    slow_k_sma: Sma,
    slow_d_sma: Sma,
}

impl Stochastic {
    pub fn new(period: usize, k_smoothing: usize, d_smoothing: usize) -> Self {
        assert!(period >= 1, "stochastic period must be >= 1");
        assert!(k_smoothing >= 1, "stochastic %K smoothing must be >= 1");
        assert!(d_smoothing >= 1, "stochastic %D smoothing must be >= 1");
        Self {
            period,
            highs: VecDeque::with_capacity(period + 1),
            lows: VecDeque::with_capacity(period + 1),
            slow_k_sma: Sma::new(k_smoothing),
            slow_d_sma: Sma::new(d_smoothing),
        }
    }

    pub fn update(&mut self, high: f64, low: f64, close: f64) {
        self.highs.push_back(high);
        self.lows.push_back(low);
        if self.highs.len() > self.period {
            self.highs.pop_front();
            self.lows.pop_front();
        }
        if self.highs.len() < self.period {
            return;
        }

        let highest = self.highs.iter().copied().fold(f64::MIN, f64::max);
        let lowest = self.lows.iter().copied().fold(f64::MAX, f64::min);
        let range = highest - lowest;
        let fast_k = if range == 0.0 {
            50.0
        } else {
            (close - lowest) / range * 100.0
        };

        self.slow_k_sma.update(fast_k);
        if let Some(k) = self.slow_k_sma.value() {
            self.slow_d_sma.update(k);
        }
    }

    pub fn is_ready(&self) -> bool {
        self.slow_d_sma.is_ready()
    }

    /// Slow %K: smoothed fast %K.
    pub fn slow_k(&self) -> Option<f64> {
        self.slow_k_sma.value()
    }

    /// Slow %D: smoothed slow %K.
    pub fn slow_d(&self) -> Option<f64> {
        self.slow_d_sma.value()
    }
}
