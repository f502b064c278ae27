//! Moving Average Convergence Divergence (MACD), streaming.
//!
//! MACD line = EMA(fast) - EMA(slow); signal line = EMA(signal) of the MACD
//! line. The histogram (line - signal) is the divergence series consumed by
//! the signal scorer. Warm-up: slow + signal bars.

use super::ema::Ema;

#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
    warmup: usize,
    samples: usize,
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        assert!(fast_period >= 1, "MACD fast period must be >= 1");
        assert!(
            slow_period > fast_period,
            "MACD slow period must be > fast period"
        );
        assert!(signal_period >= 1, "MACD signal period must be >= 1");
        Self {
            fast: Ema::new(fast_period),
            slow: Ema::new(slow_period),
            signal: Ema::new(signal_period),
            warmup: slow_period + signal_period,
            samples: 0,
        }
    }

    pub fn update(&mut self, close: f64) {
        self.samples += 1;
        self.fast.update(close);
        self.slow.update(close);
        if let (Some(f), Some(s)) = (self.fast.value(), self.slow.value()) {
            self.signal.update(f - s);
        }
    }

    pub fn is_ready(&self) -> bool {
        self.samples >= self.warmup && self.signal.is_ready()
    }

    /// The MACD line: EMA(fast) - EMA(slow).
    pub fn value(&self) -> Option<f64> {
        match (self.fast.value(), self.slow.value()) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        }
    }

    /// The signal line: EMA(signal) of the MACD line.
    pub fn signal_value(&self) -> Option<f64> {
        self.signal.value()
    }

    /// Histogram: MACD line minus signal line.
    pub fn histogram(&self) -> Option<f64> {
        match (self.value(), self.signal_value()) {
            (Some(line), Some(sig)) => Some(line - sig),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn macd_warmup_is_slow_plus_signal() {
        let mut macd = Macd::new(3, 5, 3);
        for i in 0..7 {
            macd.update(100.0 + i as f64);
            assert!(!macd.is_ready(), "should not be ready at bar {}", i + 1);
        }
        // Bar 8 = slow(5) + signal(3).
        macd.update(107.0);
        assert!(macd.is_ready());
        assert!(macd.histogram().is_some());
    }

    #[test]
    fn macd_line_is_fast_minus_slow() {
        let mut macd = Macd::new(3, 5, 3);
        for i in 0..10 {
            macd.update(100.0 + i as f64);
        }
        let mut fast = Ema::new(3);
        let mut slow = Ema::new(5);
        for i in 0..10 {
            fast.update(100.0 + i as f64);
            slow.update(100.0 + i as f64);
        }
        assert_approx(
            macd.value().unwrap(),
            fast.value().unwrap() - slow.value().unwrap(),
            DEFAULT_EPSILON,
        );
    }

    #[test]
    fn macd_flat_input_converges_to_zero() {
        let mut macd = Macd::new(3, 5, 3);
        for _ in 0..100 {
            macd.update(50.0);
        }
        assert_approx(macd.value().unwrap(), 0.0, 1e-9);
        assert_approx(macd.histogram().unwrap(), 0.0, 1e-9);
    }

    #[test]
    fn macd_histogram_negative_in_downtrend() {
        let mut macd = Macd::new(3, 6, 3);
        // Uptrend to establish positive line, then a sharp downtrend: the
        // fast EMA falls below the slow EMA faster than the signal adapts.
        for i in 0..20 {
            macd.update(100.0 + i as f64);
        }
        for i in 0..10 {
            macd.update(119.0 - 3.0 * i as f64);
        }
        assert!(macd.value().unwrap() < 0.0);
        assert!(macd.histogram().unwrap() < 0.0);
    }

    #[test]
    #[should_panic(expected = "MACD slow period must be > fast period")]
    fn macd_rejects_slow_leq_fast() {
        Macd::new(26, 12, 9);
    }
}
