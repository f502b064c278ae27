//! Relative Strength Index (RSI), streaming.
//!
//! Uses Wilder smoothing of average gains and average losses.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Warm-up: period + 1 bars (the first bar only establishes the prior close).
//! Edge cases: avg_loss == 0 → RSI = 100; avg_gain == 0 → RSI = 0; flat → 50.

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev_close: Option<f64>,
    changes_seen: usize,
    seed_gain: f64,
    seed_loss: f64,
    avg_gain: f64,
    avg_loss: f64,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            prev_close: None,
            changes_seen: 0,
            seed_gain: 0.0,
            seed_loss: 0.0,
            avg_gain: 0.0,
            avg_loss: 0.0,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn update(&mut self, close: f64) {
        let prev = match self.prev_close.replace(close) {
            Some(prev) => prev,
            None => return,
        };
        let change = close - prev;
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };

        self.changes_seen += 1;
        if self.changes_seen <= self.period {
            // Seed phase: simple averages over the first `period` changes.
            self.seed_gain += gain;
            self.seed_loss += loss;
            if self.changes_seen == self.period {
                self.avg_gain = self.seed_gain / self.period as f64;
                self.avg_loss = self.seed_loss / self.period as f64;
            }
        } else {
            // Wilder smoothing.
            let alpha = 1.0 / self.period as f64;
            self.avg_gain = alpha * gain + (1.0 - alpha) * self.avg_gain;
            self.avg_loss = alpha * loss + (1.0 - alpha) * self.avg_loss;
        }
    }

    pub fn is_ready(&self) -> bool {
        self.changes_seen >= self.period
    }

    pub fn value(&self) -> Option<f64> {
        if !self.is_ready() {
            return None;
        }
        Some(compute_rsi(self.avg_gain, self.avg_loss))
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // no movement
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
