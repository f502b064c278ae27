//! Signal scoring — two-stage buy evaluation and variant sell rules.
//!
//! `should_buy` runs a filter stage (liquidity, bullish-divergence setup,
//! RSI band and slope, trend confirmation) and only then computes the
//! composite conviction score. Any gate that cannot be evaluated (an
//! indicator still warming, a trend fit on fewer than 2 samples) reads as
//! "not satisfied" and short-circuits to false.

use crate::config::{SellRule, SignalConfig, TrendConfirmation};
use tracing::trace;

use super::state::SignalReading;

/// Intercepts closer to zero than this fail the score gate instead of
/// amplifying the histogram ratio toward infinity.
const INTERCEPT_EPSILON: f64 = 1e-9;

/// Buy/sell decision seam between the signal engine and the rotation
/// controller. `SignalScorer` is the production implementation; tests
/// substitute scripted policies.
pub trait SignalPolicy {
    fn should_buy(&self, reading: &SignalReading) -> bool;
    fn should_sell(&self, reading: &SignalReading) -> bool;
}

/// The composite scorer: pure function of a reading plus fixed thresholds.
#[derive(Debug, Clone)]
pub struct SignalScorer {
    config: SignalConfig,
}

impl SignalScorer {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    /// The conviction score: stochastic extremity plus histogram-to-intercept
    /// ratio. None when inputs are missing, the intercept is too close to
    /// zero, or the result is not finite.
    pub fn conviction_score(&self, reading: &SignalReading) -> Option<f64> {
        let slow_d = reading.slow_d?;
        let histogram = reading.histogram?;
        let intercept = reading.histogram_intercept?;
        if intercept.abs() < INTERCEPT_EPSILON {
            return None;
        }
        let midpoint = 0.5 * (self.config.d_high + self.config.d_low);
        let half_range = 0.5 * (self.config.d_high - self.config.d_low);
        let score = 0.5 * ((slow_d - midpoint).abs() / half_range + histogram / intercept);
        score.is_finite().then_some(score)
    }

    fn trend_confirmed(&self, reading: &SignalReading) -> bool {
        match &self.config.trend_confirmation {
            TrendConfirmation::FastOverSlow { fast, slow } => {
                match (reading.sma(*fast), reading.sma(*slow)) {
                    (Some(f), Some(s)) => f > s,
                    _ => false,
                }
            }
            TrendConfirmation::MaRegime {
                short,
                medium,
                long,
            } => {
                let above_short = match (reading.price, reading.sma(*short)) {
                    (Some(p), Some(s)) => p > s,
                    _ => false,
                };
                let regime = match (reading.sma(*medium), reading.sma(*long)) {
                    (Some(m), Some(l)) => m > l,
                    _ => false,
                };
                above_short && regime
            }
        }
    }
}

impl SignalPolicy for SignalScorer {
    fn should_buy(&self, reading: &SignalReading) -> bool {
        if !reading.ready {
            return false;
        }

        // Filter stage: all gates must hold; bail on the first failure.
        let Some(avg_volume) = reading.avg_volume else {
            return false;
        };
        if avg_volume <= self.config.liquidity_floor {
            return false;
        }
        let Some(histogram) = reading.histogram else {
            return false;
        };
        if histogram >= 0.0 {
            return false;
        }
        let Some(histogram_slope) = reading.histogram_slope else {
            return false;
        };
        if histogram_slope <= 0.0 {
            return false;
        }
        let Some(histogram_intercept) = reading.histogram_intercept else {
            return false;
        };
        if histogram_intercept >= 0.0 {
            return false;
        }
        let Some(rsi) = reading.rsi else {
            return false;
        };
        if rsi <= self.config.rsi_low || rsi >= self.config.rsi_high {
            return false;
        }
        let Some(rsi_slope) = reading.rsi_slope else {
            return false;
        };
        if rsi_slope <= 0.0 {
            return false;
        }
        if !self.trend_confirmed(reading) {
            return false;
        }

        // Scoring stage.
        match self.conviction_score(reading) {
            Some(score) => {
                trace!(score, cutoff = self.config.conviction_cutoff, "scored buy candidate");
                score > self.config.conviction_cutoff
            }
            None => false,
        }
    }

    fn should_sell(&self, reading: &SignalReading) -> bool {
        if !reading.ready {
            return false;
        }
        match &self.config.sell_rule {
            SellRule::ReversalConfirmation => {
                let Some(rsi_slope) = reading.rsi_slope else {
                    return false;
                };
                let Some(histogram_slope) = reading.histogram_slope else {
                    return false;
                };
                let Some(histogram_intercept) = reading.histogram_intercept else {
                    return false;
                };
                let Some(slow_d) = reading.slow_d else {
                    return false;
                };
                rsi_slope <= 0.0
                    && histogram_slope <= 0.0
                    && histogram_intercept >= 0.0
                    && slow_d >= self.config.sell_d_floor
            }
            SellRule::SmaCross { fast, slow } => {
                let (Some(fast_now), Some(slow_now)) = (reading.sma(*fast), reading.sma(*slow))
                else {
                    return false;
                };
                let (Some(fast_prev), Some(slow_prev)) =
                    (reading.sma_prev(*fast), reading.sma_prev(*slow))
                else {
                    return false;
                };
                fast_prev >= slow_prev && fast_now < slow_now
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// A reading that passes every default-config buy filter with
    /// slow %D parked at the reference midpoint (so the stochastic term of
    /// the score is zero) and histogram/intercept = -2/-1 (ratio term 2):
    /// score = 0.5 * (0 + 2) = 1.0.
    fn buyable_reading() -> SignalReading {
        let mut sma = BTreeMap::new();
        sma.insert(50, 105.0);
        sma.insert(100, 100.0);
        SignalReading {
            ready: true,
            price: Some(110.0),
            avg_volume: Some(3_000_000.0),
            rsi: Some(55.0),
            rsi_slope: Some(0.8),
            histogram: Some(-2.0),
            histogram_slope: Some(0.5),
            histogram_intercept: Some(-1.0),
            slow_d: Some(30.0), // midpoint of (10, 50)
            sma,
            sma_prev: BTreeMap::new(),
        }
    }

    fn scorer(config: SignalConfig) -> SignalScorer {
        SignalScorer::new(config)
    }

    #[test]
    fn buys_when_score_exceeds_cutoff() {
        let s = scorer(SignalConfig::default()); // cutoff 0.5
        let reading = buyable_reading();
        assert_eq!(s.conviction_score(&reading), Some(1.0));
        assert!(s.should_buy(&reading));
    }

    #[test]
    fn no_buy_when_cutoff_raised_above_score() {
        let mut config = SignalConfig::default();
        config.conviction_cutoff = 1.0; // score == 1.0 is not > 1.0
        let s = scorer(config);
        assert!(!s.should_buy(&buyable_reading()));
    }

    #[test]
    fn no_buy_when_not_ready() {
        let s = scorer(SignalConfig::default());
        let mut reading = buyable_reading();
        reading.ready = false;
        assert!(!s.should_buy(&reading));
    }

    #[test]
    fn filter_rejects_thin_volume() {
        let s = scorer(SignalConfig::default());
        let mut reading = buyable_reading();
        reading.avg_volume = Some(1_000_000.0);
        assert!(!s.should_buy(&reading));
    }

    #[test]
    fn filter_rejects_positive_histogram() {
        let s = scorer(SignalConfig::default());
        let mut reading = buyable_reading();
        reading.histogram = Some(0.5);
        assert!(!s.should_buy(&reading));
    }

    #[test]
    fn filter_rejects_falling_histogram() {
        let s = scorer(SignalConfig::default());
        let mut reading = buyable_reading();
        reading.histogram_slope = Some(-0.1);
        assert!(!s.should_buy(&reading));
    }

    #[test]
    fn filter_rejects_positive_intercept() {
        let s = scorer(SignalConfig::default());
        let mut reading = buyable_reading();
        reading.histogram_intercept = Some(0.5);
        assert!(!s.should_buy(&reading));
    }

    #[test]
    fn filter_rejects_rsi_outside_band() {
        let s = scorer(SignalConfig::default());
        for rsi in [35.0, 40.0, 75.0, 80.0] {
            let mut reading = buyable_reading();
            reading.rsi = Some(rsi);
            assert!(!s.should_buy(&reading), "rsi {rsi} should fail the band");
        }
    }

    #[test]
    fn filter_rejects_falling_rsi() {
        let s = scorer(SignalConfig::default());
        let mut reading = buyable_reading();
        reading.rsi_slope = Some(0.0);
        assert!(!s.should_buy(&reading));
    }

    #[test]
    fn filter_rejects_undefined_trend() {
        // A window with fewer than 2 samples yields an undefined slope,
        // which must read as "gate not satisfied", not as zero.
        let s = scorer(SignalConfig::default());
        let mut reading = buyable_reading();
        reading.rsi_slope = None;
        assert!(!s.should_buy(&reading));
    }

    #[test]
    fn filter_rejects_fast_sma_below_slow() {
        let s = scorer(SignalConfig::default());
        let mut reading = buyable_reading();
        reading.sma.insert(50, 95.0); // below sma_100 = 100
        assert!(!s.should_buy(&reading));
    }

    #[test]
    fn ma_regime_confirmation_variant() {
        let mut config = SignalConfig::default();
        config.sma_lookbacks = vec![20, 100, 200];
        config.trend_confirmation = TrendConfirmation::MaRegime {
            short: 20,
            medium: 100,
            long: 200,
        };
        let s = scorer(config);

        let mut reading = buyable_reading();
        reading.sma.clear();
        reading.sma.insert(20, 105.0);
        reading.sma.insert(100, 102.0);
        reading.sma.insert(200, 98.0);
        // price 110 > sma_20, sma_100 > sma_200.
        assert!(s.should_buy(&reading));

        reading.sma.insert(200, 103.0); // regime broken
        assert!(!s.should_buy(&reading));
    }

    #[test]
    fn near_zero_intercept_fails_score_gate() {
        let s = scorer(SignalConfig::default());
        let mut reading = buyable_reading();
        reading.histogram_intercept = Some(-1e-12);
        assert_eq!(s.conviction_score(&reading), None);
        assert!(!s.should_buy(&reading));
    }

    #[test]
    fn score_combines_stochastic_extremity() {
        // slow %D at the band edge adds a full extremity unit:
        // |50 - 30| / 20 = 1.0, so score = 0.5 * (1 + 2) = 1.5.
        let s = scorer(SignalConfig::default());
        let mut reading = buyable_reading();
        reading.slow_d = Some(50.0);
        assert_eq!(s.conviction_score(&reading), Some(1.5));
    }

    #[test]
    fn sell_reversal_confirmation() {
        let s = scorer(SignalConfig::default());
        let reading = SignalReading {
            ready: true,
            rsi_slope: Some(-0.2),
            histogram_slope: Some(-0.1),
            histogram_intercept: Some(0.3),
            slow_d: Some(60.0),
            ..SignalReading::default()
        };
        assert!(s.should_sell(&reading));
    }

    #[test]
    fn sell_reversal_needs_all_four_legs() {
        let s = scorer(SignalConfig::default());
        let base = SignalReading {
            ready: true,
            rsi_slope: Some(-0.2),
            histogram_slope: Some(-0.1),
            histogram_intercept: Some(0.3),
            slow_d: Some(60.0),
            ..SignalReading::default()
        };

        let mut r = base.clone();
        r.rsi_slope = Some(0.1);
        assert!(!s.should_sell(&r));

        let mut r = base.clone();
        r.histogram_slope = Some(0.1);
        assert!(!s.should_sell(&r));

        let mut r = base.clone();
        r.histogram_intercept = Some(-0.1);
        assert!(!s.should_sell(&r));

        let mut r = base;
        r.slow_d = Some(40.0);
        assert!(!s.should_sell(&r));
    }

    #[test]
    fn sell_sma_cross_variant() {
        let mut config = SignalConfig::default();
        config.sell_rule = SellRule::SmaCross { fast: 10, slow: 20 };
        let s = scorer(config);

        let mut reading = SignalReading {
            ready: true,
            ..SignalReading::default()
        };
        reading.sma.insert(10, 98.0);
        reading.sma.insert(20, 100.0);
        reading.sma_prev.insert(10, 101.0);
        reading.sma_prev.insert(20, 100.0);
        // Crossed below this bar.
        assert!(s.should_sell(&reading));

        // Already below last bar: no cross, no signal.
        reading.sma_prev.insert(10, 99.0);
        assert!(!s.should_sell(&reading));
    }

    #[test]
    fn undefined_slope_does_not_trigger_sell() {
        // rsi_slope None must not satisfy "slope <= 0".
        let s = scorer(SignalConfig::default());
        let reading = SignalReading {
            ready: true,
            rsi_slope: None,
            histogram_slope: Some(-0.1),
            histogram_intercept: Some(0.3),
            slow_d: Some(60.0),
            ..SignalReading::default()
        };
        assert!(!s.should_sell(&reading));
    }

    #[test]
    fn buy_and_sell_mutually_exclusive_in_default_config() {
        // Buy requires rsi_slope > 0 and histogram_intercept < 0; the
        // reversal sell requires rsi_slope <= 0 and intercept >= 0. No
        // reading satisfies both.
        let s = scorer(SignalConfig::default());
        let mut reading = buyable_reading();
        assert!(s.should_buy(&reading));
        assert!(!s.should_sell(&reading));

        reading.rsi_slope = Some(-0.5);
        reading.histogram_slope = Some(-0.5);
        reading.histogram_intercept = Some(0.5);
        reading.slow_d = Some(60.0);
        assert!(s.should_sell(&reading));
        assert!(!s.should_buy(&reading));
    }
}
