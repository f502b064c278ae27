//! Property tests: window eviction, trend-fit recovery, readiness
//! monotonicity, and sizing boundaries.

use proptest::prelude::*;
use rotolab_core::config::SignalConfig;
use rotolab_core::domain::Bar;
use rotolab_core::signal::{trend, InstrumentState, TrailingWindow};

fn small_signal_config() -> SignalConfig {
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

proptest! {
    /// A window never exceeds its capacity and always retains exactly the
    /// most recent values, in push order.
    #[test]
    fn window_retains_newest_values(
        capacity in 1usize..16,
        values in prop::collection::vec(-1.0e6..1.0e6f64, 0..64),
    ) {
        let mut window = TrailingWindow::new(capacity);
        for &v in &values {
            window.push(v);
        }
        prop_assert!(window.len() <= capacity);
        prop_assert_eq!(window.len(), values.len().min(capacity));

        let expected: Vec<f64> = values
            .iter()
            .copied()
            .skip(values.len().saturating_sub(capacity))
            .collect();
        let actual: Vec<f64> = window.iter().collect();
        prop_assert_eq!(actual, expected);
    }

    /// Fitting an exact line a + b*x recovers its slope and intercept.
    #[test]
    fn trend_fit_recovers_linear_series(
        a in -1.0e3..1.0e3f64,
        b in -1.0e2..1.0e2f64,
        n in 2usize..12,
    ) {
        let mut window = TrailingWindow::new(n);
        for i in 0..n {
            window.push(a + b * i as f64);
        }
        let slope = trend::slope(&window).unwrap();
        let intercept = trend::intercept(&window).unwrap();
        prop_assert!((slope - b).abs() < 1e-6, "slope {} vs {}", slope, b);
        prop_assert!((intercept - a).abs() < 1e-6, "intercept {} vs {}", intercept, a);
    }

    /// slope/intercept/mean are pure: repeated queries on an unmutated
    /// window return bit-identical results.
    #[test]
    fn trend_queries_are_idempotent(
        values in prop::collection::vec(-1.0e4..1.0e4f64, 0..16),
    ) {
        let mut window = TrailingWindow::new(16);
        for &v in &values {
            window.push(v);
        }
        let first = (trend::slope(&window), trend::intercept(&window), trend::mean(&window));
        for _ in 0..3 {
            let again = (trend::slope(&window), trend::intercept(&window), trend::mean(&window));
            prop_assert_eq!(again, first);
        }
    }

    /// Below 2 samples the fit is undefined, never a numeric sentinel.
    #[test]
    fn trend_undefined_below_two_samples(value in -1.0e6..1.0e6f64) {
        let empty = TrailingWindow::new(4);
        prop_assert_eq!(trend::slope(&empty), None);
        prop_assert_eq!(trend::intercept(&empty), None);

        let mut single = TrailingWindow::new(4);
        single.push(value);
        prop_assert_eq!(trend::slope(&single), None);
        prop_assert_eq!(trend::intercept(&single), None);
    }

    /// Once ready, an instrument state stays ready under continued feeding,
    /// whatever the price path does.
    #[test]
    fn readiness_is_monotone(
        closes in prop::collection::vec(1.0..1.0e3f64, 1..40),
    ) {
        let config = small_signal_config();
        let mut state = InstrumentState::new(&config);
        let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

        let mut was_ready = false;
        for (i, &close) in closes.iter().enumerate() {
            state.update(&Bar {
                symbol: "TEST".to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: (close - 1.0).max(0.01),
                close,
                volume: 1_000,
            });
            if was_ready {
                prop_assert!(state.is_ready(), "readiness reverted at bar {}", i);
            }
            was_ready = state.is_ready();
        }
    }
}
