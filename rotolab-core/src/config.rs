//! Strategy configuration — one immutable value injected at construction.
//!
//! Every threshold, window length, and rule variant that drifted across the
//! historical engine deployments lives here as a named field, so parallel
//! sessions with different parameters cannot cross-contaminate. Loadable
//! from TOML; `Default` is the documented reference deployment.
//!
//! `fingerprint()` hashes the canonical JSON serialization with BLAKE3,
//! giving parameter sweeps a stable run identity.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors from loading or validating a strategy configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("rsi band is empty: low {low} must be < high {high}")]
    EmptyRsiBand { low: f64, high: f64 },

    #[error("stochastic %D reference band is empty: low {low} must be < high {high}")]
    EmptyDBand { low: f64, high: f64 },

    #[error("trailing window `{name}` must hold at least 2 samples, got {len}")]
    WindowTooShort { name: &'static str, len: usize },

    #[error("sma lookback {lookback} referenced by {referenced_by} is not in sma_lookbacks")]
    MissingLookback {
        lookback: usize,
        referenced_by: &'static str,
    },

    #[error("slippage headroom must be >= 1.0, got {0}")]
    HeadroomBelowOne(f64),

    #[error("stop fraction must be in (0, 1), got {0}")]
    StopFractionOutOfRange(f64),

    #[error("trade notional must be positive, got {0}")]
    NonPositiveNotional(f64),
}

/// How an entry is confirmed to be trend-aligned before buying.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum TrendConfirmation {
    /// SMA(fast) must be above SMA(slow).
    FastOverSlow { fast: usize, slow: usize },
    /// Price must be above SMA(short) and SMA(medium) above SMA(long).
    MaRegime {
        short: usize,
        medium: usize,
        long: usize,
    },
}

/// Which exit rule closes an active position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum SellRule {
    /// Full reversal confirmation: RSI slope <= 0, histogram slope <= 0,
    /// histogram intercept >= 0, slow %D >= sell_d_floor.
    ReversalConfirmation,
    /// SMA(fast) crossed below SMA(slow) this bar.
    SmaCross { fast: usize, slow: usize },
}

/// How an entry is funded from the benchmark position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryFunding {
    /// Defund the benchmark first, track the order, and place the entry plus
    /// its protective stop only once the funding fill confirms.
    Tracked,
    /// Defund the benchmark untracked and place the entry immediately.
    Immediate,
}

/// Where the protective stop is placed after an entry confirms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum ProtectiveStop {
    /// Stop at `fraction` of the current price (e.g. 0.95 = 5% below).
    PercentBelow { fraction: f64 },
    /// Stop at the long-lookback SMA value; falls back to
    /// `fallback_fraction` of price while that SMA is still warming.
    LongSma {
        lookback: usize,
        #[serde(default = "default_stop_fraction")]
        fallback_fraction: f64,
    },
}

fn default_stop_fraction() -> f64 {
    0.95
}

/// Signal-engine parameters: indicator periods, trailing windows, filter
/// thresholds, and the scoring rule variants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SignalConfig {
    pub stochastic_period: usize,
    pub stochastic_k_smoothing: usize,
    pub stochastic_d_smoothing: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub sma_lookbacks: Vec<usize>,

    pub volume_window: usize,
    pub rsi_window: usize,
    pub histogram_window: usize,
    pub slow_d_window: usize,

    /// Minimum average volume over the volume window (shares/day).
    pub liquidity_floor: f64,
    pub rsi_low: f64,
    pub rsi_high: f64,
    /// Stochastic slow-%D reference bounds for the conviction score.
    pub d_low: f64,
    pub d_high: f64,
    pub conviction_cutoff: f64,
    /// Slow-%D floor for the reversal-confirmation sell rule.
    pub sell_d_floor: f64,

    pub trend_confirmation: TrendConfirmation,
    pub sell_rule: SellRule,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            stochastic_period: 14,
            stochastic_k_smoothing: 3,
            stochastic_d_smoothing: 3,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            sma_lookbacks: vec![10, 20, 50, 100, 200],
            volume_window: 7,
            rsi_window: 7,
            histogram_window: 4,
            slow_d_window: 4,
            liquidity_floor: 2_000_000.0,
            rsi_low: 40.0,
            rsi_high: 75.0,
            d_low: 10.0,
            d_high: 50.0,
            conviction_cutoff: 0.5,
            sell_d_floor: 50.0,
            trend_confirmation: TrendConfirmation::FastOverSlow { fast: 50, slow: 100 },
            sell_rule: SellRule::ReversalConfirmation,
        }
    }
}

/// Rotation-controller parameters: funding, sizing, stops, timeouts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RotationConfig {
    pub benchmark_symbol: String,
    /// Capital moved per entry, in account currency.
    pub trade_notional: f64,
    /// Divisor headroom reserved against price movement between sizing and
    /// the entry's own fill (1.2 = 20%).
    pub slippage_headroom: f64,
    pub entry_funding: EntryFunding,
    pub protective_stop: ProtectiveStop,
    /// Require current price above average entry before acting on a sell
    /// signal.
    pub require_profit_on_sell: bool,
    /// Bars an entry-funding order may remain unfilled before the entry is
    /// abandoned and the instrument reverts to Idle. None = wait forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_timeout_bars: Option<usize>,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            benchmark_symbol: "SPY".into(),
            trade_notional: 10_000.0,
            slippage_headroom: 1.2,
            entry_funding: EntryFunding::Tracked,
            protective_stop: ProtectiveStop::PercentBelow { fraction: 0.95 },
            require_profit_on_sell: true,
            pending_timeout_bars: Some(5),
        }
    }
}

/// Universe ranking parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UniverseConfig {
    /// Candidates at or below this price are excluded.
    pub min_price: f64,
    /// Maximum universe size after ranking by dollar volume.
    pub max_size: usize,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            min_price: 10.0,
            max_size: 1000,
        }
    }
}

/// Complete strategy configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StrategyConfig {
    pub signal: SignalConfig,
    pub rotation: RotationConfig,
    pub universe: UniverseConfig,
}

impl StrategyConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.signal;
        if s.rsi_low >= s.rsi_high {
            return Err(ConfigError::EmptyRsiBand {
                low: s.rsi_low,
                high: s.rsi_high,
            });
        }
        if s.d_low >= s.d_high {
            return Err(ConfigError::EmptyDBand {
                low: s.d_low,
                high: s.d_high,
            });
        }
        for (name, len) in [
            ("volume_window", s.volume_window),
            ("rsi_window", s.rsi_window),
            ("histogram_window", s.histogram_window),
            ("slow_d_window", s.slow_d_window),
        ] {
            if len < 2 {
                return Err(ConfigError::WindowTooShort { name, len });
            }
        }

        let has = |lookback: usize| s.sma_lookbacks.contains(&lookback);
        match &s.trend_confirmation {
            TrendConfirmation::FastOverSlow { fast, slow } => {
                for &lb in &[*fast, *slow] {
                    if !has(lb) {
                        return Err(ConfigError::MissingLookback {
                            lookback: lb,
                            referenced_by: "trend_confirmation",
                        });
                    }
                }
            }
            TrendConfirmation::MaRegime {
                short,
                medium,
                long,
            } => {
                for &lb in &[*short, *medium, *long] {
                    if !has(lb) {
                        return Err(ConfigError::MissingLookback {
                            lookback: lb,
                            referenced_by: "trend_confirmation",
                        });
                    }
                }
            }
        }
        if let SellRule::SmaCross { fast, slow } = &s.sell_rule {
            for &lb in &[*fast, *slow] {
                if !has(lb) {
                    return Err(ConfigError::MissingLookback {
                        lookback: lb,
                        referenced_by: "sell_rule",
                    });
                }
            }
        }

        let r = &self.rotation;
        if r.slippage_headroom < 1.0 {
            return Err(ConfigError::HeadroomBelowOne(r.slippage_headroom));
        }
        if r.trade_notional <= 0.0 {
            return Err(ConfigError::NonPositiveNotional(r.trade_notional));
        }
        match &r.protective_stop {
            ProtectiveStop::PercentBelow { fraction } => {
                if !(0.0 < *fraction && *fraction < 1.0) {
                    return Err(ConfigError::StopFractionOutOfRange(*fraction));
                }
            }
            ProtectiveStop::LongSma {
                lookback,
                fallback_fraction,
            } => {
                if !(0.0 < *fallback_fraction && *fallback_fraction < 1.0) {
                    return Err(ConfigError::StopFractionOutOfRange(*fallback_fraction));
                }
                if !has(*lookback) {
                    return Err(ConfigError::MissingLookback {
                        lookback: *lookback,
                        referenced_by: "protective_stop",
                    });
                }
            }
        }

        Ok(())
    }

    /// BLAKE3 hash of the canonical JSON serialization, as a hex string.
    ///
    /// Struct field order is fixed, so serde_json output is deterministic.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("StrategyConfig must serialize");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
