//! Rotolab CLI — run rotation sessions and inspect strategy configs.
//!
//! Commands:
//! - `run` — execute a rotation session over a CSV bar file
//! - `config show` — print the effective strategy configuration as TOML
//! - `config fingerprint` — print the config's BLAKE3 run identity

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rotolab_core::config::StrategyConfig;
use rotolab_core::data::load_bars_csv;
use rotolab_core::rotation::{FillMode, SimVenue};
use rotolab_core::session::run_session;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rotolab",
    about = "Rotolab CLI — benchmark-rotation signal engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a rotation session over a CSV bar file.
    Run {
        /// Path to a TOML strategy config. Defaults omit it entirely.
        #[arg(long)]
        config: Option<PathBuf>,

        /// CSV bar file: symbol,date,open,high,low,close,volume.
        #[arg(long)]
        bars: PathBuf,

        /// Starting cash.
        #[arg(long, default_value_t = 1_000_000.0)]
        cash: f64,

        /// When simulated market orders fill relative to submission.
        #[arg(long, value_enum, default_value_t = FillTiming::Deferred)]
        fills: FillTiming,
    },
    /// Inspect the strategy configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show {
        /// Path to a TOML strategy config. Defaults omit it entirely.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the configuration's BLAKE3 fingerprint.
    Fingerprint {
        /// Path to a TOML strategy config. Defaults omit it entirely.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// CLI-facing fill timing selector.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FillTiming {
    /// Fills apply in the same simulated instant as submission.
    Immediate,
    /// Fills apply one bar after submission.
    Deferred,
}

impl From<FillTiming> for FillMode {
    fn from(timing: FillTiming) -> Self {
        match timing {
            FillTiming::Immediate => FillMode::Immediate,
            FillTiming::Deferred => FillMode::Deferred,
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<StrategyConfig> {
    match path {
        Some(path) => StrategyConfig::load(path)
            .with_context(|| format!("loading strategy config from {}", path.display())),
        None => Ok(StrategyConfig::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            bars,
            cash,
            fills,
        } => run(config.as_deref(), &bars, cash, fills),
        Commands::Config { action } => match action {
            ConfigAction::Show { config } => {
                let config = load_config(config.as_deref())?;
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
            ConfigAction::Fingerprint { config } => {
                let config = load_config(config.as_deref())?;
                println!("{}", config.fingerprint());
                Ok(())
            }
        },
    }
}

fn run(config: Option<&Path>, bars_path: &Path, cash: f64, fills: FillTiming) -> Result<()> {
    if cash <= 0.0 {
        bail!("starting cash must be positive, got {cash}");
    }
    let config = load_config(config)?;
    let bars = load_bars_csv(bars_path)
        .with_context(|| format!("loading bars from {}", bars_path.display()))?;
    if bars.is_empty() {
        bail!("no bars found in {}", bars_path.display());
    }

    let mut venue = SimVenue::new(cash, fills.into());
    let summary = run_session(&config, &bars, &mut venue)?;

    println!("config fingerprint : {}", config.fingerprint());
    println!("trading days       : {}", summary.trading_days);
    println!("instruments tracked: {}", summary.instruments_tracked);
    println!("orders submitted   : {}", summary.orders_submitted);
    println!("fills delivered    : {}", summary.fills_delivered);
    println!("final cash         : {:.2}", summary.final_cash);
    println!("final equity       : {:.2}", summary.final_equity);
    Ok(())
}
