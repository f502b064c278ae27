//! Bar data loading.
//!
//! CSV columns: `symbol,date,open,high,low,close,volume` with ISO dates.
//! Bars are sorted stably by date after loading; chronological delivery
//! is the feed contract everything downstream assumes.

use crate::domain::Bar;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to open bar file {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse bar record: {0}")]
    Parse(#[from] csv::Error),
}

/// Load bars from a CSV file, sorted by date (stable within a day).
pub fn load_bars_csv(path: &Path) -> Result<Vec<Bar>, DataError> {
    let file = std::fs::File::open(path).map_err(|source| DataError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);
    let mut bars = Vec::new();
    for record in reader.deserialize() {
        let bar: Bar = record?;
        bars.push(bar);
    }
    bars.sort_by_key(|bar| bar.date);
    Ok(bars)
}
