//! Universe ranking — the daily eligible-instrument list.
//!
//! Candidates are ranked by dollar volume descending, price-filtered, and
//! truncated. Ties break on symbol so the ordering is deterministic across
//! runs.

use crate::config::UniverseConfig;
use std::cmp::Ordering;

/// One candidate for today's universe.
#[derive(Debug, Clone)]
pub struct UniverseEntry {
    pub symbol: String,
    pub price: f64,
    pub dollar_volume: f64,
}

/// Rank candidates: filter price, sort by dollar volume, truncate.
pub fn rank_universe(candidates: &[UniverseEntry], config: &UniverseConfig) -> Vec<String> {
    let mut eligible: Vec<&UniverseEntry> = candidates
        .iter()
        .filter(|entry| entry.price > config.min_price)
        .collect();
    eligible.sort_by(|a, b| {
        b.dollar_volume
            .partial_cmp(&a.dollar_volume)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    eligible
        .into_iter()
        .take(config.max_size)
        .map(|entry| entry.symbol.clone())
        .collect()
}
