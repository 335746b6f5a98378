//! Bounded per-asset price history.
//!
//! Owns the time series of observations that both the risk engine and the
//! regime detector read. Single writer (the host's ingestion step);
//! readers only ever see per-tick slices. Also hosts the population
//! stddev and window-split helpers shared by the two consumers.

use std::collections::HashMap;
use std::collections::VecDeque;

use crate::types::{Asset, Observation};

/// Capacity per asset — roughly one hour at the nominal 10s tick.
pub const MAX_HISTORY: usize = 360;

/// Width of the "recent" volatility window.
pub const RECENT_WINDOW: usize = 10;

/// Earliest position (from the end) of the baseline volatility window.
/// The baseline covers positions [-60, -10), i.e. up to 50 points.
pub const BASELINE_SPAN: usize = 60;

/// Minimum baseline points required for a volatility comparison.
pub const MIN_BASELINE_POINTS: usize = 5;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Bounded per-asset observation series, oldest evicted first.
#[derive(Debug, Default)]
pub struct PriceHistory {
    series: HashMap<Asset, VecDeque<Observation>>,
}

impl PriceHistory {
    pub fn new() -> Self {
        let mut series = HashMap::new();
        for asset in Asset::ALL {
            series.insert(*asset, VecDeque::with_capacity(MAX_HISTORY));
        }
        Self { series }
    }

    /// Append an observation, evicting the oldest entry at capacity.
    pub fn append(&mut self, obs: Observation) {
        let entries = self.series.entry(obs.asset).or_default();
        if entries.len() == MAX_HISTORY {
            entries.pop_front();
        }
        entries.push_back(obs);
    }

    /// Ingest one tick's observation batch. This is the only write path
    /// the host uses; scoring reads the result but never mutates it.
    pub fn ingest(&mut self, observations: &[Observation]) {
        for obs in observations {
            self.append(obs.clone());
        }
    }

    /// Number of stored observations for an asset.
    pub fn len(&self, asset: Asset) -> usize {
        self.series.get(&asset).map_or(0, |s| s.len())
    }

    pub fn is_empty(&self, asset: Asset) -> bool {
        self.len(asset) == 0
    }

    /// Price series for an asset, oldest first.
    pub fn prices(&self, asset: Asset) -> Vec<f64> {
        self.series
            .get(&asset)
            .map(|s| s.iter().map(|o| o.price).collect())
            .unwrap_or_default()
    }

    /// Most recent observation for an asset.
    pub fn latest(&self, asset: Asset) -> Option<&Observation> {
        self.series.get(&asset).and_then(|s| s.back())
    }
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

/// Population standard deviation. Returns 0.0 for an empty slice.
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Split a price series into the recent window (last 10 points) and the
/// baseline window (positions [-60, -10)). Returns `None` with fewer than
/// `RECENT_WINDOW` points.
pub fn volatility_windows(prices: &[f64]) -> Option<(&[f64], &[f64])> {
    if prices.len() < RECENT_WINDOW {
        return None;
    }
    let split = prices.len() - RECENT_WINDOW;
    let start = prices.len().saturating_sub(BASELINE_SPAN);
    Some((&prices[split..], &prices[start..split]))
}

/// Ratio of recent-window stddev to baseline-window stddev.
///
/// `None` when there are too few points, too few baseline points, or the
/// baseline stddev is zero (callers that care about the zero-baseline
/// case handle it themselves).
pub fn volatility_ratio(prices: &[f64]) -> Option<f64> {
    let (recent, baseline) = volatility_windows(prices)?;
    if baseline.len() < MIN_BASELINE_POINTS {
        return None;
    }
    let baseline_std = population_std_dev(baseline);
    if baseline_std == 0.0 {
        return None;
    }
    Some(population_std_dev(recent) / baseline_std)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
