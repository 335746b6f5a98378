//! Market regime detection.
//!
//! Classifies overall market stress from the full per-tick snapshot set
//! plus price history, and owns the regime-aware threshold adjustment
//! used by the evaluator and the explainer. Unavailable snapshots are
//! excluded before any aggregation.

use tracing::debug;

use crate::history::{volatility_ratio, PriceHistory};
use crate::types::{AssetSnapshot, MarketRegime, RiskState};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Regime-internal risk cut points. Deliberately distinct from the action
/// tier thresholds below — unifying the two sets would silently change
/// classification.
pub const ELEVATED_RISK_CUT: u8 = 25;
pub const HIGH_RISK_CUT: u8 = 40;
pub const CRITICAL_RISK_CUT: u8 = 60;

/// Minimum history length before an asset participates in the
/// volatility-spike signal.
const SPIKE_MIN_HISTORY: usize = 20;

/// Recent/baseline stddev ratio that counts as a volatility spike.
const SPIKE_RATIO: f64 = 3.0;

/// Same-direction peg deviation that counts toward contagion.
const CONTAGION_DEVIATION: f64 = 0.001;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Action tier thresholds: the minimum risk score that triggers each tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub alert: u8,
    pub rebalance: u8,
    pub emergency: u8,
}

/// Base tiers under a normal regime.
pub const BASE_THRESHOLDS: Thresholds = Thresholds {
    alert: 26,
    rebalance: 51,
    emergency: 76,
};

impl Thresholds {
    /// Regime-adjusted tiers: each base value scaled by the regime
    /// multiplier and rounded to the nearest integer. A lower multiplier
    /// shrinks the thresholds, making the agent more sensitive.
    pub fn adjusted_for(regime: MarketRegime) -> Self {
        let m = regime.threshold_multiplier();
        let scale = |base: u8| (f64::from(base) * m).round() as u8;
        Thresholds {
            alert: scale(BASE_THRESHOLDS.alert),
            rebalance: scale(BASE_THRESHOLDS.rebalance),
            emergency: scale(BASE_THRESHOLDS.emergency),
        }
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct RegimeDetector;

impl RegimeDetector {
    pub fn new() -> Self {
        Self
    }

    /// Classify the market from this tick's snapshots and the shared
    /// price history. Runs only after all assets have been scored.
    pub fn detect(&self, snapshots: &[AssetSnapshot], history: &PriceHistory) -> MarketRegime {
        let active: Vec<&RiskState> = snapshots.iter().filter_map(|s| s.state()).collect();
        if active.is_empty() {
            return MarketRegime::Normal;
        }

        // Signal 1: average risk across active assets.
        let avg_risk = active.iter().map(|s| f64::from(s.risk_score)).sum::<f64>()
            / active.len() as f64;

        // Signal 2: breadth of elevated/high risk.
        let elevated_count = active
            .iter()
            .filter(|s| s.risk_score > ELEVATED_RISK_CUT)
            .count();
        let high_count = active
            .iter()
            .filter(|s| s.risk_score > HIGH_RISK_CUT)
            .count();

        // Signal 3: volatility spike in any asset's recent price window.
        let volatility_spike = active.iter().any(|s| {
            let prices = history.prices(s.asset);
            prices.len() >= SPIKE_MIN_HISTORY
                && volatility_ratio(&prices).is_some_and(|r| r > SPIKE_RATIO)
        });

        // Signal 4: contagion — two or more assets off peg in the same
        // direction.
        let deviations: Vec<f64> = active.iter().map(|s| s.price - 1.0).collect();
        let all_negative =
            deviations.len() >= 2 && deviations.iter().all(|d| *d < -CONTAGION_DEVIATION);
        let all_positive =
            deviations.len() >= 2 && deviations.iter().all(|d| *d > CONTAGION_DEVIATION);
        let contagion = all_negative || all_positive;

        let any_critical = active.iter().any(|s| s.risk_score > CRITICAL_RISK_CUT);

        let regime = if avg_risk > f64::from(HIGH_RISK_CUT)
            || any_critical
            || high_count >= 2
            || (contagion && volatility_spike)
        {
            MarketRegime::Crisis
        } else if avg_risk > 20.0
            || high_count >= 1
            || (elevated_count >= 1 && volatility_spike)
            || contagion
        {
            MarketRegime::Stressed
        } else {
            MarketRegime::Normal
        };

        debug!(
            %regime,
            avg_risk = format!("{avg_risk:.1}"),
            elevated_count,
            high_count,
            volatility_spike,
            contagion,
            active = active.len(),
            "Regime classified"
        );

        regime
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
