//! Risk scoring engine.
//!
//! Converts one observation plus its bounded history (and an optional
//! externally-computed liquidity score) into four 0–100 sub-scores and a
//! combined weighted risk score. Pure function of its inputs — no hidden
//! state, never fails; missing optional inputs degrade to documented
//! fallbacks.

use tracing::trace;

use crate::history::{population_std_dev, volatility_windows, MIN_BASELINE_POINTS};
use crate::types::{Asset, Observation, RiskFactorScores, RiskState};

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Fixed factor weights. Must sum to 1.0.
pub const WEIGHT_PRICE_DEVIATION: f64 = 0.40;
pub const WEIGHT_LIQUIDITY: f64 = 0.30;
pub const WEIGHT_VOLUME_ANOMALY: f64 = 0.20;
pub const WEIGHT_WHALE_FLOW: f64 = 0.10;

// ---------------------------------------------------------------------------
// Whale flow provider
// ---------------------------------------------------------------------------

/// External large-transfer signal. The default implementation returns a
/// constant zero; a webhook-driven provider can be injected without
/// touching the scoring formula.
pub trait WhaleFlowProvider: Send + Sync {
    /// Current whale-flow sub-score for an asset, 0–100.
    fn flow_score(&self, asset: Asset) -> u8;
}

/// No whale signal wired up — always scores zero.
#[derive(Debug, Default)]
pub struct NoWhaleFeed;

impl WhaleFlowProvider for NoWhaleFeed {
    fn flow_score(&self, _asset: Asset) -> u8 {
        0
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct RiskEngine {
    whale: Box<dyn WhaleFlowProvider>,
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskEngine {
    pub fn new() -> Self {
        Self {
            whale: Box::new(NoWhaleFeed),
        }
    }

    pub fn with_whale_provider(whale: Box<dyn WhaleFlowProvider>) -> Self {
        Self { whale }
    }

    /// Score one observation against its price history.
    ///
    /// `history` is the asset's full bounded price series, oldest first,
    /// including the current observation. `external_liquidity` is the
    /// DEX-probe score when fresh; `None` falls back to the
    /// confidence-ratio proxy.
    pub fn score(
        &self,
        obs: &Observation,
        history: &[f64],
        external_liquidity: Option<u8>,
    ) -> RiskState {
        let factors = RiskFactorScores {
            price_deviation: price_deviation_score(obs.price),
            liquidity: liquidity_score(obs, external_liquidity),
            volume_anomaly: volume_anomaly_score(history),
            whale_flow: self.whale.flow_score(obs.asset),
        };

        let weighted = f64::from(factors.price_deviation) * WEIGHT_PRICE_DEVIATION
            + f64::from(factors.liquidity) * WEIGHT_LIQUIDITY
            + f64::from(factors.volume_anomaly) * WEIGHT_VOLUME_ANOMALY
            + f64::from(factors.whale_flow) * WEIGHT_WHALE_FLOW;
        let risk_score = weighted.round().clamp(0.0, 100.0) as u8;

        trace!(
            asset = %obs.asset,
            price = obs.price,
            risk_score,
            dev = factors.price_deviation,
            liq = factors.liquidity,
            vol = factors.volume_anomaly,
            whale = factors.whale_flow,
            "Scored observation"
        );

        RiskState {
            asset: obs.asset,
            price: obs.price,
            confidence: obs.confidence,
            risk_score,
            factors,
            computed_at: obs.observed_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Sub-scores
// ---------------------------------------------------------------------------

/// Bucketed distance from the $1.00 peg. Monotonic, no smoothing.
pub fn price_deviation_score(price: f64) -> u8 {
    let deviation = (price - 1.0).abs();

    if deviation < 0.001 {
        0 // < 0.1%
    } else if deviation < 0.003 {
        15 // < 0.3%
    } else if deviation < 0.005 {
        30 // < 0.5%
    } else if deviation < 0.01 {
        50 // < 1%
    } else if deviation < 0.02 {
        75 // < 2%
    } else if deviation < 0.05 {
        90 // < 5%
    } else {
        100 // extreme depeg
    }
}

/// Liquidity sub-score. The external DEX-probe score is used verbatim;
/// without one, the oracle confidence interval is a liquidity proxy
/// (wider interval = thinner market) bucketed to the same 0–100 scale.
fn liquidity_score(obs: &Observation, external: Option<u8>) -> u8 {
    if let Some(score) = external {
        return score.min(100);
    }

    let confidence_ratio = obs.confidence / obs.price;

    if confidence_ratio < 0.0001 {
        0 // very tight spread
    } else if confidence_ratio < 0.0005 {
        15
    } else if confidence_ratio < 0.001 {
        30
    } else if confidence_ratio < 0.005 {
        50
    } else if confidence_ratio < 0.01 {
        75
    } else {
        100 // very wide spread
    }
}

/// Volatility-ratio proxy for volume anomalies: the last 10 prices
/// against the up-to-50 preceding them. Too little history degrades to 0.
fn volume_anomaly_score(history: &[f64]) -> u8 {
    let Some((recent, baseline)) = volatility_windows(history) else {
        return 0;
    };
    if baseline.len() < MIN_BASELINE_POINTS {
        return 0; // insufficient baseline
    }

    let recent_std = population_std_dev(recent);
    let baseline_std = population_std_dev(baseline);

    if baseline_std == 0.0 {
        return if recent_std > 0.0 { 50 } else { 0 };
    }

    let ratio = recent_std / baseline_std;

    if ratio < 1.5 {
        0
    } else if ratio < 3.0 {
        25
    } else if ratio < 5.0 {
        50
    } else if ratio < 10.0 {
        75
    } else {
        100
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
