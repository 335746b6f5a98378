//! Decision explainer.
//!
//! Turns a scored state, the full snapshot set, the regime, and the
//! chosen action into a structured, human-auditable rationale. Pure and
//! read-only; the factor detail strings mirror the engine's bucket
//! semantics exactly so the explanation always matches the number that
//! produced the decision.

use crate::risk::engine::{
    WEIGHT_LIQUIDITY, WEIGHT_PRICE_DEVIATION, WEIGHT_VOLUME_ANOMALY, WEIGHT_WHALE_FLOW,
};
use crate::risk::regime::Thresholds;
use crate::types::{
    ActionKind, Asset, AssetSnapshot, MarketRegime, Reasoning, RiskFactor, RiskState,
};

#[derive(Debug, Default)]
pub struct DecisionExplainer;

impl DecisionExplainer {
    pub fn new() -> Self {
        Self
    }

    pub fn explain(
        &self,
        state: &RiskState,
        all_snapshots: &[AssetSnapshot],
        regime: MarketRegime,
        action: ActionKind,
    ) -> Reasoning {
        Reasoning {
            summary: build_summary(state, action, regime),
            factors: build_factors(state),
            regime,
            decision: action,
            alternatives: build_alternatives(state.asset, all_snapshots),
            threshold_context: build_threshold_context(state.risk_score, action, regime),
        }
    }
}

fn build_factors(state: &RiskState) -> Vec<RiskFactor> {
    let deviation_pct = (state.price - 1.0).abs() * 100.0;
    let liquidity = state.factors.liquidity;
    let volume = state.factors.volume_anomaly;
    let whale = state.factors.whale_flow;

    vec![
        RiskFactor {
            name: "Price Deviation".to_string(),
            score: state.factors.price_deviation,
            weight: WEIGHT_PRICE_DEVIATION,
            detail: format!(
                "Price ${:.4} ({deviation_pct:.2}% from peg)",
                state.price
            ),
        },
        RiskFactor {
            name: "Liquidity".to_string(),
            score: liquidity,
            weight: WEIGHT_LIQUIDITY,
            detail: if liquidity == 0 {
                "DEX slippage < 0.1% for $100K".to_string()
            } else if liquidity <= 15 {
                "DEX slippage < 0.3% for $100K".to_string()
            } else if liquidity <= 30 {
                "DEX slippage < 0.5% for $100K".to_string()
            } else {
                format!("Elevated slippage (score: {liquidity})")
            },
        },
        RiskFactor {
            name: "Volume Anomaly".to_string(),
            score: volume,
            weight: WEIGHT_VOLUME_ANOMALY,
            detail: if volume == 0 {
                "Volatility within normal range".to_string()
            } else if volume >= 50 {
                "Volatility significantly above baseline".to_string()
            } else {
                "Volatility above baseline".to_string()
            },
        },
        RiskFactor {
            name: "Whale Flow".to_string(),
            score: whale,
            weight: WEIGHT_WHALE_FLOW,
            detail: if whale == 0 {
                "No large transfers detected".to_string()
            } else {
                format!("Large transfer activity detected (score: {whale})")
            },
        },
    ]
}

fn build_alternatives(current: Asset, all_snapshots: &[AssetSnapshot]) -> Vec<String> {
    all_snapshots
        .iter()
        .filter(|s| s.asset() != current)
        .map(|s| match s.state() {
            Some(state) => format!("{} (risk: {}/100)", state.asset, state.risk_score),
            None => format!("{} (feed unavailable)", s.asset()),
        })
        .collect()
}

fn build_summary(state: &RiskState, action: ActionKind, regime: MarketRegime) -> String {
    let regime_label = if regime != MarketRegime::Normal {
        format!(" [{} regime]", regime.to_string().to_uppercase())
    } else {
        String::new()
    };
    let base = format!(
        "{} risk at {}/100 (price: ${:.4}).{regime_label}",
        state.asset, state.risk_score, state.price
    );

    match action {
        ActionKind::EmergencyExit => format!("CRITICAL: {base} Emergency exit initiated."),
        ActionKind::Rebalance => format!("HIGH RISK: {base} Protective rebalance triggered."),
        ActionKind::Alert => format!("ELEVATED: {base} Monitoring closely."),
        ActionKind::Monitor => base,
    }
}

/// Current score plus the next escalation tier, computed from the
/// regime-adjusted thresholds — the same values the evaluator compared
/// against this tick.
fn build_threshold_context(risk_score: u8, action: ActionKind, regime: MarketRegime) -> String {
    let t = Thresholds::adjusted_for(regime);
    match action {
        ActionKind::EmergencyExit => {
            format!("Current: {risk_score}. Maximum severity reached.")
        }
        ActionKind::Rebalance => {
            format!("Current: {risk_score}. Emergency exit at {}.", t.emergency)
        }
        ActionKind::Alert => {
            format!(
                "Current: {risk_score}. Next action at {} (REBALANCE).",
                t.rebalance
            )
        }
        ActionKind::Monitor => {
            format!("Current: {risk_score}. Alert at {}.", t.alert)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
