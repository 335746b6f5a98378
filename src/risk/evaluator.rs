//! Action evaluator.
//!
//! The graduated decision state machine: per tick, per asset, it compares
//! the risk score against regime-adjusted thresholds in descending
//! severity, applies alert dedup, picks a protective destination for
//! swap-tier actions, and attaches a rationale to every emitted action.
//! Pure decision logic — cannot fail; executing an emitted action is the
//! host's responsibility and never rolls the decision back.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::actions::ActionLog;
use crate::risk::explainer::DecisionExplainer;
use crate::risk::regime::Thresholds;
use crate::types::{ActionKind, ActionRecord, Asset, AssetSnapshot, MarketRegime, RiskState};

/// How many of the latest recorded actions the alert dedup inspects.
pub const ALERT_DEDUP_LOOKBACK: usize = 5;

/// Wall-clock suppression window for repeat alerts on the same asset.
pub const ALERT_DEDUP_WINDOW_SECS: i64 = 60;

pub struct ActionEvaluator {
    explainer: DecisionExplainer,
}

impl Default for ActionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionEvaluator {
    pub fn new() -> Self {
        Self {
            explainer: DecisionExplainer::new(),
        }
    }

    /// Evaluate every snapshot for this tick, in tracked order. At most
    /// one action per asset; unavailable assets are skipped entirely.
    pub fn evaluate_all(
        &self,
        snapshots: &[AssetSnapshot],
        regime: MarketRegime,
        log: &ActionLog,
        now: DateTime<Utc>,
    ) -> Vec<ActionRecord> {
        let thresholds = Thresholds::adjusted_for(regime);
        snapshots
            .iter()
            .filter_map(|s| s.state())
            .filter_map(|state| self.evaluate(state, snapshots, regime, thresholds, log, now))
            .collect()
    }

    /// Evaluate one asset. Descending severity, first match wins.
    fn evaluate(
        &self,
        state: &RiskState,
        all_snapshots: &[AssetSnapshot],
        regime: MarketRegime,
        thresholds: Thresholds,
        log: &ActionLog,
        now: DateTime<Utc>,
    ) -> Option<ActionRecord> {
        if state.risk_score >= thresholds.emergency {
            let to = safest_destination(all_snapshots, state.asset);
            return Some(self.swap_action(
                ActionKind::EmergencyExit,
                state,
                to,
                all_snapshots,
                regime,
                now,
            ));
        }

        if state.risk_score >= thresholds.rebalance {
            let to = safest_destination(all_snapshots, state.asset);
            return Some(self.swap_action(
                ActionKind::Rebalance,
                state,
                to,
                all_snapshots,
                regime,
                now,
            ));
        }

        if state.risk_score >= thresholds.alert {
            let suppressed = log.contains_recent(
                state.asset,
                ActionKind::Alert,
                ALERT_DEDUP_LOOKBACK,
                Duration::seconds(ALERT_DEDUP_WINDOW_SECS),
                now,
            );
            if suppressed {
                debug!(
                    asset = %state.asset,
                    risk = state.risk_score,
                    "Alert suppressed (already alerted within window)"
                );
                return None;
            }

            let reasoning =
                self.explainer
                    .explain(state, all_snapshots, regime, ActionKind::Alert);
            let record = ActionRecord {
                issued_at: now,
                kind: ActionKind::Alert,
                from_asset: state.asset,
                to_asset: None,
                risk_score: state.risk_score,
                details: format!(
                    "ELEVATED: {} risk at {}/100 (price: ${:.4}). Monitoring closely.",
                    state.asset, state.risk_score, state.price
                ),
                reasoning: Some(reasoning),
            };
            info!(action = %record, "Alert issued");
            return Some(record);
        }

        // Implicit MONITOR — no record.
        None
    }

    fn swap_action(
        &self,
        kind: ActionKind,
        state: &RiskState,
        to: Asset,
        all_snapshots: &[AssetSnapshot],
        regime: MarketRegime,
        now: DateTime<Utc>,
    ) -> ActionRecord {
        let reasoning = self.explainer.explain(state, all_snapshots, regime, kind);
        let record = ActionRecord {
            issued_at: now,
            kind,
            from_asset: state.asset,
            to_asset: Some(to),
            risk_score: state.risk_score,
            details: format!(
                "{kind}: {} → {to} (risk: {}/100, price: ${:.4})",
                state.asset, state.risk_score, state.price
            ),
            reasoning: Some(reasoning),
        };
        info!(action = %record, "Protective action issued");
        record
    }
}

/// The lowest-risk asset among all *other* tracked assets, ties broken by
/// tracked order. Falls back to the first other tracked asset when no
/// other asset has a score this tick — never the source asset itself.
fn safest_destination(snapshots: &[AssetSnapshot], exclude: Asset) -> Asset {
    let mut safest: Option<(Asset, u8)> = None;
    for snap in snapshots {
        if snap.asset() == exclude {
            continue;
        }
        if let Some(state) = snap.state() {
            let better = match safest {
                Some((_, best)) => state.risk_score < best,
                None => true,
            };
            if better {
                safest = Some((state.asset, state.risk_score));
            }
        }
    }

    match safest {
        Some((asset, _)) => asset,
        None => Asset::ALL
            .iter()
            .copied()
            .find(|a| *a != exclude)
            .unwrap_or(exclude),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
