//! Risk pipeline.
//!
//! Per tick the host runs three stages in order: score every tracked
//! asset, classify the market regime from the full snapshot set, then
//! evaluate graduated actions against regime-adjusted thresholds. The
//! free functions here are the stage contracts; the structs they drive
//! live in the submodules.

pub mod engine;
pub mod evaluator;
pub mod explainer;
pub mod regime;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::actions::ActionLog;
use crate::history::PriceHistory;
use crate::types::{ActionRecord, Asset, AssetSnapshot, MarketRegime, Observation};

pub use engine::{NoWhaleFeed, RiskEngine, WhaleFlowProvider};
pub use evaluator::ActionEvaluator;
pub use explainer::DecisionExplainer;
pub use regime::{RegimeDetector, Thresholds, BASE_THRESHOLDS};

/// Stage 1: score every tracked asset against the already-ingested
/// history. Returns exactly one snapshot per tracked asset, in tracked
/// order; assets with no observation this tick come back `Unavailable`.
///
/// The host ingests the tick's observations into the history before
/// calling this; scoring is a pure read, so replaying the same tick
/// against the same history yields the same snapshots.
pub fn score_tick(
    engine: &RiskEngine,
    observations: &[Observation],
    history: &PriceHistory,
    liquidity: &HashMap<Asset, u8>,
    now: DateTime<Utc>,
) -> Vec<AssetSnapshot> {
    Asset::ALL
        .iter()
        .map(|asset| {
            let obs = observations.iter().find(|o| o.asset == *asset);
            match obs {
                Some(obs) => {
                    let prices = history.prices(*asset);
                    let state = engine.score(obs, &prices, liquidity.get(asset).copied());
                    AssetSnapshot::Available(state)
                }
                None => AssetSnapshot::Unavailable {
                    asset: *asset,
                    as_of: now,
                },
            }
        })
        .collect()
}

/// Stage 2: classify the regime from the full snapshot set. Returns the
/// regime together with its threshold multiplier, so callers that only
/// need the scaling factor don't have to re-derive it.
pub fn detect_regime(
    detector: &RegimeDetector,
    snapshots: &[AssetSnapshot],
    history: &PriceHistory,
) -> (MarketRegime, f64) {
    let regime = detector.detect(snapshots, history);
    (regime, regime.threshold_multiplier())
}

/// Mean risk score across available snapshots, 0.0 when none are.
pub fn average_risk(snapshots: &[AssetSnapshot]) -> f64 {
    let scores: Vec<f64> = snapshots
        .iter()
        .filter_map(|s| s.state())
        .map(|s| f64::from(s.risk_score))
        .collect();
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Stage 3: evaluate actions for every available asset and record the
/// emitted ones in the log, so the next tick's dedup sees them.
pub fn evaluate_actions(
    evaluator: &ActionEvaluator,
    snapshots: &[AssetSnapshot],
    regime: MarketRegime,
    log: &mut ActionLog,
    now: DateTime<Utc>,
) -> Vec<ActionRecord> {
    let actions = evaluator.evaluate_all(snapshots, regime, log, now);
    for action in &actions {
        log.append(action.clone());
    }
    actions
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActionKind;
    use chrono::Duration;

    fn obs(asset: Asset, price: f64) -> Observation {
        Observation {
            asset,
            price,
            confidence: 0.00005,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_score_tick_one_snapshot_per_tracked_asset() {
        let engine = RiskEngine::new();
        let mut history = PriceHistory::new();
        let observations = vec![obs(Asset::Usdc, 1.0), obs(Asset::Usdt, 0.999)];
        history.ingest(&observations);

        let snapshots = score_tick(
            &engine,
            &observations,
            &history,
            &HashMap::new(),
            Utc::now(),
        );

        assert_eq!(snapshots.len(), Asset::ALL.len());
        for (snap, asset) in snapshots.iter().zip(Asset::ALL.iter()) {
            assert_eq!(snap.asset(), *asset);
        }
        assert!(snapshots[0].is_available());
        assert!(snapshots[1].is_available());
        assert!(!snapshots[2].is_available()); // no PYUSD observation
    }

    #[test]
    fn test_score_tick_replay_is_deterministic() {
        let engine = RiskEngine::new();
        let mut history = PriceHistory::new();

        // 14 points sits right at the edge of the volatility baseline:
        // one more would flip the volatility sub-score from 0 to live,
        // so any hidden write between two identical calls shows up as a
        // score change.
        for i in 0..13 {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            history.append(obs(Asset::Usdc, 1.0 + sign * 1e-4));
        }
        let observations = vec![obs(Asset::Usdc, 1.0002)];
        history.ingest(&observations);
        let before = history.len(Asset::Usdc);

        let first = score_tick(&engine, &observations, &history, &HashMap::new(), Utc::now());
        let second = score_tick(&engine, &observations, &history, &HashMap::new(), Utc::now());

        // Scoring reads history without growing it, so the replay sees
        // the same windows and produces the same scores.
        assert_eq!(history.len(Asset::Usdc), before);
        let a = first[0].state().unwrap();
        let b = second[0].state().unwrap();
        assert_eq!(a.risk_score, b.risk_score);
        assert_eq!(a.factors, b.factors);
    }

    #[test]
    fn test_score_tick_uses_liquidity_cache() {
        let engine = RiskEngine::new();
        let mut history = PriceHistory::new();
        let observations = vec![obs(Asset::Usdc, 1.0)];
        history.ingest(&observations);
        let mut liquidity = HashMap::new();
        liquidity.insert(Asset::Usdc, 75u8);

        let snapshots =
            score_tick(&engine, &observations, &history, &liquidity, Utc::now());
        let state = snapshots[0].state().unwrap();
        assert_eq!(state.factors.liquidity, 75);
    }

    #[test]
    fn test_detect_regime_returns_multiplier() {
        let engine = RiskEngine::new();
        let detector = RegimeDetector::new();
        let mut history = PriceHistory::new();
        let observations = vec![
            obs(Asset::Usdc, 1.0),
            obs(Asset::Usdt, 1.0),
            obs(Asset::Pyusd, 1.0),
        ];
        history.ingest(&observations);
        let snapshots = score_tick(
            &engine,
            &observations,
            &history,
            &HashMap::new(),
            Utc::now(),
        );

        let (regime, multiplier) = detect_regime(&detector, &snapshots, &history);
        assert_eq!(regime, MarketRegime::Normal);
        assert_eq!(multiplier, 1.0);
    }

    #[test]
    fn test_detect_regime_empty_set() {
        let detector = RegimeDetector::new();
        let history = PriceHistory::new();
        let (regime, multiplier) = detect_regime(&detector, &[], &history);
        assert_eq!(regime, MarketRegime::Normal);
        assert_eq!(multiplier, 1.0);
    }

    #[test]
    fn test_average_risk_excludes_unavailable() {
        assert_eq!(average_risk(&[]), 0.0);

        let now = Utc::now();
        let snapshots = vec![
            AssetSnapshot::Available(crate::types::RiskState {
                asset: Asset::Usdc,
                price: 1.0,
                confidence: 0.0001,
                risk_score: 30,
                factors: crate::types::RiskFactorScores::default(),
                computed_at: now,
            }),
            AssetSnapshot::Unavailable {
                asset: Asset::Usdt,
                as_of: now,
            },
        ];
        assert_eq!(average_risk(&snapshots), 30.0);
    }

    #[test]
    fn test_evaluate_actions_records_into_log() {
        let engine = RiskEngine::new();
        let detector = RegimeDetector::new();
        let evaluator = ActionEvaluator::new();
        let mut history = PriceHistory::new();
        let mut log = ActionLog::new();
        let now = Utc::now();

        // Everything at peg: nothing to do.
        let calm = vec![
            obs(Asset::Usdc, 1.0),
            obs(Asset::Usdt, 1.0),
            obs(Asset::Pyusd, 1.0),
        ];
        history.ingest(&calm);
        let snapshots = score_tick(&engine, &calm, &history, &HashMap::new(), now);
        let (regime, _) = detect_regime(&detector, &snapshots, &history);
        let actions = evaluate_actions(&evaluator, &snapshots, regime, &mut log, now);
        assert!(actions.is_empty());
        assert!(log.is_empty());

        // USDT slips 1.5% (deviation 75 * 0.4 = 30): alert tier, and it
        // lands in the log.
        let slipping = vec![
            obs(Asset::Usdc, 1.0),
            obs(Asset::Usdt, 0.985),
            obs(Asset::Pyusd, 1.0),
        ];
        history.ingest(&slipping);
        let snapshots = score_tick(&engine, &slipping, &history, &HashMap::new(), now);
        let (regime, _) = detect_regime(&detector, &snapshots, &history);
        let actions = evaluate_actions(&evaluator, &snapshots, regime, &mut log, now);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, ActionKind::Alert);
        assert_eq!(log.len(), 1);

        // Same conditions 10 seconds later: the recorded alert
        // suppresses the repeat.
        let later = now + Duration::seconds(10);
        history.ingest(&slipping);
        let snapshots = score_tick(&engine, &slipping, &history, &HashMap::new(), later);
        let (regime, _) = detect_regime(&detector, &snapshots, &history);
        let actions = evaluate_actions(&evaluator, &snapshots, regime, &mut log, later);
        assert!(actions.is_empty());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_full_pipeline_depeg_escalates() {
        let engine = RiskEngine::new();
        let detector = RegimeDetector::new();
        let evaluator = ActionEvaluator::new();
        let mut history = PriceHistory::new();
        let mut log = ActionLog::new();
        let now = Utc::now();

        // A severe USDT depeg with a wide confidence interval:
        // deviation 100 * 0.4 + liquidity 100 * 0.3 = 70. The single
        // asset over the critical cut pushes the regime to crisis, which
        // lowers the emergency tier to 46 — an emergency exit fires.
        let depeg = vec![
            obs(Asset::Usdc, 1.0),
            obs(Asset::Pyusd, 1.0001),
            Observation {
                asset: Asset::Usdt,
                price: 0.93,
                confidence: 0.02,
                observed_at: now,
            },
        ];
        history.ingest(&depeg);
        let snapshots = score_tick(&engine, &depeg, &history, &HashMap::new(), now);
        let (regime, multiplier) = detect_regime(&detector, &snapshots, &history);
        assert_eq!(regime, MarketRegime::Crisis);
        assert_eq!(multiplier, 0.6);
        assert!(average_risk(&snapshots) > 20.0);

        let actions = evaluate_actions(&evaluator, &snapshots, regime, &mut log, now);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, ActionKind::EmergencyExit);
        assert_eq!(actions[0].from_asset, Asset::Usdt);
        assert_eq!(actions[0].to_asset, Some(Asset::Usdc));
        assert!(actions[0].reasoning.is_some());
    }
}
