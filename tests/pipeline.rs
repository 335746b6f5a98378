//! End-to-end pipeline scenarios.
//!
//! Drives the full score→classify→act pipeline with scripted price
//! feeds — no network, no real clocks. Each scenario replays a market
//! episode tick by tick and checks the actions that come out.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use stableguard::actions::ActionLog;
use stableguard::feeds::PriceFeed;
use stableguard::history::{PriceHistory, MAX_HISTORY};
use stableguard::risk::{self, ActionEvaluator, RegimeDetector, RiskEngine};
use stableguard::types::{ActionKind, ActionRecord, Asset, MarketRegime, Observation};

// ---------------------------------------------------------------------------
// Scripted feed
// ---------------------------------------------------------------------------

/// A deterministic price feed replaying pre-scripted ticks.
struct ScriptedFeed {
    ticks: Mutex<Vec<Vec<Observation>>>,
}

impl ScriptedFeed {
    fn new(mut ticks: Vec<Vec<Observation>>) -> Self {
        ticks.reverse(); // pop from the back in script order
        Self {
            ticks: Mutex::new(ticks),
        }
    }
}

#[async_trait]
impl PriceFeed for ScriptedFeed {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_prices(&self) -> Result<Vec<Observation>> {
        Ok(self.ticks.lock().unwrap().pop().unwrap_or_default())
    }
}

fn obs(asset: Asset, price: f64, confidence: f64, at: DateTime<Utc>) -> Observation {
    Observation {
        asset,
        price,
        confidence,
        observed_at: at,
    }
}

fn calm_tick(at: DateTime<Utc>) -> Vec<Observation> {
    vec![
        obs(Asset::Usdc, 1.0001, 0.00005, at),
        obs(Asset::Usdt, 0.9999, 0.00005, at),
        obs(Asset::Pyusd, 1.0002, 0.00005, at),
    ]
}

/// Everything needed to run ticks through the pipeline.
struct Harness {
    engine: RiskEngine,
    detector: RegimeDetector,
    evaluator: ActionEvaluator,
    history: PriceHistory,
    log: ActionLog,
    liquidity: HashMap<Asset, u8>,
}

impl Harness {
    fn new() -> Self {
        Self {
            engine: RiskEngine::new(),
            detector: RegimeDetector::new(),
            evaluator: ActionEvaluator::new(),
            history: PriceHistory::new(),
            log: ActionLog::new(),
            liquidity: HashMap::new(),
        }
    }

    fn tick(
        &mut self,
        observations: &[Observation],
        now: DateTime<Utc>,
    ) -> (MarketRegime, Vec<ActionRecord>) {
        self.history.ingest(observations);
        let snapshots = risk::score_tick(
            &self.engine,
            observations,
            &self.history,
            &self.liquidity,
            now,
        );
        let (regime, _) = risk::detect_regime(&self.detector, &snapshots, &self.history);
        let actions =
            risk::evaluate_actions(&self.evaluator, &snapshots, regime, &mut self.log, now);
        (regime, actions)
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_scripted_feed_replays_in_order() {
    let t0 = Utc::now();
    let feed = ScriptedFeed::new(vec![
        calm_tick(t0),
        vec![obs(Asset::Usdc, 0.99, 0.0001, t0)],
        Vec::new(),
    ]);

    let first = feed.fetch_prices().await.unwrap();
    assert_eq!(first.len(), 3);
    let second = feed.fetch_prices().await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].asset, Asset::Usdc);
    let third = feed.fetch_prices().await.unwrap();
    assert!(third.is_empty());
}

#[test]
fn test_calm_market_stays_silent() {
    let mut h = Harness::new();
    let mut now = Utc::now();

    for _ in 0..30 {
        let (regime, actions) = h.tick(&calm_tick(now), now);
        assert_eq!(regime, MarketRegime::Normal);
        assert!(actions.is_empty());
        now += Duration::seconds(10);
    }
    assert!(h.log.is_empty());
}

#[test]
fn test_alert_fires_once_then_after_window() {
    let mut h = Harness::new();
    let t0 = Utc::now();

    // USDT at 1.5% off peg with a tight interval: deviation 75 * 0.4 = 30,
    // alert tier under a normal regime.
    let slipping = |at| {
        vec![
            obs(Asset::Usdc, 1.0001, 0.00005, at),
            obs(Asset::Usdt, 0.985, 0.00005, at),
            obs(Asset::Pyusd, 1.0002, 0.00005, at),
        ]
    };

    let (_, actions) = h.tick(&slipping(t0), t0);
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, ActionKind::Alert);
    assert_eq!(actions[0].from_asset, Asset::Usdt);

    // Still elevated 30 seconds in: suppressed.
    let t1 = t0 + Duration::seconds(30);
    let (_, actions) = h.tick(&slipping(t1), t1);
    assert!(actions.is_empty());

    // 61 seconds after the first alert the window has lapsed.
    let t2 = t0 + Duration::seconds(61);
    let (_, actions) = h.tick(&slipping(t2), t2);
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, ActionKind::Alert);
    assert_eq!(h.log.len(), 2);
}

#[test]
fn test_severe_depeg_triggers_emergency_exit() {
    let mut h = Harness::new();
    let t0 = Utc::now();

    // Warm up with calm data.
    let mut now = t0;
    for _ in 0..5 {
        h.tick(&calm_tick(now), now);
        now += Duration::seconds(10);
    }

    // USDT collapses to $0.93 with a blown-out confidence interval:
    // deviation 100 * 0.4 + liquidity 100 * 0.3 = 70. The critical asset
    // flips the regime to crisis, dropping the emergency tier to 46.
    let crash = vec![
        obs(Asset::Usdc, 1.0001, 0.00005, now),
        obs(Asset::Usdt, 0.93, 0.02, now),
        obs(Asset::Pyusd, 1.0002, 0.00005, now),
    ];
    let (regime, actions) = h.tick(&crash, now);
    assert_eq!(regime, MarketRegime::Crisis);
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, ActionKind::EmergencyExit);
    assert_eq!(actions[0].from_asset, Asset::Usdt);
    // Destination is the lowest-risk surviving asset.
    assert_eq!(actions[0].to_asset, Some(Asset::Usdc));

    let reasoning = actions[0].reasoning.as_ref().unwrap();
    assert_eq!(reasoning.regime, MarketRegime::Crisis);
    assert!(reasoning.summary.starts_with("CRITICAL:"));
}

#[test]
fn test_contagion_lowers_action_thresholds() {
    let mut h = Harness::new();
    let now = Utc::now();

    // All three assets 0.4% below peg with moderately wide intervals:
    // deviation 30 * 0.4 + liquidity 30 * 0.3 = 21 each. Same-direction
    // contagion pushes the regime to stressed, which drops the alert
    // tier to 21 — scores that would be silent under normal now alert.
    let sliding = vec![
        obs(Asset::Usdc, 0.996, 0.0008, now),
        obs(Asset::Usdt, 0.996, 0.0008, now),
        obs(Asset::Pyusd, 0.996, 0.0008, now),
    ];
    let (regime, actions) = h.tick(&sliding, now);
    assert_eq!(regime, MarketRegime::Stressed);
    assert_eq!(actions.len(), 3);
    assert!(actions.iter().all(|a| a.kind == ActionKind::Alert));
}

#[test]
fn test_missing_feed_is_skipped_not_scored() {
    let mut h = Harness::new();
    let now = Utc::now();

    // Only USDC reports; it is calm. The other two must not produce
    // actions, and the regime must not be polluted by their absence.
    let partial = vec![obs(Asset::Usdc, 1.0, 0.00005, now)];
    let (regime, actions) = h.tick(&partial, now);
    assert_eq!(regime, MarketRegime::Normal);
    assert!(actions.is_empty());
}

#[test]
fn test_dex_liquidity_score_overrides_confidence_proxy() {
    let mut h = Harness::new();
    let now = Utc::now();

    // Thin DEX liquidity (score 75) on an otherwise calm asset:
    // 75 * 0.3 = 22.5, rounds to 23 — below alert, but well above the
    // confidence-proxy score of 0.
    h.liquidity.insert(Asset::Usdc, 75);
    let calm = calm_tick(now);
    h.history.ingest(&calm);
    let snapshots = risk::score_tick(&h.engine, &calm, &h.history, &h.liquidity, now);
    let usdc = snapshots[0].state().unwrap();
    assert_eq!(usdc.factors.liquidity, 75);
    assert_eq!(usdc.risk_score, 23);

    // The other assets keep the proxy.
    let usdt = snapshots[1].state().unwrap();
    assert_eq!(usdt.factors.liquidity, 0);
}

#[test]
fn test_same_tick_replay_is_idempotent_apart_from_dedup() {
    let mut h1 = Harness::new();
    let mut h2 = Harness::new();
    let now = Utc::now();

    let ticks: Vec<Vec<Observation>> = (0..12)
        .map(|i| {
            let at = now + Duration::seconds(10 * i);
            vec![
                obs(Asset::Usdc, 1.0001, 0.00005, at),
                obs(Asset::Usdt, 0.992, 0.0003, at),
                obs(Asset::Pyusd, 1.0002, 0.00005, at),
            ]
        })
        .collect();

    let run = |h: &mut Harness| -> Vec<(MarketRegime, Vec<ActionKind>)> {
        ticks
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let at = now + Duration::seconds(10 * i as i64);
                let (regime, actions) = h.tick(t, at);
                (regime, actions.iter().map(|a| a.kind).collect())
            })
            .collect()
    };

    assert_eq!(run(&mut h1), run(&mut h2));
}

#[test]
fn test_history_stays_bounded_over_long_run() {
    let mut h = Harness::new();
    let mut now = Utc::now();

    for _ in 0..(MAX_HISTORY + 50) {
        h.tick(&calm_tick(now), now);
        now += Duration::seconds(10);
    }

    for asset in Asset::ALL {
        assert_eq!(h.history.prices(*asset).len(), MAX_HISTORY);
    }
}

#[test]
fn test_recovery_returns_to_normal() {
    let mut h = Harness::new();
    let mut now = Utc::now();

    // Depeg episode.
    let crash = vec![
        obs(Asset::Usdc, 1.0001, 0.00005, now),
        obs(Asset::Usdt, 0.97, 0.005, now),
        obs(Asset::Pyusd, 1.0002, 0.00005, now),
    ];
    let (regime, _) = h.tick(&crash, now);
    assert_ne!(regime, MarketRegime::Normal);

    // Peg restored; scores and regime settle back down.
    now += Duration::seconds(10);
    let mut last = MarketRegime::Crisis;
    for _ in 0..15 {
        let (regime, actions) = h.tick(&calm_tick(now), now);
        last = regime;
        assert!(actions.is_empty());
        now += Duration::seconds(10);
    }
    assert_eq!(last, MarketRegime::Normal);
}
