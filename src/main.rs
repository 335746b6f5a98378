//! STABLEGUARD — Autonomous Stablecoin Risk Intelligence Agent
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the feed/DEX/yield clients to the risk pipeline, and runs the
//! fetch→score→classify→act loop with graceful shutdown.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use stableguard::actions::ActionLog;
use stableguard::config;
use stableguard::dashboard::{self, DashboardState};
use stableguard::dex::JupiterClient;
use stableguard::feeds::{PriceFeed, PythFeed};
use stableguard::history::PriceHistory;
use stableguard::risk::{
    self, ActionEvaluator, RegimeDetector, RiskEngine, BASE_THRESHOLDS,
};
use stableguard::types::{ActionKind, Asset, AssetSnapshot, Observation};
use stableguard::yields::{self, YieldTracker};

const BANNER: &str = r#"
 ____  _____  _    ____  _     _____ ____ _   _   _    ____  ____
/ ___||_   _|/ \  | __ )| |   | ____/ ___| | | | / \  |  _ \|  _ \
\___ \  | | / _ \ |  _ \| |   |  _|| |  _| | | |/ _ \ | |_) | | | |
 ___) | | |/ ___ \| |_) | |___| |__| |_| | |_| / ___ \|  _ <| |_| |
|____/  |_/_/   \_\____/|_____|_____\____|\___/_/   \_\_| \_\____/

  Autonomous Stablecoin Risk Intelligence Agent
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = config::AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        agent_name = %cfg.agent.name,
        tick_interval_secs = cfg.agent.tick_interval_secs,
        fast_tick_interval_secs = cfg.agent.fast_tick_interval_secs,
        alert_threshold = BASE_THRESHOLDS.alert,
        rebalance_threshold = BASE_THRESHOLDS.rebalance,
        emergency_threshold = BASE_THRESHOLDS.emergency,
        "STABLEGUARD starting up"
    );

    // -- Initialise components -------------------------------------------

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let feed = PythFeed::new(http.clone(), cfg.feeds.hermes_url.clone());
    let jupiter = JupiterClient::new(http.clone(), cfg.dex.jupiter_url.clone());
    let yield_tracker = YieldTracker::new(http);

    let engine = RiskEngine::new();
    let detector = RegimeDetector::new();
    let evaluator = ActionEvaluator::new();

    let mut history = PriceHistory::new();
    let mut action_log = ActionLog::new();
    let mut liquidity: HashMap<Asset, u8> = HashMap::new();

    // Dashboard
    let dashboard_state = Arc::new(DashboardState::new());
    if cfg.dashboard.enabled {
        dashboard::spawn_dashboard(Arc::clone(&dashboard_state), cfg.dashboard.port)?;
    }

    // Initial yields so the dashboard has data before the slow cadence
    // kicks in.
    *dashboard_state.yields.write().await = yield_tracker.fetch_yields().await;

    // -- Main loop -------------------------------------------------------

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut tick_count: u64 = 0;
    info!(
        interval_secs = cfg.agent.tick_interval_secs,
        "Entering monitoring loop. Press Ctrl+C to stop."
    );

    loop {
        tick_count += 1;

        let max_risk = run_tick(
            tick_count,
            &cfg,
            &feed,
            &jupiter,
            &yield_tracker,
            &engine,
            &detector,
            &evaluator,
            &mut history,
            &mut action_log,
            &mut liquidity,
            &dashboard_state,
        )
        .await;

        // Dynamic cadence: tighten while anything sits at the alert tier.
        let interval_secs = if max_risk >= BASE_THRESHOLDS.alert {
            cfg.agent.fast_tick_interval_secs
        } else {
            cfg.agent.tick_interval_secs
        };

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(interval_secs)) => {}
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!(
        ticks = tick_count,
        actions = action_log.len(),
        "STABLEGUARD shut down cleanly."
    );

    Ok(())
}

/// Run a single fetch→score→classify→act tick. Returns the highest risk
/// score seen, for cadence selection. Never fails — a bad tick logs and
/// leaves state untouched.
#[allow(clippy::too_many_arguments)]
async fn run_tick(
    tick_count: u64,
    cfg: &config::AppConfig,
    feed: &PythFeed,
    jupiter: &JupiterClient,
    yield_tracker: &YieldTracker,
    engine: &RiskEngine,
    detector: &RegimeDetector,
    evaluator: &ActionEvaluator,
    history: &mut PriceHistory,
    action_log: &mut ActionLog,
    liquidity: &mut HashMap<Asset, u8>,
    dashboard_state: &DashboardState,
) -> u8 {
    let now = chrono::Utc::now();

    // 1. Fetch latest prices.
    let observations = match feed.fetch_prices().await {
        Ok(obs) => obs,
        Err(e) => {
            error!(error = %e, "Price fetch failed, skipping tick");
            return 0;
        }
    };
    if observations.is_empty() {
        warn!("No prices received, skipping tick");
        return 0;
    }

    // 2. Ingest this tick's batch into the history.
    history.ingest(&observations);

    // 3. Refresh the DEX liquidity cache on its slow cadence.
    if cfg.agent.liquidity_probe_due(tick_count) {
        refresh_liquidity(jupiter, &observations, liquidity).await;
    }

    // 4. Score every tracked asset.
    let snapshots = risk::score_tick(engine, &observations, history, liquidity, now);
    let max_risk = snapshots
        .iter()
        .filter_map(|s| s.state())
        .map(|s| s.risk_score)
        .max()
        .unwrap_or(0);

    // 5. Classify the regime.
    let (regime, _multiplier) = risk::detect_regime(detector, &snapshots, history);
    let avg_risk = risk::average_risk(&snapshots);

    log_status(tick_count, &snapshots, avg_risk);

    // 6. Evaluate actions, then attach simulated swap outcomes to the
    // swap-tier ones.
    let mut actions = risk::evaluate_actions(evaluator, &snapshots, regime, action_log, now);
    for action in &mut actions {
        if let (ActionKind::Rebalance | ActionKind::EmergencyExit, Some(to)) =
            (action.kind, action.to_asset)
        {
            action.details = jupiter
                .simulate_protective_swap(action.from_asset, to, action.risk_score, action.kind)
                .await;
        }
    }

    // 7. Publish the tick to the dashboard.
    dashboard_state
        .record_tick(snapshots, regime, avg_risk, &actions)
        .await;

    // 8. Refresh yields on the slowest cadence.
    if cfg.agent.yield_refresh_due(tick_count) {
        let yields = yield_tracker.fetch_yields().await;
        info!(count = yields.len(), "Yields updated");
        for asset in Asset::ALL {
            if let Some(best) = yields::best_yield(&yields, *asset) {
                debug!(
                    asset = %asset,
                    protocol = %best.protocol,
                    supply_apy = format!("{:.2}%", best.supply_apy),
                    "Best supply yield"
                );
            }
        }
        *dashboard_state.yields.write().await = yields;
    }

    max_risk
}

/// Probe DEX liquidity for every fetched asset. Failed probes keep the
/// previous cached score.
async fn refresh_liquidity(
    jupiter: &JupiterClient,
    observations: &[Observation],
    liquidity: &mut HashMap<Asset, u8>,
) {
    for obs in observations {
        // Quote against USDC, or USDT when probing USDC itself.
        let target = if obs.asset == Asset::Usdc {
            Asset::Usdt
        } else {
            Asset::Usdc
        };
        if let Some(score) = jupiter.check_liquidity(obs.asset, target).await {
            liquidity.insert(obs.asset, score);
        }
    }

    let cached: Vec<String> = liquidity
        .iter()
        .map(|(asset, score)| format!("{asset}:{score}"))
        .collect();
    info!(scores = cached.join(", "), "Liquidity cache refreshed");
}

/// Log a one-line per-tick status summary.
fn log_status(tick_count: u64, snapshots: &[AssetSnapshot], avg_risk: f64) {
    let parts: Vec<String> = snapshots
        .iter()
        .map(|snap| match snap.state() {
            Some(s) => format!("{}: ${:.4} (risk: {})", s.asset, s.price, s.risk_score),
            None => format!("{}: unavailable", snap.asset()),
        })
        .collect();

    info!(
        tick = tick_count,
        avg_risk = format!("{avg_risk:.1}"),
        status = parts.join(" | "),
        "Tick complete"
    );
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stableguard=info"));

    let json_logging = std::env::var("STABLEGUARD_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
