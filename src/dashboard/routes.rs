//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`
//! and written by the monitor loop after every tick.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::{ActionRecord, AssetSnapshot, MarketRegime};
use crate::yields::YieldData;

/// How many recent actions the API returns.
const ACTION_PAGE: usize = 100;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub snapshots: RwLock<Vec<AssetSnapshot>>,
    pub regime: RwLock<MarketRegime>,
    pub avg_risk: RwLock<f64>,
    pub actions: RwLock<Vec<ActionRecord>>,
    pub yields: RwLock<Vec<YieldData>>,
    pub tick_count: RwLock<u64>,
    pub start_time: DateTime<Utc>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self {
            snapshots: RwLock::new(Vec::new()),
            regime: RwLock::new(MarketRegime::Normal),
            avg_risk: RwLock::new(0.0),
            actions: RwLock::new(Vec::new()),
            yields: RwLock::new(Vec::new()),
            tick_count: RwLock::new(0),
            start_time: Utc::now(),
        }
    }

    /// Publish one completed tick.
    pub async fn record_tick(
        &self,
        snapshots: Vec<AssetSnapshot>,
        regime: MarketRegime,
        avg_risk: f64,
        new_actions: &[ActionRecord],
    ) {
        *self.snapshots.write().await = snapshots;
        *self.regime.write().await = regime;
        *self.avg_risk.write().await = avg_risk;
        if !new_actions.is_empty() {
            self.actions.write().await.extend_from_slice(new_actions);
        }
        *self.tick_count.write().await += 1;
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StateResponse {
    pub regime: MarketRegime,
    pub avg_risk: f64,
    pub assets: Vec<AssetSnapshot>,
    pub tick_count: u64,
    pub uptime_secs: i64,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

pub type AppState = Arc<DashboardState>;

/// GET /api/state
pub async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    let assets = state.snapshots.read().await.clone();
    let regime = *state.regime.read().await;
    let avg_risk = *state.avg_risk.read().await;
    let tick_count = *state.tick_count.read().await;
    let uptime = (Utc::now() - state.start_time).num_seconds();

    Json(StateResponse {
        regime,
        avg_risk,
        assets,
        tick_count,
        uptime_secs: uptime,
    })
}

/// GET /api/actions
pub async fn get_actions(State(state): State<AppState>) -> Json<Vec<ActionRecord>> {
    let actions = state.actions.read().await;
    let start = actions.len().saturating_sub(ACTION_PAGE);
    Json(actions[start..].to_vec())
}

/// GET /api/yields
pub async fn get_yields(State(state): State<AppState>) -> Json<Vec<YieldData>> {
    let yields = state.yields.read().await;
    Json(yields.clone())
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
