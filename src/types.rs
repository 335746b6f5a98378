//! Shared types for the StableGuard agent.
//!
//! These types form the data model used across all modules: the tracked
//! assets, per-tick observations and risk states, the market regime, and
//! the action/reasoning records emitted by the evaluator. They are
//! designed to be stable so that feed, risk, and dashboard modules can
//! depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// A tracked peg-stable asset (nominal fair price: $1.00).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    Usdc,
    Usdt,
    Pyusd,
}

impl Asset {
    /// All tracked assets, in tracked order. This order is also the
    /// tie-break order for destination selection.
    pub const ALL: &'static [Asset] = &[Asset::Usdc, Asset::Usdt, Asset::Pyusd];

    /// Human-readable issuer name.
    pub fn full_name(&self) -> &'static str {
        match self {
            Asset::Usdc => "USD Coin",
            Asset::Usdt => "Tether USD",
            Asset::Pyusd => "PayPal USD",
        }
    }

    /// Ticker symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::Usdc => "USDC",
            Asset::Usdt => "USDT",
            Asset::Pyusd => "PYUSD",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl std::str::FromStr for Asset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USDC" => Ok(Asset::Usdc),
            "USDT" => Ok(Asset::Usdt),
            "PYUSD" => Ok(Asset::Pyusd),
            _ => Err(anyhow::anyhow!("Unknown asset: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Observations
// ---------------------------------------------------------------------------

/// A single price observation from the oracle feed.
///
/// `confidence` is an absolute interval width in the same unit as the
/// price (dollars), not a percentage. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub asset: Asset,
    pub price: f64,
    pub confidence: f64,
    pub observed_at: DateTime<Utc>,
}

impl Observation {
    /// Absolute deviation from the $1.00 peg.
    pub fn peg_deviation(&self) -> f64 {
        (self.price - 1.0).abs()
    }

    /// Signed deviation from the peg (negative = below peg).
    pub fn signed_deviation(&self) -> f64 {
        self.price - 1.0
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ${:.4} ±${:.5} @ {}",
            self.asset,
            self.price,
            self.confidence,
            self.observed_at.to_rfc3339(),
        )
    }
}

// ---------------------------------------------------------------------------
// Risk states
// ---------------------------------------------------------------------------

/// The four sub-scores feeding the combined risk score, each 0–100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactorScores {
    pub price_deviation: u8,
    pub liquidity: u8,
    pub volume_anomaly: u8,
    pub whale_flow: u8,
}

/// Scored state of one asset for one tick. Recomputed every tick,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskState {
    pub asset: Asset,
    pub price: f64,
    pub confidence: f64,
    /// Combined weighted score, 0–100.
    pub risk_score: u8,
    pub factors: RiskFactorScores,
    pub computed_at: DateTime<Utc>,
}

impl fmt::Display for RiskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ${:.4} risk={}/100 (dev={} liq={} vol={} whale={})",
            self.asset,
            self.price,
            self.risk_score,
            self.factors.price_deviation,
            self.factors.liquidity,
            self.factors.volume_anomaly,
            self.factors.whale_flow,
        )
    }
}

/// Per-tick scoring result for one tracked asset.
///
/// Assets whose feed produced no observation this tick are `Unavailable`;
/// the tag guarantees they can never leak into score arithmetic the way a
/// numeric sentinel could.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssetSnapshot {
    Available(RiskState),
    Unavailable { asset: Asset, as_of: DateTime<Utc> },
}

impl AssetSnapshot {
    pub fn asset(&self) -> Asset {
        match self {
            AssetSnapshot::Available(state) => state.asset,
            AssetSnapshot::Unavailable { asset, .. } => *asset,
        }
    }

    /// The scored state, if the feed delivered this tick.
    pub fn state(&self) -> Option<&RiskState> {
        match self {
            AssetSnapshot::Available(state) => Some(state),
            AssetSnapshot::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, AssetSnapshot::Available(_))
    }
}

impl fmt::Display for AssetSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetSnapshot::Available(state) => write!(f, "{state}"),
            AssetSnapshot::Unavailable { asset, .. } => {
                write!(f, "{asset} (feed unavailable)")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Market regime
// ---------------------------------------------------------------------------

/// Global classification of current market stress, spanning all assets.
/// Recomputed every tick; no history kept beyond the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketRegime {
    Normal,
    Stressed,
    Crisis,
}

impl MarketRegime {
    /// Multiplier applied to the action thresholds. Lower multiplier
    /// means smaller thresholds, i.e. a more sensitive agent.
    pub fn threshold_multiplier(&self) -> f64 {
        match self {
            MarketRegime::Crisis => 0.6,
            MarketRegime::Stressed => 0.8,
            MarketRegime::Normal => 1.0,
        }
    }
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketRegime::Normal => write!(f, "normal"),
            MarketRegime::Stressed => write!(f, "stressed"),
            MarketRegime::Crisis => write!(f, "crisis"),
        }
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Graduated response tier, strictly ordered by severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Monitor,
    Alert,
    Rebalance,
    EmergencyExit,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Monitor => write!(f, "MONITOR"),
            ActionKind::Alert => write!(f, "ALERT"),
            ActionKind::Rebalance => write!(f, "REBALANCE"),
            ActionKind::EmergencyExit => write!(f, "EMERGENCY_EXIT"),
        }
    }
}

/// One emitted agent action. Appended to an append-only log owned by the
/// host; the core never deletes entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub issued_at: DateTime<Utc>,
    pub kind: ActionKind,
    pub from_asset: Asset,
    /// Destination for REBALANCE / EMERGENCY_EXIT.
    pub to_asset: Option<Asset>,
    pub risk_score: u8,
    pub details: String,
    /// Audit rationale, attached to every emitted ALERT/REBALANCE/
    /// EMERGENCY_EXIT.
    pub reasoning: Option<Reasoning>,
}

impl fmt::Display for ActionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_asset {
            Some(to) => write!(
                f,
                "[{}] {} → {} | risk: {} | {}",
                self.kind, self.from_asset, to, self.risk_score, self.details,
            ),
            None => write!(
                f,
                "[{}] {} | risk: {} | {}",
                self.kind, self.from_asset, self.risk_score, self.details,
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Reasoning
// ---------------------------------------------------------------------------

/// One line of the factor breakdown inside a `Reasoning`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: String,
    pub score: u8,
    pub weight: f64,
    pub detail: String,
}

/// Structured, human-auditable rationale for a chosen action. Pure
/// derived data — discarded if not consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reasoning {
    pub summary: String,
    pub factors: Vec<RiskFactor>,
    pub regime: MarketRegime,
    pub decision: ActionKind,
    /// Every other tracked asset with its current score (or an
    /// unavailable marker).
    pub alternatives: Vec<String>,
    /// Current score and the next escalation threshold.
    pub threshold_context: String,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for StableGuard collaborator clients.
/// The core decision path has no fallible operations by construction.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Price feed error ({feed}): {message}")]
    Feed { feed: String, message: String },

    #[error("DEX quote error: {0}")]
    Dex(String),

    #[error("Yield provider error ({provider}): {message}")]
    Yield { provider: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
