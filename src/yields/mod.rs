//! Stablecoin yield tracking.
//!
//! Polls Kamino and MarginFi lending markets for supply/borrow APYs on
//! the tracked stablecoins, refreshed on a slow cadence by the host
//! loop. Purely informational — yields never influence risk scores or
//! action decisions. Both providers degrade to static fallback tables
//! when their APIs are unreachable, so the dashboard always has
//! something to show.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::Asset;

const KAMINO_URL: &str = "https://api.kamino.finance/v2/metrics/market";
const MARGINFI_URL: &str = "https://api.marginfi.com/v1/markets";

#[derive(Debug, Clone, Serialize)]
pub struct YieldData {
    pub protocol: String,
    pub asset: Asset,
    pub supply_apy: f64,
    pub borrow_apy: f64,
    pub tvl: f64,
    pub last_updated: DateTime<Utc>,
}

pub struct YieldTracker {
    client: Client,
}

impl YieldTracker {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch the latest yields from every provider. Each provider is
    /// independent; a dead API yields its fallback table.
    pub async fn fetch_yields(&self) -> Vec<YieldData> {
        let (kamino, marginfi) =
            tokio::join!(self.fetch_kamino(), self.fetch_marginfi());

        let mut yields = kamino.unwrap_or_else(|e| {
            warn!(error = %e, "Kamino yields unavailable, using fallback");
            kamino_fallback()
        });
        yields.extend(marginfi.unwrap_or_else(|e| {
            warn!(error = %e, "MarginFi yields unavailable, using fallback");
            marginfi_fallback()
        }));
        yields
    }

    async fn fetch_kamino(&self) -> Result<Vec<YieldData>> {
        let body: Value = self
            .client
            .get(KAMINO_URL)
            .send()
            .await
            .context("Kamino request failed")?
            .error_for_status()
            .context("Kamino returned an error status")?
            .json()
            .await
            .context("Kamino response was not valid JSON")?;

        let markets = body
            .get("markets")
            .and_then(Value::as_array)
            .context("Kamino response missing markets array")?;

        let mut yields = Vec::new();
        for asset in Asset::ALL {
            let market = markets.iter().find(|m| {
                m.get("symbol")
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.eq_ignore_ascii_case(asset.symbol()))
            });
            if let Some(market) = market {
                yields.push(YieldData {
                    protocol: "Kamino".to_string(),
                    asset: *asset,
                    supply_apy: field_pct(market, "supplyApy"),
                    borrow_apy: field_pct(market, "borrowApy"),
                    tvl: field_f64(market, "totalDeposits"),
                    last_updated: Utc::now(),
                });
            }
        }

        if yields.is_empty() {
            anyhow::bail!("Kamino returned no tracked stablecoin markets");
        }
        debug!(count = yields.len(), "Fetched Kamino yields");
        Ok(yields)
    }

    async fn fetch_marginfi(&self) -> Result<Vec<YieldData>> {
        let body: Value = self
            .client
            .get(MARGINFI_URL)
            .send()
            .await
            .context("MarginFi request failed")?
            .error_for_status()
            .context("MarginFi returned an error status")?
            .json()
            .await
            .context("MarginFi response was not valid JSON")?;

        let markets = body.as_array().context("MarginFi response was not an array")?;

        let mut yields = Vec::new();
        for asset in Asset::ALL {
            let market = markets.iter().find(|m| {
                m.get("tokenSymbol")
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.eq_ignore_ascii_case(asset.symbol()))
            });
            if let Some(market) = market {
                yields.push(YieldData {
                    protocol: "MarginFi".to_string(),
                    asset: *asset,
                    supply_apy: field_pct(market, "lendingRate"),
                    borrow_apy: field_pct(market, "borrowRate"),
                    tvl: field_f64(market, "totalDeposits"),
                    last_updated: Utc::now(),
                });
            }
        }

        if yields.is_empty() {
            anyhow::bail!("MarginFi returned no tracked stablecoin markets");
        }
        debug!(count = yields.len(), "Fetched MarginFi yields");
        Ok(yields)
    }
}

/// Numeric field that may arrive as a JSON number or a string.
fn field_f64(market: &Value, key: &str) -> f64 {
    match market.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Rate field scaled from a fraction to a percentage.
fn field_pct(market: &Value, key: &str) -> f64 {
    field_f64(market, key) * 100.0
}

// ---------------------------------------------------------------------------
// Fallback tables (recent market snapshots)
// ---------------------------------------------------------------------------

fn kamino_fallback() -> Vec<YieldData> {
    let now = Utc::now();
    let entry = |asset, supply_apy, borrow_apy, tvl| YieldData {
        protocol: "Kamino".to_string(),
        asset,
        supply_apy,
        borrow_apy,
        tvl,
        last_updated: now,
    };
    vec![
        entry(Asset::Usdc, 5.2, 7.8, 1_200_000_000.0),
        entry(Asset::Usdt, 4.8, 7.2, 450_000_000.0),
        entry(Asset::Pyusd, 6.1, 8.5, 85_000_000.0),
    ]
}

fn marginfi_fallback() -> Vec<YieldData> {
    let now = Utc::now();
    let entry = |asset, supply_apy, borrow_apy, tvl| YieldData {
        protocol: "MarginFi".to_string(),
        asset,
        supply_apy,
        borrow_apy,
        tvl,
        last_updated: now,
    };
    vec![
        entry(Asset::Usdc, 4.5, 6.9, 800_000_000.0),
        entry(Asset::Usdt, 4.1, 6.3, 320_000_000.0),
        entry(Asset::Pyusd, 5.8, 8.1, 42_000_000.0),
    ]
}

/// Highest supply APY for an asset across a yield set.
pub fn best_yield(yields: &[YieldData], asset: Asset) -> Option<&YieldData> {
    yields
        .iter()
        .filter(|y| y.asset == asset)
        .max_by(|a, b| a.supply_apy.total_cmp(&b.supply_apy))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_covers_all_assets() {
        for fallback in [kamino_fallback(), marginfi_fallback()] {
            assert_eq!(fallback.len(), Asset::ALL.len());
            for asset in Asset::ALL {
                assert!(fallback.iter().any(|y| y.asset == *asset));
            }
        }
    }

    #[test]
    fn test_best_yield_picks_highest_supply_apy() {
        let mut yields = kamino_fallback();
        yields.extend(marginfi_fallback());

        let best = best_yield(&yields, Asset::Usdc).unwrap();
        assert_eq!(best.protocol, "Kamino");
        assert_eq!(best.supply_apy, 5.2);

        assert!(best_yield(&[], Asset::Usdc).is_none());
    }

    #[test]
    fn test_field_parsing_number_and_string() {
        let market = serde_json::json!({
            "supplyApy": "0.052",
            "borrowApy": 0.078,
            "totalDeposits": "1200000000"
        });
        assert!((field_pct(&market, "supplyApy") - 5.2).abs() < 1e-9);
        assert!((field_pct(&market, "borrowApy") - 7.8).abs() < 1e-9);
        assert_eq!(field_f64(&market, "totalDeposits"), 1_200_000_000.0);
        assert_eq!(field_f64(&market, "missing"), 0.0);
    }
}
