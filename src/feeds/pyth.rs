//! Pyth Hermes price feed.
//!
//! Pulls the latest oracle updates for each tracked stablecoin from the
//! Hermes REST API and scales them to decimal prices. Feeds are fetched
//! individually so a single bad feed degrades that asset to "no data"
//! instead of blanking the whole tick.
//!
//! API: `GET {base}/v2/updates/price/latest?ids[]=<feed-id>`
//! Auth: Not required.
//! Prices: fixed-point integers with a base-10 exponent (`expo`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::PriceFeed;
use crate::types::{Asset, Observation};

const FEED_NAME: &str = "pyth-hermes";

/// Pyth price feed account IDs (hex, no 0x prefix) for each tracked
/// asset's USD pair.
const fn feed_id(asset: Asset) -> &'static str {
    match asset {
        Asset::Usdc => "eaa020c61cc479712813461ce153894a96a6c00b21ed0cfc2798d1f9a9e9c94a",
        Asset::Usdt => "2b89b9dc8fdf9f34709a5b106b472f0f39bb6ca9ce04b0fd7f2e971688e2e53b",
        Asset::Pyusd => "c1da1b73d7f01e7ddd54b3766cf7f556cc0e6a82d05597ef68a22e604dea4f0e",
    }
}

// ---------------------------------------------------------------------------
// API response types (Hermes JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LatestPriceResponse {
    #[serde(default)]
    parsed: Vec<ParsedUpdate>,
}

#[derive(Debug, Deserialize)]
struct ParsedUpdate {
    price: PriceUpdate,
}

/// Fixed-point price: `price * 10^expo` is the decimal value.
#[derive(Debug, Deserialize)]
struct PriceUpdate {
    price: String,
    conf: String,
    expo: i32,
}

impl PriceUpdate {
    fn decimal_price(&self) -> Result<(f64, f64)> {
        let scale = 10f64.powi(self.expo);
        let price: f64 = self
            .price
            .parse()
            .with_context(|| format!("bad price mantissa: {}", self.price))?;
        let conf: f64 = self
            .conf
            .parse()
            .with_context(|| format!("bad confidence mantissa: {}", self.conf))?;
        Ok((price * scale, conf * scale))
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct PythFeed {
    client: Client,
    base_url: String,
}

impl PythFeed {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn fetch_one(&self, asset: Asset) -> Result<Observation> {
        let url = format!("{}/v2/updates/price/latest", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("ids[]", feed_id(asset))])
            .send()
            .await
            .with_context(|| format!("Hermes request failed for {asset}"))?
            .error_for_status()
            .with_context(|| format!("Hermes returned an error status for {asset}"))?;

        let body: LatestPriceResponse = response
            .json()
            .await
            .with_context(|| format!("Hermes response was not valid JSON for {asset}"))?;

        let update = body
            .parsed
            .first()
            .with_context(|| format!("Hermes returned no parsed update for {asset}"))?;
        let (price, confidence) = update.price.decimal_price()?;

        debug!(asset = %asset, price, confidence, "Fetched oracle price");

        Ok(Observation {
            asset,
            price,
            confidence,
            observed_at: Utc::now(),
        })
    }
}

#[async_trait]
impl PriceFeed for PythFeed {
    fn name(&self) -> &str {
        FEED_NAME
    }

    /// Fetch every tracked asset concurrently. Failures are logged and
    /// dropped; the survivors make up this tick's observations.
    async fn fetch_prices(&self) -> Result<Vec<Observation>> {
        let fetches = Asset::ALL.iter().map(|asset| self.fetch_one(*asset));
        let results = join_all(fetches).await;

        let mut observations = Vec::with_capacity(Asset::ALL.len());
        for (asset, result) in Asset::ALL.iter().zip(results) {
            match result {
                Ok(obs) => observations.push(obs),
                Err(e) => warn!(asset = %asset, error = %e, "Price fetch failed"),
            }
        }

        if observations.is_empty() {
            warn!("No prices received from any feed");
        } else if observations.len() < Asset::ALL.len() {
            let fetched: Vec<String> =
                observations.iter().map(|o| o.asset.to_string()).collect();
            warn!(
                got = fetched.join(", "),
                count = observations.len(),
                total = Asset::ALL.len(),
                "Partial price data"
            );
        }

        Ok(observations)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
