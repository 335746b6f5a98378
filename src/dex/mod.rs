//! Jupiter DEX integration.
//!
//! Two jobs: probe on-chain liquidity with a $100K quote (feeding the
//! risk engine's liquidity factor), and simulate protective $10K swaps
//! for rebalance and emergency-exit actions. Swaps are quote-only — no
//! transaction is ever signed or submitted.
//!
//! API: `GET {base}/quote?inputMint=..&outputMint=..&amount=..`
//! Auth: Not required.
//! Amounts: 6-decimal token lamports (1 USDC = 1_000_000).

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::types::{ActionKind, Asset};

/// Lamports per whole token for the 6-decimal stablecoin mints.
const LAMPORTS_PER_TOKEN: u64 = 1_000_000;

/// Notional for the liquidity probe: $100K.
pub const LIQUIDITY_PROBE_USD: u64 = 100_000;

/// Notional for a simulated protective swap: $10K.
pub const PROTECTIVE_SWAP_USD: u64 = 10_000;

/// SPL mint addresses for each tracked asset.
const fn mint_address(asset: Asset) -> &'static str {
    match asset {
        Asset::Usdc => "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
        Asset::Usdt => "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
        Asset::Pyusd => "2b1kV6DkPAnxd5ixfnxCpjxmKwqjjaYmCZfHsFu24GXo",
    }
}

// ---------------------------------------------------------------------------
// API response types (Jupiter JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub in_amount: String,
    pub out_amount: String,
    pub price_impact_pct: String,
}

impl SwapQuote {
    /// Absolute price impact as a percentage.
    pub fn slippage_pct(&self) -> f64 {
        self.price_impact_pct.parse::<f64>().unwrap_or(0.0).abs()
    }

    /// Output amount in whole tokens.
    pub fn out_tokens(&self) -> f64 {
        self.out_amount.parse::<f64>().unwrap_or(0.0) / LAMPORTS_PER_TOKEN as f64
    }
}

/// Map a probe slippage percentage onto the 0–100 liquidity risk scale.
pub fn slippage_to_score(slippage_pct: f64) -> u8 {
    if slippage_pct < 0.1 {
        0
    } else if slippage_pct < 0.3 {
        15
    } else if slippage_pct < 0.5 {
        30
    } else if slippage_pct < 1.0 {
        50
    } else if slippage_pct < 2.0 {
        75
    } else {
        100
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct JupiterClient {
    client: Client,
    base_url: String,
}

impl JupiterClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Raw swap quote for `amount_lamports` of `from` into `to`.
    pub async fn quote(
        &self,
        from: Asset,
        to: Asset,
        amount_lamports: u64,
    ) -> Result<SwapQuote> {
        let url = format!("{}/quote", self.base_url);
        let amount = amount_lamports.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("inputMint", mint_address(from)),
                ("outputMint", mint_address(to)),
                ("amount", amount.as_str()),
                ("slippageBps", "50"),
            ])
            .send()
            .await
            .with_context(|| format!("Jupiter quote request failed for {from}→{to}"))?
            .error_for_status()
            .with_context(|| format!("Jupiter returned an error status for {from}→{to}"))?;

        let quote: SwapQuote = response
            .json()
            .await
            .with_context(|| format!("Jupiter quote was not valid JSON for {from}→{to}"))?;

        debug!(
            from = %from,
            to = %to,
            amount_lamports,
            slippage = quote.slippage_pct(),
            "Jupiter quote"
        );

        Ok(quote)
    }

    /// $100K liquidity probe. Returns the 0–100 liquidity score, or
    /// `None` when the quote failed — the risk engine then falls back
    /// to its oracle-confidence proxy.
    pub async fn check_liquidity(&self, from: Asset, to: Asset) -> Option<u8> {
        let amount = LIQUIDITY_PROBE_USD * LAMPORTS_PER_TOKEN;
        match self.quote(from, to, amount).await {
            Ok(quote) => {
                let slippage = quote.slippage_pct();
                info!(
                    from = %from,
                    to = %to,
                    slippage_pct = format!("{slippage:.4}"),
                    "Liquidity probe ($100K)"
                );
                Some(slippage_to_score(slippage))
            }
            Err(e) => {
                warn!(from = %from, to = %to, error = %e, "Liquidity probe failed");
                None
            }
        }
    }

    /// Simulate a $10K protective swap and describe the outcome. Always
    /// succeeds — a failed quote degrades to a "would swap" description.
    pub async fn simulate_protective_swap(
        &self,
        from: Asset,
        to: Asset,
        risk_score: u8,
        kind: ActionKind,
    ) -> String {
        let amount = PROTECTIVE_SWAP_USD * LAMPORTS_PER_TOKEN;
        match self.quote(from, to, amount).await {
            Ok(quote) => {
                let out = quote.out_tokens();
                let slippage = quote.slippage_pct();
                info!(
                    from = %from,
                    to = %to,
                    out_tokens = format!("{out:.2}"),
                    slippage_pct = format!("{slippage:.4}"),
                    "Simulated protective swap"
                );
                format!(
                    "{kind}: Swap $10,000 {from} → {out:.2} {to} \
                     (slippage: {slippage:.4}%, risk: {risk_score}/100) [SIMULATED]"
                )
            }
            Err(e) => {
                warn!(from = %from, to = %to, error = %e, "Swap quote unavailable");
                format!(
                    "{kind}: Would swap {from} → {to} (risk: {risk_score}/100). \
                     Quote unavailable. [SIMULATED]"
                )
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mints_are_distinct() {
        let mints = [
            mint_address(Asset::Usdc),
            mint_address(Asset::Usdt),
            mint_address(Asset::Pyusd),
        ];
        assert_ne!(mints[0], mints[1]);
        assert_ne!(mints[1], mints[2]);
        assert_ne!(mints[0], mints[2]);
    }

    #[test]
    fn test_slippage_score_buckets() {
        assert_eq!(slippage_to_score(0.05), 0);
        assert_eq!(slippage_to_score(0.2), 15);
        assert_eq!(slippage_to_score(0.4), 30);
        assert_eq!(slippage_to_score(0.7), 50);
        assert_eq!(slippage_to_score(1.5), 75);
        assert_eq!(slippage_to_score(5.0), 100);
    }

    #[test]
    fn test_slippage_score_boundaries_are_strict() {
        assert_eq!(slippage_to_score(0.1), 15);
        assert_eq!(slippage_to_score(0.3), 30);
        assert_eq!(slippage_to_score(0.5), 50);
        assert_eq!(slippage_to_score(1.0), 75);
        assert_eq!(slippage_to_score(2.0), 100);
    }

    #[test]
    fn test_quote_parsing() {
        let body = r#"{
            "inputMint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "outputMint": "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
            "inAmount": "10000000000",
            "outAmount": "9998120000",
            "priceImpactPct": "-0.0213",
            "slippageBps": 50
        }"#;
        let quote: SwapQuote = serde_json::from_str(body).unwrap();
        assert!((quote.slippage_pct() - 0.0213).abs() < 1e-12);
        assert!((quote.out_tokens() - 9998.12).abs() < 1e-6);
    }

    #[test]
    fn test_quote_garbage_impact_degrades_to_zero() {
        let quote = SwapQuote {
            in_amount: "1".to_string(),
            out_amount: "1".to_string(),
            price_impact_pct: "n/a".to_string(),
        };
        assert_eq!(quote.slippage_pct(), 0.0);
    }
}
