//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! No secrets are required — every upstream API the agent talks to is
//! unauthenticated — so there is no env-var resolution layer.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub feeds: FeedsConfig,
    pub dex: DexConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub name: String,
    /// Baseline tick interval under calm conditions.
    pub tick_interval_secs: u64,
    /// Tick interval while any asset sits at or above the alert tier.
    pub fast_tick_interval_secs: u64,
    /// Run the DEX liquidity probe every Nth tick.
    pub liquidity_probe_every: u64,
    /// Refresh lending yields every Nth tick.
    pub yield_refresh_every: u64,
}

impl AgentConfig {
    /// Whether the DEX liquidity probe runs on this 1-based tick. Fires
    /// on the first tick and every `liquidity_probe_every` ticks after.
    pub fn liquidity_probe_due(&self, tick_count: u64) -> bool {
        (tick_count - 1) % self.liquidity_probe_every == 0
    }

    /// Whether the lending-yield refresh runs on this 1-based tick.
    pub fn yield_refresh_due(&self, tick_count: u64) -> bool {
        tick_count % self.yield_refresh_every == 0
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedsConfig {
    pub hermes_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DexConfig {
    pub jupiter_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }
}
