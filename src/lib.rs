//! STABLEGUARD — Autonomous Stablecoin Risk Intelligence Agent
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod actions;
pub mod config;
pub mod dashboard;
pub mod dex;
pub mod feeds;
pub mod history;
pub mod risk;
pub mod types;
pub mod yields;
