//! Price feed abstraction.
//!
//! The monitor loop only sees `PriceFeed`; the Pyth Hermes client is the
//! production implementation and tests substitute scripted feeds.

pub mod pyth;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::Observation;

pub use pyth::PythFeed;

/// A source of per-tick stablecoin observations.
///
/// One call covers every tracked asset; implementations return whatever
/// subset they could fetch this tick. A missing asset means "no data",
/// never a fabricated price.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Feed name for logging.
    fn name(&self) -> &str;

    /// Fetch the latest observation for each tracked asset. Partial
    /// results are fine; an empty vec means every feed failed.
    async fn fetch_prices(&self) -> Result<Vec<Observation>>;
}
