//! Market data providers.
//!
//! Defines the `PriceProvider` trait and the failover controller that
//! tries providers in priority order, plus the synthetic fallback
//! generator used when every real source is unavailable.

pub mod alphavantage;
pub mod controller;
pub mod synthetic;
pub mod yahoo;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::PriceSeries;

pub use controller::{DataSourceController, FailoverPolicy, Fetched, ProviderHealth};

/// Abstraction over historical price data sources.
///
/// Implementors fetch an OHLCV series for one instrument. Errors are
/// expected and recovered by the controller's failover — a provider
/// should fail loudly rather than return partial garbage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Provider name for logging, health tracking, and provenance.
    fn name(&self) -> &str;

    /// Fetch up to `lookback_days` daily bars for the symbol.
    async fn fetch_series(&self, symbol: &str, lookback_days: usize) -> Result<PriceSeries>;
}
