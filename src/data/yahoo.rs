//! Yahoo Finance chart provider.
//!
//! Uses the public v8 chart endpoint (no key required) for daily OHLCV
//! history. Bars with missing fields (halted sessions, partial data) are
//! dropped rather than interpolated.
//!
//! API: `https://query1.finance.yahoo.com/v8/finance/chart/{symbol}`
//! Auth: None required.
//! Rate limit: Unofficial — keep the configured budget conservative.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::PriceProvider;
use crate::types::{PriceBar, PriceSeries, Provenance};

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

// ---------------------------------------------------------------------------
// Chart response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub struct YahooProvider {
    http: Client,
}

impl YahooProvider {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent("ALPHA-SCOUT/0.1.0")
            .build()
            .context("Failed to build Yahoo HTTP client")?;
        Ok(Self { http })
    }

    /// Convert one chart result into bars, skipping incomplete rows.
    fn to_bars(result: &ChartResult) -> Vec<PriceBar> {
        let quote = match result.indicators.quote.first() {
            Some(q) => q,
            None => return Vec::new(),
        };
        let mut bars: Vec<PriceBar> = result
            .timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, ts)| {
                let at = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
                Some(PriceBar {
                    timestamp: DateTime::from_timestamp(*ts, 0)?,
                    open: at(&quote.open)?,
                    high: at(&quote.high)?,
                    low: at(&quote.low)?,
                    close: at(&quote.close)?,
                    volume: at(&quote.volume).unwrap_or(0.0),
                })
            })
            .collect();
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        bars
    }
}

#[async_trait]
impl PriceProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch_series(&self, symbol: &str, lookback_days: usize) -> Result<PriceSeries> {
        let end = Utc::now();
        let start = end - Duration::days(lookback_days as i64);

        let url = format!("{BASE_URL}/{symbol}");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("period1", start.timestamp().to_string()),
                ("period2", end.timestamp().to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("Yahoo request failed for {symbol}"))?
            .error_for_status()
            .with_context(|| format!("Yahoo returned an error status for {symbol}"))?;

        let parsed: ChartResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Yahoo chart response for {symbol}"))?;

        if let Some(err) = parsed.chart.error {
            return Err(anyhow!(
                "Yahoo chart error for {symbol}: {} ({})",
                err.description.unwrap_or_default(),
                err.code.unwrap_or_default(),
            ));
        }

        let result = parsed
            .chart
            .result
            .as_ref()
            .and_then(|r| r.first())
            .ok_or_else(|| anyhow!("Yahoo chart response empty for {symbol}"))?;

        let bars = Self::to_bars(result);
        Ok(PriceSeries::new(
            symbol,
            bars,
            Provenance::Live {
                provider: self.name().to_string(),
            },
        )?)
    }
}
