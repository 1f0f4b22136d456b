//! Alpha Vantage daily series provider.
//!
//! Keyed provider (free tier: 25 requests/day). The API reports rate
//! limiting as a 200 response with a "Note"/"Information" body, so that
//! case is surfaced as an error for the failover controller to count.
//!
//! API: `https://www.alphavantage.co/query?function=TIME_SERIES_DAILY`
//! Auth: `apikey` query parameter.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;

use super::PriceProvider;
use crate::types::{PriceBar, PriceSeries, Provenance};

const BASE_URL: &str = "https://www.alphavantage.co/query";

#[derive(Debug, Deserialize)]
struct DailyResponse {
    #[serde(rename = "Time Series (Daily)", default)]
    series: Option<BTreeMap<String, DailyBar>>,
    #[serde(rename = "Note", default)]
    note: Option<String>,
    #[serde(rename = "Information", default)]
    information: Option<String>,
    #[serde(rename = "Error Message", default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

pub struct AlphaVantageProvider {
    http: Client,
    api_key: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent("ALPHA-SCOUT/0.1.0")
            .build()
            .context("Failed to build Alpha Vantage HTTP client")?;
        Ok(Self { http, api_key })
    }

    /// Parse the date-keyed map into ordered bars, keeping the most
    /// recent `lookback_days`. BTreeMap keys are ISO dates so iteration
    /// order is already chronological.
    fn to_bars(series: &BTreeMap<String, DailyBar>, lookback_days: usize) -> Result<Vec<PriceBar>> {
        let mut bars = Vec::with_capacity(series.len());
        for (date, bar) in series {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("Bad date key in Alpha Vantage response: {date}"))?;
            let timestamp = date
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| anyhow!("Invalid midnight for {date}"))?
                .and_utc();
            bars.push(PriceBar {
                timestamp,
                open: bar.open.parse().context("Bad open field")?,
                high: bar.high.parse().context("Bad high field")?,
                low: bar.low.parse().context("Bad low field")?,
                close: bar.close.parse().context("Bad close field")?,
                volume: bar.volume.parse().context("Bad volume field")?,
            });
        }
        if bars.len() > lookback_days {
            bars.drain(..bars.len() - lookback_days);
        }
        Ok(bars)
    }
}

#[async_trait]
impl PriceProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "alphavantage"
    }

    async fn fetch_series(&self, symbol: &str, lookback_days: usize) -> Result<PriceSeries> {
        let outputsize = if lookback_days > 100 { "full" } else { "compact" };
        let response = self
            .http
            .get(BASE_URL)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", outputsize),
                ("apikey", &self.api_key),
            ])
            .send()
            .await
            .with_context(|| format!("Alpha Vantage request failed for {symbol}"))?
            .error_for_status()
            .with_context(|| format!("Alpha Vantage returned an error status for {symbol}"))?;

        let parsed: DailyResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Alpha Vantage response for {symbol}"))?;

        if let Some(message) = parsed.error_message {
            return Err(anyhow!("Alpha Vantage error for {symbol}: {message}"));
        }
        if let Some(note) = parsed.note.or(parsed.information) {
            // Rate-limit notices arrive as a 200 with no series.
            return Err(anyhow!("Alpha Vantage throttled {symbol}: {note}"));
        }

        let series = parsed
            .series
            .ok_or_else(|| anyhow!("Alpha Vantage response missing daily series for {symbol}"))?;
        let bars = Self::to_bars(&series, lookback_days)?;

        Ok(PriceSeries::new(
            symbol,
            bars,
            Provenance::Live {
                provider: self.name().to_string(),
            },
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> &'static str {
        r#"{
            "Meta Data": {"2. Symbol": "AAPL"},
            "Time Series (Daily)": {
                "2026-08-04": {
                    "1. open": "186.00", "2. high": "188.10",
                    "3. low": "185.20", "4. close": "187.42", "5. volume": "54000000"
                },
                "2026-08-03": {
                    "1. open": "184.50", "2. high": "186.70",
                    "3. low": "184.00", "4. close": "186.01", "5. volume": "48200000"
                },
                "2026-08-01": {
                    "1. open": "183.00", "2. high": "185.00",
                    "3. low": "182.40", "4. close": "184.55", "5. volume": "39900000"
                }
            }
        }"#
    }

    #[test]
    fn test_parse_daily_response() {
        let parsed: DailyResponse = serde_json::from_str(sample_payload()).unwrap();
        let series = parsed.series.unwrap();
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_to_bars_chronological() {
        let parsed: DailyResponse = serde_json::from_str(sample_payload()).unwrap();
        let bars = AlphaVantageProvider::to_bars(&parsed.series.unwrap(), 10).unwrap();
        assert_eq!(bars.len(), 3);
        assert!(bars[0].timestamp < bars[1].timestamp);
        assert!(bars[1].timestamp < bars[2].timestamp);
        assert!((bars[2].close - 187.42).abs() < 1e-9);
    }

    #[test]
    fn test_to_bars_truncates_to_lookback() {
        let parsed: DailyResponse = serde_json::from_str(sample_payload()).unwrap();
        let bars = AlphaVantageProvider::to_bars(&parsed.series.unwrap(), 2).unwrap();
        assert_eq!(bars.len(), 2);
        // The most recent bars survive truncation.
        assert!((bars[1].close - 187.42).abs() < 1e-9);
    }

    #[test]
    fn test_throttle_note_detected() {
        let payload = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day."}"#;
        let parsed: DailyResponse = serde_json::from_str(payload).unwrap();
        assert!(parsed.note.is_some());
        assert!(parsed.series.is_none());
    }

    #[test]
    fn test_bad_number_rejected() {
        let mut series = BTreeMap::new();
        series.insert(
            "2026-08-04".to_string(),
            DailyBar {
                open: "not-a-number".to_string(),
                high: "1".to_string(),
                low: "1".to_string(),
                close: "1".to_string(),
                volume: "1".to_string(),
            },
        );
        assert!(AlphaVantageProvider::to_bars(&series, 10).is_err());
    }
}
