//! Sentiment analyzer.
//!
//! Volume-weighted buying/selling pressure over the recent window: the
//! dollar-volume traded on up bars against down bars stands in for
//! crowd mood. Pressure near ±1 means one side dominated the tape.

use serde_json::json;

use super::Analyzer;
use crate::types::{AnalyzerResult, Direction, PriceSeries, ScoutError};

/// Pressure window plus one prior bar for the first comparison.
const WINDOW: usize = 10;
const MIN_BARS: usize = WINDOW + 1;
/// Pressure beyond which an opinion forms.
const PRESSURE_BAND: f64 = 0.2;

pub struct SentimentAnalyzer;

impl Analyzer for SentimentAnalyzer {
    fn id(&self) -> &'static str {
        "sentiment"
    }

    fn analyze(&self, series: &PriceSeries) -> Result<AnalyzerResult, ScoutError> {
        if series.len() < MIN_BARS {
            return Ok(AnalyzerResult::new(
                self.id(),
                Direction::Neutral,
                50.0,
                10.0,
                json!({ "reason": "insufficient history", "bars": series.len() }),
            ));
        }

        let tail = &series.bars[series.len() - MIN_BARS..];
        let mut up_volume = 0.0;
        let mut down_volume = 0.0;
        for pair in tail.windows(2) {
            let volume = pair[1].volume.max(0.0);
            if pair[1].close > pair[0].close {
                up_volume += volume;
            } else if pair[1].close < pair[0].close {
                down_volume += volume;
            }
        }

        let total = up_volume + down_volume;
        if total <= 0.0 {
            // No traded volume in the window — no crowd to read.
            return Ok(AnalyzerResult::new(
                self.id(),
                Direction::Neutral,
                50.0,
                15.0,
                json!({ "reason": "no volume in window" }),
            ));
        }

        let pressure = (up_volume - down_volume) / total;

        let direction = if pressure > PRESSURE_BAND {
            Direction::Bullish
        } else if pressure < -PRESSURE_BAND {
            Direction::Bearish
        } else {
            Direction::Neutral
        };

        let probability = 50.0 + 25.0 * pressure.abs();
        let confidence = 30.0 + 50.0 * pressure.abs();

        Ok(AnalyzerResult::new(
            self.id(),
            direction,
            probability,
            confidence,
            json!({
                "up_volume": up_volume,
                "down_volume": down_volume,
                "pressure": pressure,
            }),
        ))
    }
}
