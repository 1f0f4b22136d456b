//! Fundamental analyzer.
//!
//! Price-series proxy for value analysis: the long-window mean acts as a
//! fair-value anchor, and the premium or discount of the latest close to
//! that anchor drives a mean-reversion opinion. A deep drawdown from the
//! window peak dampens confidence — falling knives look cheap.

use serde_json::json;

use super::{mean, Analyzer};
use crate::types::{AnalyzerResult, Direction, PriceSeries, ScoutError};

const MIN_BARS: usize = 30;
/// Premium/discount beyond which an opinion forms.
const VALUE_BAND: f64 = 0.05;
/// Drawdown past which confidence is halved.
const DRAWDOWN_LIMIT: f64 = 0.15;

pub struct FundamentalAnalyzer;

impl Analyzer for FundamentalAnalyzer {
    fn id(&self) -> &'static str {
        "fundamental"
    }

    fn analyze(&self, series: &PriceSeries) -> Result<AnalyzerResult, ScoutError> {
        let closes = series.closes();
        if closes.len() < MIN_BARS {
            return Ok(AnalyzerResult::new(
                self.id(),
                Direction::Neutral,
                50.0,
                10.0,
                json!({ "reason": "insufficient history", "bars": closes.len() }),
            ));
        }

        let last = *closes.last().ok_or(ScoutError::InsufficientData {
            needed: MIN_BARS,
            got: 0,
        })?;
        let anchor = mean(&closes);
        if anchor <= 0.0 {
            return Ok(AnalyzerResult::neutral(self.id()));
        }
        let premium = (last - anchor) / anchor;

        let peak = closes.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let drawdown = if peak > 0.0 { 1.0 - last / peak } else { 0.0 };

        // Discount to anchor reads bullish (reversion toward value),
        // premium reads bearish.
        let direction = if premium < -VALUE_BAND {
            Direction::Bullish
        } else if premium > VALUE_BAND {
            Direction::Bearish
        } else {
            Direction::Neutral
        };

        let probability = (50.0 + 250.0 * premium.abs()).min(75.0);
        let mut confidence = 45.0 + 25.0 * (closes.len().min(120) as f64 / 120.0);
        if drawdown > DRAWDOWN_LIMIT {
            confidence *= 0.5;
        }

        Ok(AnalyzerResult::new(
            self.id(),
            direction,
            probability,
            confidence,
            json!({
                "anchor": anchor,
                "premium": premium,
                "drawdown": drawdown,
            }),
        ))
    }
}
