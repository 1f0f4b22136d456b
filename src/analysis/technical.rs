//! Technical analyzer.
//!
//! Classic indicator blend: RSI(14) for overbought/oversold pressure and
//! a 5/20 moving-average crossover for trend. The two votes are combined
//! into a single score in [-1, 1]; agreement between them raises the
//! confidence, disagreement leaves a weak lean.

use serde_json::json;

use super::{sma, Analyzer};
use crate::types::{AnalyzerResult, Direction, PriceSeries, ScoutError};

const RSI_PERIOD: usize = 14;
const FAST_SMA: usize = 5;
const SLOW_SMA: usize = 20;
/// Slow SMA plus one bar so a crossover can exist.
const MIN_BARS: usize = SLOW_SMA + 1;

/// Relative Strength Index over the trailing `period` bars.
fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < period + 1 {
        return None;
    }
    let tail = &closes[closes.len() - (period + 1)..];
    let mut gains = 0.0;
    let mut losses = 0.0;
    for w in tail.windows(2) {
        let delta = w[1] - w[0];
        if delta >= 0.0 {
            gains += delta;
        } else {
            losses -= delta;
        }
    }
    if losses == 0.0 {
        // No movement at all reads as balanced, not overbought.
        return Some(if gains == 0.0 { 50.0 } else { 100.0 });
    }
    let rs = gains / losses;
    Some(100.0 - 100.0 / (1.0 + rs))
}

pub struct TechnicalAnalyzer;

impl Analyzer for TechnicalAnalyzer {
    fn id(&self) -> &'static str {
        "technical"
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

        // These unwraps cannot fire past the MIN_BARS gate, but stay in
        // the Result idiom anyway.
        let fast = sma(&closes, FAST_SMA).ok_or(ScoutError::InsufficientData {
            needed: FAST_SMA,
            got: closes.len(),
        })?;
        let slow = sma(&closes, SLOW_SMA).ok_or(ScoutError::InsufficientData {
            needed: SLOW_SMA,
            got: closes.len(),
        })?;
        let rsi_value = rsi(&closes, RSI_PERIOD).ok_or(ScoutError::InsufficientData {
            needed: RSI_PERIOD + 1,
            got: closes.len(),
        })?;

        let trend_vote = if fast > slow {
            1.0
        } else if fast < slow {
            -1.0
        } else {
            0.0
        };

        // Hard votes at the classic 30/70 bands, a mild lean in between.
        let rsi_vote = if rsi_value <= 30.0 {
            1.0
        } else if rsi_value >= 70.0 {
            -1.0
        } else {
            (50.0 - rsi_value) / 50.0
        };

        let score: f64 = 0.6 * trend_vote + 0.4 * rsi_vote;

        let direction = if score > 0.15 {
            Direction::Bullish
        } else if score < -0.15 {
            Direction::Bearish
        } else {
            Direction::Neutral
        };

        let agreement_bonus = if trend_vote * rsi_vote > 0.0 { 10.0 } else { 0.0 };
        let probability = 50.0 + 30.0 * score.abs();
        let confidence = 40.0 + 40.0 * score.abs() + agreement_bonus;

        Ok(AnalyzerResult::new(
            self.id(),
            direction,
            probability,
            confidence,
            json!({
                "rsi": rsi_value,
                "fast_sma": fast,
                "slow_sma": slow,
                "score": score,
            }),
        ))
    }
}
