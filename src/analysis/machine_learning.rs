//! Momentum-model analyzer.
//!
//! Ordinary least squares fit of close against bar index over the
//! trailing window. The slope (normalized by the last close and
//! projected five bars forward) gives direction and magnitude; the fit's
//! R² is the natural confidence measure — a steep slope through noisy
//! data should not be trusted like the same slope through a clean trend.

use serde_json::json;

use super::Analyzer;
use crate::types::{AnalyzerResult, Direction, PriceSeries, ScoutError};

const WINDOW: usize = 30;
const MIN_BARS: usize = WINDOW;
/// Projected 5-bar move below which the model abstains.
const MOVE_BAND: f64 = 0.005;

/// Least-squares slope and R² of `y` against its index.
fn linear_fit(y: &[f64]) -> Option<(f64, f64)> {
    let n = y.len();
    if n < 2 {
        return None;
    }
    let n_f = n as f64;
    let x_mean = (n_f - 1.0) / 2.0;
    let y_mean = y.iter().sum::<f64>() / n_f;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (i, value) in y.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = value - y_mean;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    let r2 = if syy == 0.0 { 0.0 } else { (sxy * sxy) / (sxx * syy) };
    Some((slope, r2))
}

pub struct MomentumModelAnalyzer;

impl Analyzer for MomentumModelAnalyzer {
    fn id(&self) -> &'static str {
        "machine_learning"
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

        let window = &closes[closes.len() - WINDOW..];
        let last = *window.last().ok_or(ScoutError::InsufficientData {
            needed: WINDOW,
            got: 0,
        })?;
        let Some((slope, r2)) = linear_fit(window) else {
            return Ok(AnalyzerResult::neutral(self.id()));
        };
        if last <= 0.0 {
            return Ok(AnalyzerResult::neutral(self.id()));
        }

        // Fractional move the fitted trend implies over the next 5 bars.
        let projected_move = 5.0 * slope / last;

        let direction = if projected_move.abs() < MOVE_BAND || r2 < 0.1 {
            Direction::Neutral
        } else if projected_move > 0.0 {
            Direction::Bullish
        } else {
            Direction::Bearish
        };

        let probability = (50.0 + 400.0 * projected_move.abs()).min(80.0);
        let confidence = 20.0 + 70.0 * r2;

        Ok(AnalyzerResult::new(
            self.id(),
            direction,
            probability,
            confidence,
            json!({
                "slope": slope,
                "r2": r2,
                "projected_move_5d": projected_move,
            }),
        ))
    }
}
