//! Market-psychology analyzer.
//!
//! Two crowd-behavior reads on the series: a volatility regime shift
//! (recent volatility far above the window baseline marks panic or
//! euphoria — fade the move) and closing-streak exhaustion (a long
//! one-way run attracts late chasers — fade it too). A short streak in a
//! calm tape reads as orderly trend and is followed instead.

use serde_json::json;

use super::{mean, simple_returns, std_dev, Analyzer};
use crate::types::{AnalyzerResult, Direction, PriceSeries, ScoutError};

const MIN_BARS: usize = 25;
const RECENT_WINDOW: usize = 10;
/// Recent/baseline volatility ratio that marks a regime shift.
const PANIC_RATIO: f64 = 1.5;
/// Streak length treated as crowd exhaustion.
const EXHAUSTION_STREAK: usize = 5;

/// Length of the run of same-direction closes at the end of the series,
/// signed: positive for up-closes, negative for down-closes.
fn closing_streak(closes: &[f64]) -> i64 {
    let mut streak = 0i64;
    for pair in closes.windows(2).rev() {
        let step = if pair[1] > pair[0] {
            1
        } else if pair[1] < pair[0] {
            -1
        } else {
            break;
        };
        if streak == 0 || streak.signum() == step {
            streak += step;
        } else {
            break;
        }
    }
    streak
}

pub struct PsychologyAnalyzer;

impl Analyzer for PsychologyAnalyzer {
    fn id(&self) -> &'static str {
        "psychology"
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

        let returns = simple_returns(&closes);
        let baseline_vol = std_dev(&returns);
        let recent_vol = std_dev(&returns[returns.len().saturating_sub(RECENT_WINDOW)..]);
        let vol_ratio = if baseline_vol > 0.0 {
            recent_vol / baseline_vol
        } else {
            1.0
        };

        let streak = closing_streak(&closes);
        let drift = mean(&returns[returns.len().saturating_sub(RECENT_WINDOW)..]);
        let drift_direction = if drift > 0.0 {
            Direction::Bullish
        } else if drift < 0.0 {
            Direction::Bearish
        } else {
            Direction::Neutral
        };

        let (direction, probability, confidence, regime) = if vol_ratio > PANIC_RATIO {
            // Panic or euphoria: fade the move.
            (
                drift_direction.opposite(),
                50.0 + 8.0 * (vol_ratio - 1.0).min(2.0) * 2.0,
                55.0,
                "regime_shift",
            )
        } else if streak.unsigned_abs() as usize >= EXHAUSTION_STREAK {
            // The crowd has chased this run for a week; expect a pause.
            let run_direction = if streak > 0 {
                Direction::Bullish
            } else {
                Direction::Bearish
            };
            (
                run_direction.opposite(),
                55.0,
                40.0 + 3.0 * streak.unsigned_abs() as f64,
                "exhaustion",
            )
        } else if streak.unsigned_abs() >= 3 && vol_ratio < 1.0 {
            // Orderly trend in a calming tape: follow it.
            (drift_direction, 58.0, 50.0, "orderly_trend")
        } else {
            (Direction::Neutral, 50.0, 25.0, "no_read")
        };

        Ok(AnalyzerResult::new(
            self.id(),
            direction,
            probability,
            confidence,
            json!({
                "vol_ratio": vol_ratio,
                "streak": streak,
                "drift": drift,
                "regime": regime,
            }),
        ))
    }
}
