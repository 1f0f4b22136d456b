//! Quantum analyzer.
//!
//! Reads the return series' lag-1 autocorrelation as a regime phase:
//! positive autocorrelation is a momentum regime (recent drift
//! continues), negative is mean-reverting (recent drift snaps back).
//! Near-zero autocorrelation is a random walk and yields no opinion.

use serde_json::json;

use super::{mean, simple_returns, Analyzer};
use crate::types::{AnalyzerResult, Direction, PriceSeries, ScoutError};

const MIN_BARS: usize = 20;
const AUTOCORR_BAND: f64 = 0.1;
const DRIFT_WINDOW: usize = 5;

/// Lag-1 autocorrelation of a sample.
fn autocorrelation(values: &[f64]) -> Option<f64> {
    if values.len() < 3 {
        return None;
    }
    let m = mean(values);
    let denom: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    if denom == 0.0 {
        return None;
    }
    let numer: f64 = values
        .windows(2)
        .map(|w| (w[0] - m) * (w[1] - m))
        .sum();
    Some(numer / denom)
}

pub struct QuantumAnalyzer;

impl Analyzer for QuantumAnalyzer {
    fn id(&self) -> &'static str {
        "quantum"
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
        let Some(autocorr) = autocorrelation(&returns) else {
            return Ok(AnalyzerResult::neutral(self.id()));
        };
        let recent_drift = mean(&returns[returns.len().saturating_sub(DRIFT_WINDOW)..]);

        let direction = if autocorr.abs() < AUTOCORR_BAND || recent_drift == 0.0 {
            Direction::Neutral
        } else {
            let continuation = if recent_drift > 0.0 {
                Direction::Bullish
            } else {
                Direction::Bearish
            };
            if autocorr > 0.0 {
                continuation
            } else {
                continuation.opposite()
            }
        };

        let probability = 50.0 + 20.0 * autocorr.abs().min(1.0);
        let confidence = 30.0 + 55.0 * autocorr.abs().min(1.0);

        Ok(AnalyzerResult::new(
            self.id(),
            direction,
            probability,
            confidence,
            json!({
                "autocorrelation": autocorr,
                "recent_drift": recent_drift,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::*;

    #[test]
    fn test_insufficient_history_is_neutral() {
        let series = series_from_closes("SPY", &rising_closes(10));
        let result = QuantumAnalyzer.analyze(&series).unwrap();
        assert_eq!(result.direction, Direction::Neutral);
    }

    #[test]
    fn test_momentum_regime_continues_drift() {
        // Smoothly accelerating rises: the return series climbs
        // monotonically, so lag-1 autocorrelation is strongly positive
        // and the positive recent drift is continued.
        let mut closes = vec![100.0];
        for i in 1..30 {
            let prev = *closes.last().unwrap();
            closes.push(prev * (1.0 + 0.0005 * i as f64));
        }
        let result = QuantumAnalyzer
            .analyze(&series_from_closes("SPY", &closes))
            .unwrap();
        assert_eq!(result.direction, Direction::Bullish);
    }

    #[test]
    fn test_mean_reverting_regime_fades_drift() {
        // Alternating big up / big down bars: strongly negative lag-1
        // autocorrelation. The last bar falls, so the fade is bullish.
        let mut closes = Vec::new();
        let mut price = 100.0;
        for i in 0..30 {
            price = if i % 2 == 0 { price * 1.05 } else { price * 0.95 };
            closes.push(price);
        }
        let result = QuantumAnalyzer.analyze(&series_from_closes("SPY", &closes)).unwrap();
        assert_eq!(result.direction, Direction::Bullish);
    }

    #[test]
    fn test_autocorrelation_of_alternating_signs() {
        let values = [1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let ac = autocorrelation(&values).unwrap();
        assert!(ac < -0.5);
    }

    #[test]
    fn test_autocorrelation_of_constant_is_none() {
        assert!(autocorrelation(&[2.0, 2.0, 2.0, 2.0]).is_none());
    }
}
