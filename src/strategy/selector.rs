//! Strategy selector.
//!
//! State-machine-free decision table from (direction, probability) to a
//! concrete options construction. Long calls for bullish signals, long
//! puts for bearish — directional simplicity over spreads, the strikes
//! one OTM step away from spot, expiries on the nearest Friday inside
//! the configured window.
//!
//! Expected-return heuristic: `(25 + 50·otm) × probability / 60`,
//! clamped to [5, 35] percent. Monotonic increasing in probability by
//! construction (linear inside the clamp), and slightly richer for
//! further-OTM strikes since those carry more leverage.

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};

use crate::config::StrategySettings;
use crate::types::{Direction, OptionStrategy, TradeConstruction, UnifiedSignal};

/// Base expected return (percent) for a long directional option.
const BASE_RETURN: f64 = 25.0;
/// Probability around which the heuristic is normalized.
const PIVOT_PROBABILITY: f64 = 60.0;
const MIN_RETURN: f64 = 5.0;
const MAX_RETURN: f64 = 35.0;

#[derive(Debug, Clone)]
pub struct StrategySelector {
    min_probability: f64,
    otm_percentage: f64,
    expiry_days_min: i64,
    expiry_days_max: i64,
}

impl StrategySelector {
    pub fn new(settings: &StrategySettings) -> Self {
        Self {
            min_probability: settings.min_probability,
            otm_percentage: settings.otm_percentage,
            expiry_days_min: settings.expiry_days_min,
            expiry_days_max: settings.expiry_days_max,
        }
    }

    /// Select a construction for the signal, or `None` when no strategy
    /// clears the probability threshold (or the direction is neutral).
    pub fn select_on(
        &self,
        signal: &UnifiedSignal,
        current_price: f64,
        today: NaiveDate,
    ) -> Option<TradeConstruction> {
        if signal.final_probability < self.min_probability || current_price <= 0.0 {
            return None;
        }
        let strategy = match signal.direction {
            Direction::Bullish => OptionStrategy::LongCall,
            Direction::Bearish => OptionStrategy::LongPut,
            Direction::Neutral => return None,
        };
        let strike = match strategy {
            OptionStrategy::LongCall => current_price * (1.0 + self.otm_percentage),
            OptionStrategy::LongPut => current_price * (1.0 - self.otm_percentage),
        };
        Some(TradeConstruction {
            strategy,
            strike: (strike * 100.0).round() / 100.0,
            expiry_date: self.expiry_for(today),
            expected_return: self.expected_return(signal.final_probability),
        })
    }

    /// Select using today's date.
    pub fn select(&self, signal: &UnifiedSignal, current_price: f64) -> Option<TradeConstruction> {
        self.select_on(signal, current_price, Utc::now().date_naive())
    }

    /// First Friday at least `expiry_days_min` out; if that overshoots
    /// the window, fall back to the window's last day.
    fn expiry_for(&self, today: NaiveDate) -> NaiveDate {
        let earliest = today + Duration::days(self.expiry_days_min);
        let days_to_friday = (Weekday::Fri.num_days_from_monday() + 7
            - earliest.weekday().num_days_from_monday())
            % 7;
        let friday = earliest + Duration::days(days_to_friday as i64);
        let latest = today + Duration::days(self.expiry_days_max);
        friday.min(latest)
    }

    /// Documented heuristic, testable in isolation.
    pub fn expected_return(&self, probability: f64) -> f64 {
        let base = BASE_RETURN + 50.0 * self.otm_percentage;
        (base * probability / PIVOT_PROBABILITY).clamp(MIN_RETURN, MAX_RETURN)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
