//! Risk manager.
//!
//! Pure derivation of exit levels and a qualitative risk tier from a
//! trade construction and the configured percentage targets. No state,
//! no I/O — callable anywhere, testable in isolation.
//!
//! Tier bands (on final probability and consensus strength):
//! - LOW:    probability ≥ 70 and consensus_strength ≥ 2/3
//! - MEDIUM: probability ≥ 60 or consensus_strength ≥ 0.5
//! - HIGH:   everything else

use crate::config::RiskSettings;
use crate::types::{OptionStrategy, RiskProfile, RiskTier};

const LOW_PROBABILITY: f64 = 70.0;
const LOW_CONSENSUS: f64 = 2.0 / 3.0;
const MEDIUM_PROBABILITY: f64 = 60.0;
const MEDIUM_CONSENSUS: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct RiskManager {
    tp_pct: f64,
    sl_pct: f64,
}

impl RiskManager {
    pub fn new(settings: &RiskSettings) -> Self {
        Self {
            tp_pct: settings.tp_pct,
            sl_pct: settings.sl_pct,
        }
    }

    /// Compute take-profit/stop-loss on the underlying and the risk tier.
    ///
    /// Calls profit upward: TP above entry, SL below. Puts mirrored.
    pub fn profile(
        &self,
        strategy: OptionStrategy,
        entry_price: f64,
        probability: f64,
        consensus_strength: f64,
    ) -> RiskProfile {
        let (take_profit, stop_loss) = match strategy {
            OptionStrategy::LongCall => (
                entry_price * (1.0 + self.tp_pct),
                entry_price * (1.0 - self.sl_pct),
            ),
            OptionStrategy::LongPut => (
                entry_price * (1.0 - self.tp_pct),
                entry_price * (1.0 + self.sl_pct),
            ),
        };
        RiskProfile {
            take_profit,
            stop_loss,
            tier: Self::tier(probability, consensus_strength),
        }
    }

    fn tier(probability: f64, consensus_strength: f64) -> RiskTier {
        if probability >= LOW_PROBABILITY && consensus_strength >= LOW_CONSENSUS {
            RiskTier::Low
        } else if probability >= MEDIUM_PROBABILITY || consensus_strength >= MEDIUM_CONSENSUS {
            RiskTier::Medium
        } else {
            RiskTier::High
        }
    }
}
