//! Weighted-consensus aggregation.
//!
//! Reconciles the independently-confidenced analyzer results for one
//! instrument into a single `UnifiedSignal`. Pure function of the result
//! sequence and the weight table — no hidden state, no I/O — so it is
//! independently testable and deterministic.
//!
//! The direction score weighs each analyzer's vote by its base weight and
//! its self-reported confidence, so a confident minority can outvote a
//! hesitant majority. The final probability is the plain weighted mean,
//! NOT gated by direction agreement: a bearish analyzer's probability
//! still contributes to the overall success estimate.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::config::ConsensusSettings;
use crate::types::{AnalyzerResult, Direction, UnifiedSignal};

/// Combines analyzer results via weighted voting and confidence-scaled
/// adjustment. Construct once from config; `aggregate` is `&self`.
#[derive(Debug, Clone)]
pub struct ConsensusAggregator {
    weights: HashMap<String, f64>,
    bullish_threshold: f64,
    bearish_threshold: f64,
}

impl ConsensusAggregator {
    pub fn new(settings: &ConsensusSettings) -> Self {
        Self {
            weights: settings.weights.clone(),
            bullish_threshold: settings.bullish_threshold,
            bearish_threshold: settings.bearish_threshold,
        }
    }

    /// Base weight for an analyzer. Ids absent from the table weigh zero,
    /// so an unregistered analyzer cannot influence the consensus.
    fn weight(&self, analyzer_id: &str) -> f64 {
        self.weights.get(analyzer_id).copied().unwrap_or(0.0)
    }

    /// Aggregate with an explicit timestamp (deterministic; used by tests
    /// and by callers that stamp a whole batch with one instant).
    pub fn aggregate_at(
        &self,
        symbol: &str,
        results: &[AnalyzerResult],
        now: DateTime<Utc>,
    ) -> UnifiedSignal {
        let mut direction_score = 0.0;
        let mut final_probability = 0.0;
        let mut ecosystem_confidence = 0.0;

        for r in results {
            let w = self.weight(&r.analyzer_id);
            direction_score += w * (r.confidence / 100.0) * r.direction.sign();
            final_probability += w * r.probability;
            ecosystem_confidence += w * r.confidence;
        }

        // Exact cancellation is Neutral regardless of thresholds.
        let direction = if direction_score == 0.0 {
            Direction::Neutral
        } else if direction_score > self.bullish_threshold {
            Direction::Bullish
        } else if direction_score < -self.bearish_threshold {
            Direction::Bearish
        } else {
            Direction::Neutral
        };

        let agreeing = results.iter().filter(|r| r.direction == direction).count();
        let consensus_strength = if results.is_empty() {
            0.0
        } else {
            agreeing as f64 / results.len() as f64
        };

        debug!(
            symbol,
            score = format!("{direction_score:.4}"),
            direction = %direction,
            probability = format!("{final_probability:.1}"),
            confidence = format!("{ecosystem_confidence:.1}"),
            consensus = format!("{consensus_strength:.2}"),
            "Consensus aggregated"
        );

        UnifiedSignal {
            symbol: symbol.to_string(),
            direction,
            final_probability: final_probability.clamp(0.0, 100.0),
            ecosystem_confidence: ecosystem_confidence.clamp(0.0, 100.0),
            consensus_strength,
            components: results.to_vec(),
            generated_at: now,
        }
    }

    /// Aggregate, stamped with the current instant.
    pub fn aggregate(&self, symbol: &str, results: &[AnalyzerResult]) -> UnifiedSignal {
        self.aggregate_at(symbol, results, Utc::now())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
