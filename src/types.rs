//! Shared types for the ALPHA-SCOUT scanner.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that data, analysis, strategy,
//! and engine modules can depend on them without circular references.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Directional opinion on an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    /// Signed contribution used by the consensus score:
    /// Bullish = +1, Bearish = -1, Neutral = 0.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Bullish => 1.0,
            Direction::Bearish => -1.0,
            Direction::Neutral => 0.0,
        }
    }

    /// The opposite direction. Neutral is its own opposite.
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Bearish => Direction::Bullish,
            Direction::Neutral => Direction::Neutral,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Bullish => write!(f, "BULLISH"),
            Direction::Bearish => write!(f, "BEARISH"),
            Direction::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

// ---------------------------------------------------------------------------
// Price series
// ---------------------------------------------------------------------------

/// Where a price series came from. Downstream consumers discount
/// confidence when the series is synthetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    /// Fetched from a real provider.
    Live { provider: String },
    /// Generated in-process because every provider was unavailable.
    Synthetic,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Live { provider } => write!(f, "live:{provider}"),
            Provenance::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// A single OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Ordered OHLCV history for one instrument. Immutable once built;
/// the constructor enforces strictly increasing timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
    pub provenance: Provenance,
}

impl PriceSeries {
    /// Build a series, validating the timestamp invariant.
    /// Bars must already be sorted; duplicates are rejected.
    pub fn new(
        symbol: impl Into<String>,
        bars: Vec<PriceBar>,
        provenance: Provenance,
    ) -> Result<Self, ScoutError> {
        let symbol = symbol.into();
        for pair in bars.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(ScoutError::Provider {
                    provider: provenance.to_string(),
                    message: format!(
                        "{symbol}: non-increasing bar timestamps ({} then {})",
                        pair[0].timestamp, pair[1].timestamp
                    ),
                });
            }
        }
        Ok(Self {
            symbol,
            bars,
            provenance,
        })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn is_synthetic(&self) -> bool {
        self.provenance == Provenance::Synthetic
    }

    /// Closing prices in timestamp order.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// The most recent close, if any bars exist.
    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }
}

impl fmt::Display for PriceSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} bars, {}]",
            self.symbol,
            self.bars.len(),
            self.provenance,
        )
    }
}

// ---------------------------------------------------------------------------
// Analyzer output
// ---------------------------------------------------------------------------

/// One analyzer's opinion on an instrument. Produced once per analysis
/// call; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerResult {
    pub analyzer_id: String,
    pub direction: Direction,
    /// Probability of the directional move succeeding (0–100).
    pub probability: f64,
    /// Self-assessed confidence in the opinion (0–100).
    pub confidence: f64,
    /// Structured evidence payload, preserved for audit.
    pub evidence: serde_json::Value,
}

impl AnalyzerResult {
    /// Build a result, clamping probability and confidence into [0, 100].
    pub fn new(
        analyzer_id: impl Into<String>,
        direction: Direction,
        probability: f64,
        confidence: f64,
        evidence: serde_json::Value,
    ) -> Self {
        Self {
            analyzer_id: analyzer_id.into(),
            direction,
            probability: probability.clamp(0.0, 100.0),
            confidence: confidence.clamp(0.0, 100.0),
            evidence,
        }
    }

    /// The stand-in result used when an analyzer cannot form an opinion
    /// or fails outright: neutral, 50% probability, zero confidence.
    pub fn neutral(analyzer_id: impl Into<String>) -> Self {
        Self::new(
            analyzer_id,
            Direction::Neutral,
            50.0,
            0.0,
            serde_json::Value::Null,
        )
    }
}

impl fmt::Display for AnalyzerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} p={:.1}% conf={:.1}%",
            self.analyzer_id, self.direction, self.probability, self.confidence,
        )
    }
}

// ---------------------------------------------------------------------------
// Unified signal
// ---------------------------------------------------------------------------

/// The reconciled output of all analyzers for one instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedSignal {
    pub symbol: String,
    pub direction: Direction,
    /// Weighted-mean success probability (0–100).
    pub final_probability: f64,
    /// Weighted-mean analyzer confidence (0–100).
    pub ecosystem_confidence: f64,
    /// Fraction of analyzers agreeing with the final direction (0–1).
    pub consensus_strength: f64,
    /// Component results in registry order.
    pub components: Vec<AnalyzerResult>,
    pub generated_at: DateTime<Utc>,
}

impl fmt::Display for UnifiedSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} p={:.1}% conf={:.1}% consensus={:.0}% ({} components)",
            self.symbol,
            self.direction,
            self.final_probability,
            self.ecosystem_confidence,
            self.consensus_strength * 100.0,
            self.components.len(),
        )
    }
}

// ---------------------------------------------------------------------------
// Trade construction
// ---------------------------------------------------------------------------

/// Options strategy chosen for a directional signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionStrategy {
    LongCall,
    LongPut,
}

impl fmt::Display for OptionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionStrategy::LongCall => write!(f, "LONG_CALL"),
            OptionStrategy::LongPut => write!(f, "LONG_PUT"),
        }
    }
}

/// A concrete trade construction derived from a unified signal and the
/// current price. Absence of a construction (the selector returning
/// `None`) means no strategy cleared the thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeConstruction {
    pub strategy: OptionStrategy,
    pub strike: f64,
    pub expiry_date: NaiveDate,
    /// Heuristic expected return on premium, percent.
    pub expected_return: f64,
}

impl fmt::Display for TradeConstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} strike=${:.2} expiry={} exp_return={:.1}%",
            self.strategy, self.strike, self.expiry_date, self.expected_return,
        )
    }
}

// ---------------------------------------------------------------------------
// Risk profile
// ---------------------------------------------------------------------------

/// Qualitative risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTier::Low => write!(f, "LOW"),
            RiskTier::Medium => write!(f, "MEDIUM"),
            RiskTier::High => write!(f, "HIGH"),
        }
    }
}

/// Exit levels and tier for a trade construction. Pure derivation,
/// no persisted state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskProfile {
    pub take_profit: f64,
    pub stop_loss: f64,
    pub tier: RiskTier,
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TP=${:.2} SL=${:.2} risk={}",
            self.take_profit, self.stop_loss, self.tier,
        )
    }
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

/// The full package handed to the notification channel: unified signal,
/// trade construction, risk profile, and the entry price they were
/// derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub signal: UnifiedSignal,
    pub trade: TradeConstruction,
    pub risk: RiskProfile,
    pub entry_price: f64,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ ${:.2} | {} | {}",
            self.signal, self.entry_price, self.trade, self.risk,
        )
    }
}

// ---------------------------------------------------------------------------
// Signal ledger record
// ---------------------------------------------------------------------------

/// Duplicate-guard ledger entry. The only core entity whose lifecycle
/// spans multiple scan cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub symbol: String,
    pub direction: Direction,
    pub strategy: OptionStrategy,
    pub emitted_at: DateTime<Utc>,
}

impl fmt::Display for SignalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} @ {}",
            self.symbol, self.direction, self.strategy, self.emitted_at,
        )
    }
}

// ---------------------------------------------------------------------------
// Scan report
// ---------------------------------------------------------------------------

/// Per-symbol outcome of one pipeline run. Failures are data, not
/// escaping errors — the batch never aborts on one instrument.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// Signal cleared every gate and was handed downstream.
    Emitted(Box<Recommendation>),
    /// Signal generated but suppressed by the duplicate guard.
    Suppressed { symbol: String },
    /// Pipeline completed but no strategy cleared the thresholds.
    NoSignal { symbol: String },
    /// Instrument-local failure; the rest of the batch continues.
    Failed { symbol: String, error: String },
    /// Not attempted because the scan was cancelled first.
    Skipped { symbol: String },
}

/// Structured summary of one scan across the instrument universe.
/// Observability only — nothing branches on these counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    pub attempted: usize,
    pub emitted: usize,
    pub suppressed: usize,
    pub no_signal: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Instruments that ran against a synthetic series.
    pub synthetic_series: usize,
    /// Provider failovers triggered across all fetches.
    pub provider_failovers: usize,
    pub duration_ms: u64,
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempted={} emitted={} suppressed={} no_signal={} failed={} skipped={} synthetic={} failovers={} ({}ms)",
            self.attempted,
            self.emitted,
            self.suppressed,
            self.no_signal,
            self.failed,
            self.skipped,
            self.synthetic_series,
            self.provider_failovers,
            self.duration_ms,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for ALPHA-SCOUT.
#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    #[error("Provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    #[error("Insufficient data: need {needed} bars, have {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Aggregation error: {0}")]
    Aggregation(String),

    #[error("Delivery error ({channel}): {message}")]
    Delivery { channel: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
