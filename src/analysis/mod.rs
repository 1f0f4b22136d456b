//! Analysis capability contract and registry.
//!
//! Each analyzer is one implementation of the `Analyzer` trait: a
//! side-effect-free, total function from a price series to a directional
//! opinion. Analyzers that cannot form an opinion (insufficient history)
//! return a Neutral low-confidence result rather than an error; an
//! analyzer that does error is substituted with a Neutral zero-confidence
//! result at the call site so one bad component never aborts the batch.
//!
//! Implementations are selected via the static registry below, not
//! runtime type inspection — new analyzers are added by registering them.

pub mod fundamental;
pub mod machine_learning;
pub mod psychology;
pub mod quantum;
pub mod sentiment;
pub mod technical;

use tracing::warn;

use crate::types::{AnalyzerResult, PriceSeries, ScoutError};

/// Abstraction over signal-producing analyzers.
///
/// Implementors must be total for well-formed input: prefer returning a
/// Neutral result over `Err` whenever an opinion simply cannot be formed.
pub trait Analyzer: Send + Sync {
    /// Stable identifier, matching the weight table in config.
    fn id(&self) -> &'static str;

    /// Produce a directional opinion for the series.
    fn analyze(&self, series: &PriceSeries) -> Result<AnalyzerResult, ScoutError>;
}

/// Static registry of analyzers, run in registration order.
pub struct AnalyzerRegistry {
    analyzers: Vec<Box<dyn Analyzer>>,
    /// Confidence multiplier applied when the series is synthetic.
    synthetic_confidence_discount: f64,
}

impl AnalyzerRegistry {
    pub fn new(synthetic_confidence_discount: f64) -> Self {
        Self {
            analyzers: Vec::new(),
            synthetic_confidence_discount,
        }
    }

    /// Registry with the full default analyzer set.
    pub fn with_default_set(synthetic_confidence_discount: f64) -> Self {
        let mut registry = Self::new(synthetic_confidence_discount);
        registry.register(Box::new(technical::TechnicalAnalyzer));
        registry.register(Box::new(fundamental::FundamentalAnalyzer));
        registry.register(Box::new(sentiment::SentimentAnalyzer));
        registry.register(Box::new(machine_learning::MomentumModelAnalyzer));
        registry.register(Box::new(quantum::QuantumAnalyzer));
        registry.register(Box::new(psychology::PsychologyAnalyzer));
        registry
    }

    pub fn register(&mut self, analyzer: Box<dyn Analyzer>) {
        self.analyzers.push(analyzer);
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Run every registered analyzer against the series.
    ///
    /// An `Err` from any analyzer is caught here and replaced with that
    /// analyzer's Neutral zero-confidence stand-in. When the series is
    /// synthetic, every confidence is multiplied by the configured
    /// discount so downstream consumers weigh the opinions accordingly.
    pub fn run_all(&self, series: &PriceSeries) -> Vec<AnalyzerResult> {
        self.analyzers
            .iter()
            .map(|analyzer| {
                let mut result = match analyzer.analyze(series) {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(
                            analyzer = analyzer.id(),
                            symbol = %series.symbol,
                            error = %e,
                            "Analyzer failed — substituting neutral result"
                        );
                        AnalyzerResult::neutral(analyzer.id())
                    }
                };
                if series.is_synthetic() {
                    result.confidence *= self.synthetic_confidence_discount;
                }
                result
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Shared series arithmetic
// ---------------------------------------------------------------------------

/// Simple moving average over the last `n` values. None if fewer exist.
pub(crate) fn sma(values: &[f64], n: usize) -> Option<f64> {
    if n == 0 || values.len() < n {
        return None;
    }
    let tail = &values[values.len() - n..];
    Some(tail.iter().sum::<f64>() / n as f64)
}

/// Bar-over-bar simple returns.
pub(crate) fn simple_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------
