//! Scan supervisor.
//!
//! Drives the per-instrument pipeline across the universe under bounded
//! concurrency. Every instrument's run resolves to an explicit
//! `ScanOutcome` — emitted, suppressed, no-signal, failed, or skipped —
//! so one bad symbol never aborts the batch. Cancellation stops
//! scheduling new pipelines and lets in-flight ones finish; the shared
//! health and ledger state stay consistent because their own mutexes
//! guard them, not the scan.

use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::analysis::AnalyzerRegistry;
use crate::consensus::ConsensusAggregator;
use crate::data::DataSourceController;
use crate::guard::DuplicateGuard;
use crate::strategy::{RiskManager, StrategySelector};
use crate::types::{Recommendation, ScanOutcome, ScanReport, ScoutError};

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Shared cancellation flag. Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation: no new instrument pipelines are scheduled.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

struct PipelineRun {
    outcome: ScanOutcome,
    failovers: u32,
    synthetic: bool,
}

pub struct ScanSupervisor {
    data: Arc<DataSourceController>,
    analyzers: Arc<AnalyzerRegistry>,
    guard: Arc<DuplicateGuard>,
    consensus: ConsensusAggregator,
    selector: StrategySelector,
    risk: RiskManager,
    lookback_days: usize,
    max_concurrency: usize,
    cancel: CancelFlag,
}

impl ScanSupervisor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        data: Arc<DataSourceController>,
        analyzers: Arc<AnalyzerRegistry>,
        guard: Arc<DuplicateGuard>,
        consensus: ConsensusAggregator,
        selector: StrategySelector,
        risk: RiskManager,
        lookback_days: usize,
        max_concurrency: usize,
    ) -> Self {
        Self {
            data,
            analyzers,
            guard,
            consensus,
            selector,
            risk,
            lookback_days,
            max_concurrency: max_concurrency.max(1),
            cancel: CancelFlag::new(),
        }
    }

    /// Handle for cancelling in-progress and future scans externally.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Scan the universe. Returns the admitted recommendations and a
    /// structured per-run summary.
    pub async fn scan(&self, symbols: &[String]) -> (Vec<Recommendation>, ScanReport) {
        let started = std::time::Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));

        let runs = join_all(symbols.iter().map(|symbol| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                if self.cancel.is_cancelled() {
                    return PipelineRun {
                        outcome: ScanOutcome::Skipped {
                            symbol: symbol.clone(),
                        },
                        failovers: 0,
                        synthetic: false,
                    };
                }
                // The semaphore is never closed; Err still maps to a
                // skip rather than a panic.
                let Ok(_permit) = semaphore.acquire().await else {
                    return PipelineRun {
                        outcome: ScanOutcome::Skipped {
                            symbol: symbol.clone(),
                        },
                        failovers: 0,
                        synthetic: false,
                    };
                };
                // Re-check after waiting for a slot: a cancel that
                // arrived meanwhile stops this pipeline from starting.
                if self.cancel.is_cancelled() {
                    return PipelineRun {
                        outcome: ScanOutcome::Skipped {
                            symbol: symbol.clone(),
                        },
                        failovers: 0,
                        synthetic: false,
                    };
                }
                self.run_pipeline(symbol).await
            }
        }))
        .await;

        let mut recommendations = Vec::new();
        let mut report = ScanReport::default();

        for run in runs {
            report.provider_failovers += run.failovers as usize;
            if run.synthetic {
                report.synthetic_series += 1;
            }
            match run.outcome {
                ScanOutcome::Emitted(recommendation) => {
                    report.attempted += 1;
                    report.emitted += 1;
                    recommendations.push(*recommendation);
                }
                ScanOutcome::Suppressed { .. } => {
                    report.attempted += 1;
                    report.suppressed += 1;
                }
                ScanOutcome::NoSignal { .. } => {
                    report.attempted += 1;
                    report.no_signal += 1;
                }
                ScanOutcome::Failed { symbol, error } => {
                    report.attempted += 1;
                    report.failed += 1;
                    warn!(symbol, error, "Instrument pipeline failed — continuing");
                }
                ScanOutcome::Skipped { .. } => {
                    report.skipped += 1;
                }
            }
        }
        report.duration_ms = started.elapsed().as_millis() as u64;

        info!(summary = %report, "Scan complete");
        (recommendations, report)
    }

    /// One instrument's fetch → analyze → reconcile → construct → admit
    /// pass. Never panics the batch: any error is folded into a
    /// `Failed` outcome here.
    async fn run_pipeline(&self, symbol: &str) -> PipelineRun {
        let fetched = self.data.fetch(symbol, self.lookback_days).await;
        let failovers = fetched.failovers;
        let synthetic = fetched.series.is_synthetic();

        let outcome = match self.evaluate(symbol, &fetched.series) {
            Ok(outcome) => outcome,
            Err(e) => ScanOutcome::Failed {
                symbol: symbol.to_string(),
                error: e.to_string(),
            },
        };

        PipelineRun {
            outcome,
            failovers,
            synthetic,
        }
    }

    /// The synchronous tail of the pipeline, separated so every error
    /// path funnels through one `Result`.
    fn evaluate(
        &self,
        symbol: &str,
        series: &crate::types::PriceSeries,
    ) -> Result<ScanOutcome, ScoutError> {
        let current_price = series.last_close().ok_or(ScoutError::InsufficientData {
            needed: 1,
            got: 0,
        })?;

        let results = self.analyzers.run_all(series);
        let signal = self.consensus.aggregate(symbol, &results);

        let Some(trade) = self.selector.select(&signal, current_price) else {
            return Ok(ScanOutcome::NoSignal {
                symbol: symbol.to_string(),
            });
        };

        let risk = self.risk.profile(
            trade.strategy,
            current_price,
            signal.final_probability,
            signal.consensus_strength,
        );

        if !self
            .guard
            .admit(symbol, signal.direction, trade.strategy)
        {
            return Ok(ScanOutcome::Suppressed {
                symbol: symbol.to_string(),
            });
        }

        Ok(ScanOutcome::Emitted(Box::new(Recommendation {
            signal,
            trade,
            risk,
            entry_price: current_price,
        })))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analyzer;
    use crate::config::{ConsensusSettings, RiskSettings, StrategySettings};
    use crate::data::{FailoverPolicy, MockPriceProvider};
    use crate::types::{AnalyzerResult, Direction, PriceBar, PriceSeries, Provenance};
    use anyhow::anyhow;
    use chrono::{Duration, TimeZone, Utc};

    struct FixedAnalyzer {
        id: &'static str,
        direction: Direction,
        probability: f64,
        confidence: f64,
    }

    impl Analyzer for FixedAnalyzer {
        fn id(&self) -> &'static str {
            self.id
        }

        fn analyze(&self, _series: &PriceSeries) -> Result<AnalyzerResult, ScoutError> {
            Ok(AnalyzerResult::new(
                self.id,
                self.direction,
                self.probability,
                self.confidence,
                serde_json::Value::Null,
            ))
        }
    }

    /// Reference three-analyzer setup:
    /// (BULLISH,70,85), (BULLISH,60,70), (NEUTRAL,50,40).
    fn scenario_registry() -> AnalyzerRegistry {
        let mut registry = AnalyzerRegistry::new(0.5);
        registry.register(Box::new(FixedAnalyzer {
            id: "a",
            direction: Direction::Bullish,
            probability: 70.0,
            confidence: 85.0,
        }));
        registry.register(Box::new(FixedAnalyzer {
            id: "b",
            direction: Direction::Bullish,
            probability: 60.0,
            confidence: 70.0,
        }));
        registry.register(Box::new(FixedAnalyzer {
            id: "c",
            direction: Direction::Neutral,
            probability: 50.0,
            confidence: 40.0,
        }));
        registry
    }

    fn equal_weights() -> ConsensusSettings {
        ConsensusSettings {
            weights: [("a", 1.0 / 3.0), ("b", 1.0 / 3.0), ("c", 1.0 / 3.0)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            bullish_threshold: 0.05,
            bearish_threshold: 0.05,
            synthetic_confidence_discount: 0.5,
        }
    }

    fn live_series(symbol: &str, close: f64) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let bars = (0..30)
            .map(|i| PriceBar {
                timestamp: start + Duration::days(i),
                open: close,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume: 1000.0,
            })
            .collect();
        PriceSeries::new(
            symbol,
            bars,
            Provenance::Live {
                provider: "mock".to_string(),
            },
        )
        .unwrap()
    }

    fn controller_with(provider: MockPriceProvider) -> Arc<DataSourceController> {
        let mut controller = DataSourceController::new(FailoverPolicy {
            call_timeout: std::time::Duration::from_millis(500),
            ..FailoverPolicy::default()
        });
        controller.add_provider(Box::new(provider), 10_000);
        Arc::new(controller)
    }

    fn ok_provider(close: f64) -> MockPriceProvider {
        let mut mock = MockPriceProvider::new();
        mock.expect_name().return_const("mock".to_string());
        mock.expect_fetch_series()
            .returning(move |symbol, _| Ok(live_series(symbol, close)));
        mock
    }

    fn failing_provider() -> MockPriceProvider {
        let mut mock = MockPriceProvider::new();
        mock.expect_name().return_const("mock".to_string());
        mock.expect_fetch_series()
            .returning(|_, _| Err(anyhow!("simulated outage")));
        mock
    }

    fn supervisor(data: Arc<DataSourceController>, registry: AnalyzerRegistry) -> ScanSupervisor {
        ScanSupervisor::new(
            data,
            Arc::new(registry),
            Arc::new(DuplicateGuard::new(Duration::minutes(60))),
            ConsensusAggregator::new(&equal_weights()),
            StrategySelector::new(&StrategySettings {
                min_probability: 55.0,
                otm_percentage: 0.04,
                expiry_days_min: 7,
                expiry_days_max: 14,
            }),
            RiskManager::new(&RiskSettings {
                tp_pct: 0.03,
                sl_pct: 0.025,
            }),
            30,
            4,
        )
    }

    fn universe(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_end_to_end_scenario_emits_long_call() {
        let sup = supervisor(controller_with(ok_provider(100.0)), scenario_registry());
        let (recommendations, report) = sup.scan(&universe(&["XYZ"])).await;

        assert_eq!(report.emitted, 1);
        let rec = &recommendations[0];
        assert_eq!(rec.signal.direction, Direction::Bullish);
        assert!((rec.signal.final_probability - 60.0).abs() < 1e-9);
        assert!((rec.signal.ecosystem_confidence - 65.0).abs() < 1e-9);
        assert_eq!(
            rec.trade.strategy,
            crate::types::OptionStrategy::LongCall
        );
        assert!((rec.trade.strike - 104.0).abs() < 1e-9);
        assert!((rec.risk.take_profit - 103.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_repeat_scan_suppressed_by_guard() {
        let sup = supervisor(controller_with(ok_provider(100.0)), scenario_registry());
        let (_, first) = sup.scan(&universe(&["XYZ"])).await;
        assert_eq!(first.emitted, 1);

        let (recommendations, second) = sup.scan(&universe(&["XYZ"])).await;
        assert!(recommendations.is_empty());
        assert_eq!(second.emitted, 0);
        assert_eq!(second.suppressed, 1);
    }

    #[tokio::test]
    async fn test_all_providers_down_pipeline_still_completes() {
        let sup = supervisor(controller_with(failing_provider()), scenario_registry());
        let (_, report) = sup.scan(&universe(&["XYZ"])).await;

        assert_eq!(report.synthetic_series, 1);
        assert_eq!(report.provider_failovers, 1);
        assert_eq!(report.failed, 0);
        // The fixed-analyzer scenario still clears thresholds on the
        // synthetic series (confidence discount halves confidences but
        // probability is untouched) — the pipeline must have run fully.
        assert_eq!(report.emitted + report.no_signal + report.suppressed, 1);
    }

    #[tokio::test]
    async fn test_synthetic_series_discounts_signal_confidence() {
        let live = supervisor(controller_with(ok_provider(100.0)), scenario_registry());
        let (live_recs, _) = live.scan(&universe(&["XYZ"])).await;

        let down = supervisor(controller_with(failing_provider()), scenario_registry());
        let (synth_recs, _) = down.scan(&universe(&["XYZ"])).await;

        assert!((live_recs[0].signal.ecosystem_confidence - 65.0).abs() < 1e-9);
        assert!((synth_recs[0].signal.ecosystem_confidence - 32.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_neutral_registry_yields_no_signal() {
        let mut registry = AnalyzerRegistry::new(0.5);
        for id in ["a", "b", "c"] {
            registry.register(Box::new(FixedAnalyzer {
                id,
                direction: Direction::Neutral,
                probability: 50.0,
                confidence: 50.0,
            }));
        }
        let sup = supervisor(controller_with(ok_provider(100.0)), registry);
        let (recommendations, report) = sup.scan(&universe(&["XYZ"])).await;
        assert!(recommendations.is_empty());
        assert_eq!(report.no_signal, 1);
    }

    #[tokio::test]
    async fn test_batch_outcomes_independent() {
        // Three symbols: all pipelines run, each classified on its own.
        let sup = supervisor(controller_with(ok_provider(100.0)), scenario_registry());
        let (recommendations, report) = sup.scan(&universe(&["AAA", "BBB", "CCC"])).await;
        assert_eq!(report.attempted, 3);
        assert_eq!(report.emitted, 3);
        assert_eq!(recommendations.len(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_scan_skips_everything() {
        let sup = supervisor(controller_with(ok_provider(100.0)), scenario_registry());
        sup.cancel_flag().cancel();

        let (recommendations, report) = sup.scan(&universe(&["AAA", "BBB"])).await;
        assert!(recommendations.is_empty());
        assert_eq!(report.skipped, 2);
        assert_eq!(report.attempted, 0);
    }
}
