//! ALPHA-SCOUT — Autonomous Multi-Analyzer Options Signal Scanner
//!
//! Entry point. Loads configuration, initialises structured logging,
//! restores the signal ledger from disk (or starts fresh), and runs the
//! periodic scan→reconcile→alert loop with graceful shutdown.

use anyhow::Result;
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use alpha_scout::analysis::AnalyzerRegistry;
use alpha_scout::config::{self, AppConfig};
use alpha_scout::consensus::ConsensusAggregator;
use alpha_scout::data::alphavantage::AlphaVantageProvider;
use alpha_scout::data::yahoo::YahooProvider;
use alpha_scout::data::{DataSourceController, FailoverPolicy};
use alpha_scout::engine::ScanSupervisor;
use alpha_scout::guard::DuplicateGuard;
use alpha_scout::notify::telegram::TelegramNotifier;
use alpha_scout::notify::{LogNotifier, Notifier};
use alpha_scout::storage;
use alpha_scout::strategy::{RiskManager, StrategySelector};

const BANNER: &str = r#"
    _    _     ____  _   _    _        ____   ____ ___  _   _ _____
   / \  | |   |  _ \| | | |  / \      / ___| / ___/ _ \| | | |_   _|
  / _ \ | |   | |_) | |_| | / _ \     \___ \| |  | | | | | | | | |
 / ___ \| |___|  __/|  _  |/ ___ \     ___) | |__| |_| | |_| | | |
/_/   \_\_____|_|   |_| |_/_/   \_\   |____/ \____\___/ \___/  |_|

  Multi-Analyzer Consensus Options Scanner
  v0.1.0 — Autonomous Agent
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML — weight-table and threshold
    // validation happens here, before anything else runs.
    let cfg = config::AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        scanner_name = %cfg.scanner.name,
        scan_interval_secs = cfg.scanner.scan_interval_secs,
        universe = cfg.scanner.universe.len(),
        max_concurrency = cfg.scanner.max_concurrency,
        "ALPHA-SCOUT starting up"
    );

    // -- Restore or create the signal ledger ------------------------------

    let guard = Arc::new(DuplicateGuard::new(ChronoDuration::minutes(
        cfg.guard.duplicate_cooldown_minutes,
    )));
    let ledger_path = cfg.guard.ledger_file.clone();
    match storage::load_ledger(ledger_path.as_deref())? {
        Some(records) => {
            guard.restore(records);
            info!(live_records = guard.len(), "Resumed signal ledger");
        }
        None => info!("Fresh signal ledger"),
    }

    // -- Initialise components --------------------------------------------

    let supervisor = build_supervisor(&cfg, Arc::clone(&guard))?;
    let notifier = build_notifier(&cfg)?;

    // -- Main loop ---------------------------------------------------------

    let scan_interval = Duration::from_secs(cfg.scanner.scan_interval_secs);
    let mut interval = tokio::time::interval(scan_interval);
    let cancel = supervisor.cancel_flag();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.scanner.scan_interval_secs,
        channel = notifier.name(),
        "Entering main loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let (recommendations, report) = supervisor.scan(&cfg.scanner.universe).await;
                info!(summary = %report, "Cycle complete");

                for recommendation in &recommendations {
                    match notifier.deliver(recommendation).await {
                        Ok(true) => {
                            info!(symbol = %recommendation.signal.symbol, "Alert delivered");
                        }
                        Ok(false) => {
                            warn!(symbol = %recommendation.signal.symbol, "Alert rejected by channel");
                        }
                        Err(e) => {
                            // Delivery failure is non-fatal and does not
                            // affect guard admission.
                            error!(symbol = %recommendation.signal.symbol, error = %e, "Alert delivery failed");
                        }
                    }
                }

                if let Err(e) = storage::save_ledger(&guard.snapshot(), ledger_path.as_deref()) {
                    error!(error = %e, "Failed to save signal ledger");
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                cancel.cancel();
                break;
            }
        }
    }

    // Save final ledger state
    storage::save_ledger(&guard.snapshot(), ledger_path.as_deref())?;
    info!(live_records = guard.len(), "ALPHA-SCOUT shut down cleanly.");

    Ok(())
}

/// Wire the data controller, analyzer registry, and strategy layers into
/// a supervisor per config.
fn build_supervisor(cfg: &AppConfig, guard: Arc<DuplicateGuard>) -> Result<ScanSupervisor> {
    let mut controller = DataSourceController::new(FailoverPolicy {
        call_timeout: Duration::from_secs(cfg.data.call_timeout_secs),
        failure_threshold: cfg.data.failure_threshold,
        base_cooldown: ChronoDuration::seconds(cfg.data.base_cooldown_secs as i64),
        max_cooldown: ChronoDuration::seconds(cfg.data.max_cooldown_secs as i64),
    });

    for provider_cfg in cfg.data.providers.iter().filter(|p| p.enabled) {
        match provider_cfg.name.as_str() {
            "yahoo" => {
                controller.add_provider(
                    Box::new(YahooProvider::new()?),
                    provider_cfg.max_calls_per_minute,
                );
            }
            "alphavantage" => {
                let Some(key_env) = provider_cfg.api_key_env.as_deref() else {
                    warn!("alphavantage enabled without api_key_env — skipping");
                    continue;
                };
                match AppConfig::resolve_env(key_env) {
                    Ok(api_key) => controller.add_provider(
                        Box::new(AlphaVantageProvider::new(api_key)?),
                        provider_cfg.max_calls_per_minute,
                    ),
                    Err(e) => warn!(error = %e, "alphavantage key unavailable — skipping"),
                }
            }
            other => warn!(provider = other, "Unknown provider in config — skipping"),
        }
    }
    info!(
        providers = controller.provider_count(),
        "Data providers registered (priority = config order)"
    );

    let registry = AnalyzerRegistry::with_default_set(cfg.consensus.synthetic_confidence_discount);

    Ok(ScanSupervisor::new(
        Arc::new(controller),
        Arc::new(registry),
        guard,
        ConsensusAggregator::new(&cfg.consensus),
        StrategySelector::new(&cfg.strategy),
        RiskManager::new(&cfg.risk),
        cfg.scanner.lookback_days,
        cfg.scanner.max_concurrency,
    ))
}

/// Telegram when the env vars resolve, log-only otherwise.
fn build_notifier(cfg: &AppConfig) -> Result<Box<dyn Notifier>> {
    let token = cfg
        .alerts
        .telegram_bot_token_env
        .as_deref()
        .and_then(|env| std::env::var(env).ok());
    let chat_id = cfg
        .alerts
        .telegram_chat_id_env
        .as_deref()
        .and_then(|env| std::env::var(env).ok());

    match (token, chat_id) {
        (Some(token), Some(chat_id)) => {
            info!("Using Telegram alert channel");
            Ok(Box::new(TelegramNotifier::new(token, chat_id)?))
        }
        _ => {
            warn!("No Telegram credentials configured — running in log-only mode");
            Ok(Box::new(LogNotifier))
        }
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("alpha_scout=info"));

    let json_logging = std::env::var("SCOUT_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
