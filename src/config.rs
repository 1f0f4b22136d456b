//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys, bot tokens) are referenced by env-var name in the
//! config and resolved at runtime via `std::env::var`.
//!
//! Validation runs once at load time and is the only fatal error path in
//! the system: a malformed weight table or nonsensical threshold refuses
//! to start, everything after startup is instrument-local.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;

use crate::types::ScoutError;

/// Tolerance when checking that analyzer weights sum to 1.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-3;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub scanner: ScannerConfig,
    pub consensus: ConsensusSettings,
    pub strategy: StrategySettings,
    pub risk: RiskSettings,
    pub guard: GuardSettings,
    pub data: DataConfig,
    pub alerts: AlertsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScannerConfig {
    pub name: String,
    pub scan_interval_secs: u64,
    /// Instrument universe scanned each cycle.
    pub universe: Vec<String>,
    /// Bars of history requested per instrument.
    pub lookback_days: usize,
    /// Maximum instrument pipelines in flight at once.
    pub max_concurrency: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConsensusSettings {
    /// Analyzer id → base weight. Must sum to 1.
    pub weights: HashMap<String, f64>,
    /// Direction score above which the consensus is bullish.
    #[serde(default = "default_direction_threshold")]
    pub bullish_threshold: f64,
    /// Direction score below whose negation the consensus is bearish.
    #[serde(default = "default_direction_threshold")]
    pub bearish_threshold: f64,
    /// Confidence multiplier applied when the series is synthetic.
    #[serde(default = "default_synthetic_discount")]
    pub synthetic_confidence_discount: f64,
}

fn default_direction_threshold() -> f64 {
    0.05
}

fn default_synthetic_discount() -> f64 {
    0.5
}

#[derive(Debug, Deserialize, Clone)]
pub struct StrategySettings {
    /// Minimum final probability (0–100) before any strategy is selected.
    pub min_probability: f64,
    /// Out-of-the-money strike offset as a fraction of spot (0.04 = 4%).
    pub otm_percentage: f64,
    pub expiry_days_min: i64,
    pub expiry_days_max: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RiskSettings {
    /// Take-profit distance as a fraction of entry price.
    pub tp_pct: f64,
    /// Stop-loss distance as a fraction of entry price.
    pub sl_pct: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GuardSettings {
    /// Cool-down window during which a repeated (symbol, direction,
    /// strategy) signal is suppressed.
    pub duplicate_cooldown_minutes: i64,
    /// Where the ledger is persisted between runs.
    #[serde(default)]
    pub ledger_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    /// Providers in priority order — list position IS the priority.
    pub providers: Vec<ProviderConfig>,
    /// Per-call timeout applied to every provider attempt.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
    /// Consecutive failures before a provider enters cooldown.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// First cooldown duration; doubles per further failure.
    #[serde(default = "default_base_cooldown")]
    pub base_cooldown_secs: u64,
    /// Cap on the exponential cooldown.
    #[serde(default = "default_max_cooldown")]
    pub max_cooldown_secs: u64,
}

fn default_call_timeout() -> u64 {
    10
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_base_cooldown() -> u64 {
    60
}

fn default_max_cooldown() -> u64 {
    3600
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Provider identifier: "yahoo" | "alphavantage"
    pub name: String,
    pub enabled: bool,
    /// Env-var name holding the API key, for keyed providers.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Rate gate: calls allowed in any sliding 60-second window.
    pub max_calls_per_minute: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertsConfig {
    pub telegram_bot_token_env: Option<String>,
    pub telegram_chat_id_env: Option<String>,
}

impl AppConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration. Called at load time, before any scan;
    /// the only fatal error path in the system.
    pub fn validate(&self) -> Result<(), ScoutError> {
        let weight_sum: f64 = self.consensus.weights.values().sum();
        if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ScoutError::Aggregation(format!(
                "analyzer weights must sum to 1.0, got {weight_sum:.4}"
            )));
        }
        if let Some((id, w)) = self.consensus.weights.iter().find(|(_, w)| **w < 0.0) {
            return Err(ScoutError::Aggregation(format!(
                "analyzer weight for '{id}' is negative ({w})"
            )));
        }
        if self.consensus.bullish_threshold < 0.0 || self.consensus.bearish_threshold < 0.0 {
            return Err(ScoutError::Config(
                "direction thresholds must be non-negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.consensus.synthetic_confidence_discount) {
            return Err(ScoutError::Config(
                "synthetic_confidence_discount must be in [0, 1]".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.strategy.min_probability) {
            return Err(ScoutError::Config(
                "min_probability must be in [0, 100]".to_string(),
            ));
        }
        if self.strategy.otm_percentage <= 0.0 || self.strategy.otm_percentage >= 1.0 {
            return Err(ScoutError::Config(
                "otm_percentage must be in (0, 1)".to_string(),
            ));
        }
        if self.strategy.expiry_days_min < 1
            || self.strategy.expiry_days_max < self.strategy.expiry_days_min
        {
            return Err(ScoutError::Config(
                "expiry window must satisfy 1 <= min <= max".to_string(),
            ));
        }
        if self.risk.tp_pct <= 0.0 || self.risk.sl_pct <= 0.0 {
            return Err(ScoutError::Config(
                "tp_pct and sl_pct must be positive".to_string(),
            ));
        }
        if self.guard.duplicate_cooldown_minutes < 1 {
            return Err(ScoutError::Config(
                "duplicate_cooldown_minutes must be at least 1".to_string(),
            ));
        }
        if self.scanner.max_concurrency == 0 {
            return Err(ScoutError::Config(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.scanner.universe.is_empty() {
            return Err(ScoutError::Config(
                "instrument universe is empty".to_string(),
            ));
        }
        // All-disabled is legal (the controller synthesizes everything);
        // zero providers declared at all is a config mistake.
        if self.data.providers.is_empty() {
            return Err(ScoutError::Config(
                "no data providers declared".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
