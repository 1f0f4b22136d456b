//! Failover controller for market data acquisition.
//!
//! Tries providers in priority order — the configured list order IS the
//! priority, so two providers can never tie. Each attempt runs under a
//! bounded timeout; failures increment that provider's consecutive
//! failure count, and past the threshold the provider enters an
//! exponentially growing cooldown (capped). A provider at its rate limit
//! is skipped without penalty — being busy is not being broken. When
//! every provider is unavailable the controller synthesizes a flagged
//! series instead of failing the pipeline.
//!
//! Health state and the rate window are the only mutable state here, one
//! mutex per provider so concurrent instrument pipelines only contend
//! when they actually target the same provider.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use super::{synthetic, PriceProvider};
use crate::types::PriceSeries;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Failure/cooldown policy shared by all providers.
#[derive(Debug, Clone)]
pub struct FailoverPolicy {
    /// Per-call timeout applied to every provider attempt.
    pub call_timeout: std::time::Duration,
    /// Consecutive failures before cooldown starts.
    pub failure_threshold: u32,
    /// First cooldown duration; doubles per additional failure.
    pub base_cooldown: Duration,
    /// Cap on the exponential cooldown.
    pub max_cooldown: Duration,
}

impl Default for FailoverPolicy {
    fn default() -> Self {
        Self {
            call_timeout: std::time::Duration::from_secs(10),
            failure_threshold: 3,
            base_cooldown: Duration::seconds(60),
            max_cooldown: Duration::seconds(3600),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-provider state
// ---------------------------------------------------------------------------

/// Health snapshot for one provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderHealth {
    pub consecutive_failures: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl ProviderHealth {
    /// Whether the provider may be called at `now` (not cooling down).
    fn available(&self, now: DateTime<Utc>) -> bool {
        match self.cooldown_until {
            Some(until) => now >= until,
            None => true,
        }
    }

    fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.cooldown_until = None;
    }

    fn record_failure(&mut self, now: DateTime<Utc>, policy: &FailoverPolicy) {
        self.consecutive_failures += 1;
        self.last_failure_at = Some(now);
        if self.consecutive_failures >= policy.failure_threshold {
            let exponent = self.consecutive_failures - policy.failure_threshold;
            let cooldown = policy
                .base_cooldown
                .checked_mul(1 << exponent.min(10))
                .unwrap_or(policy.max_cooldown)
                .min(policy.max_cooldown);
            self.cooldown_until = Some(now + cooldown);
        }
    }
}

/// Sliding-window rate gate: at most `limit` calls in any 60 seconds.
#[derive(Debug)]
struct RateGate {
    limit: u32,
    window: VecDeque<DateTime<Utc>>,
}

impl RateGate {
    fn new(limit: u32) -> Self {
        Self {
            limit,
            window: VecDeque::new(),
        }
    }

    /// Reserve a call slot at `now`. Returns false when over the limit.
    fn try_acquire(&mut self, now: DateTime<Utc>) -> bool {
        let cutoff = now - Duration::seconds(60);
        while self.window.front().is_some_and(|t| *t < cutoff) {
            self.window.pop_front();
        }
        if self.window.len() as u32 >= self.limit {
            return false;
        }
        self.window.push_back(now);
        true
    }
}

struct ProviderSlot {
    provider: Box<dyn PriceProvider>,
    state: Mutex<SlotState>,
}

struct SlotState {
    health: ProviderHealth,
    rate: RateGate,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Outcome of one `fetch`: the series plus how many provider failures
/// were burned through on the way to it.
#[derive(Debug)]
pub struct Fetched {
    pub series: PriceSeries,
    pub failovers: u32,
}

/// Resilient multi-source price fetcher.
pub struct DataSourceController {
    slots: Vec<ProviderSlot>,
    policy: FailoverPolicy,
    /// Last live close per symbol — anchors the synthetic fallback.
    last_known_close: Mutex<HashMap<String, f64>>,
}

impl DataSourceController {
    pub fn new(policy: FailoverPolicy) -> Self {
        Self {
            slots: Vec::new(),
            policy,
            last_known_close: Mutex::new(HashMap::new()),
        }
    }

    /// Register a provider at the next (lowest) priority position.
    pub fn add_provider(&mut self, provider: Box<dyn PriceProvider>, max_calls_per_minute: u32) {
        self.slots.push(ProviderSlot {
            provider,
            state: Mutex::new(SlotState {
                health: ProviderHealth::default(),
                rate: RateGate::new(max_calls_per_minute),
            }),
        });
    }

    pub fn provider_count(&self) -> usize {
        self.slots.len()
    }

    /// Fetch a series, failing over through the priority list and
    /// falling back to a flagged synthetic series when everything is
    /// unavailable. Never fails the pipeline.
    pub async fn fetch(&self, symbol: &str, lookback_days: usize) -> Fetched {
        let mut failovers = 0u32;

        for slot in &self.slots {
            let name = slot.provider.name().to_string();
            let now = Utc::now();

            // Reserve under the lock, call outside it.
            {
                let mut state = slot
                    .state
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                if !state.health.available(now) {
                    debug!(provider = %name, symbol, "Provider in cooldown — skipping");
                    continue;
                }
                if !state.rate.try_acquire(now) {
                    debug!(provider = %name, symbol, "Provider at rate limit — skipping");
                    continue;
                }
            }

            let attempt = tokio::time::timeout(
                self.policy.call_timeout,
                slot.provider.fetch_series(symbol, lookback_days),
            )
            .await;

            let failure: String = match attempt {
                Ok(Ok(series)) if !series.is_empty() => {
                    {
                        let mut state = slot
                            .state
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                        state.health.record_success();
                    }
                    if let Some(close) = series.last_close() {
                        self.last_known_close
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .insert(symbol.to_string(), close);
                    }
                    debug!(provider = %name, symbol, bars = series.len(), "Fetch succeeded");
                    return Fetched { series, failovers };
                }
                Ok(Ok(_)) => "empty series".to_string(),
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("timeout after {:?}", self.policy.call_timeout),
            };

            failovers += 1;
            let now = Utc::now();
            let health = {
                let mut state = slot
                    .state
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                state.health.record_failure(now, &self.policy);
                state.health.clone()
            };
            warn!(
                provider = %name,
                symbol,
                error = %failure,
                consecutive_failures = health.consecutive_failures,
                cooldown_until = ?health.cooldown_until,
                "Provider failed — failing over"
            );
        }

        let anchor = self
            .last_known_close
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(symbol)
            .copied();
        info!(
            symbol,
            anchor = ?anchor,
            "All providers unavailable — generating synthetic series"
        );
        Fetched {
            series: synthetic::generate(symbol, lookback_days, anchor),
            failovers,
        }
    }

    /// Health snapshot per provider, in priority order.
    pub fn health_snapshot(&self) -> Vec<(String, ProviderHealth)> {
        self.slots
            .iter()
            .map(|slot| {
                let state = slot
                    .state
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                (slot.provider.name().to_string(), state.health.clone())
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
