//! Duplicate-suppression guard.
//!
//! Ledger of recently emitted signals keyed by (symbol, direction,
//! strategy). A candidate whose key was emitted within the cool-down
//! window is suppressed; otherwise it is admitted and the ledger record
//! refreshed. Records past the window can never suppress again, so they
//! are evicted lazily when their key is next looked up (and swept when
//! the ledger is snapshotted for persistence).
//!
//! This is the system's one cross-cycle mutable store. It owns its
//! mutex so `admit` is `&self` and safe across concurrent instrument
//! pipelines; every mutation goes through `admit`/`restore`. The
//! `*_at` variants take an explicit clock for deterministic tests.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use crate::types::{Direction, OptionStrategy, SignalRecord};

type LedgerKey = (String, Direction, OptionStrategy);

pub struct DuplicateGuard {
    cooldown: Duration,
    ledger: Mutex<HashMap<LedgerKey, DateTime<Utc>>>,
}

impl DuplicateGuard {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            ledger: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or suppress a candidate at an explicit instant.
    ///
    /// Returns true (and records the emission) when no same-key record
    /// exists within the cool-down window; false to suppress.
    pub fn admit_at(
        &self,
        symbol: &str,
        direction: Direction,
        strategy: OptionStrategy,
        now: DateTime<Utc>,
    ) -> bool {
        let key = (symbol.to_string(), direction, strategy);
        let mut ledger = self
            .ledger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(emitted_at) = ledger.get(&key) {
            if now - *emitted_at < self.cooldown {
                debug!(
                    symbol,
                    %direction,
                    %strategy,
                    emitted_at = %emitted_at,
                    "Duplicate signal suppressed"
                );
                return false;
            }
            // Expired — evict on lookup before re-admitting.
            ledger.remove(&key);
        }

        ledger.insert(key, now);
        true
    }

    /// Admit or suppress a candidate at the current instant.
    pub fn admit(&self, symbol: &str, direction: Direction, strategy: OptionStrategy) -> bool {
        self.admit_at(symbol, direction, strategy, Utc::now())
    }

    /// Live (non-expired) records, for persistence. Sweeps expired
    /// entries as a side effect.
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> Vec<SignalRecord> {
        let mut ledger = self
            .ledger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        ledger.retain(|_, emitted_at| now - *emitted_at < self.cooldown);
        let mut records: Vec<SignalRecord> = ledger
            .iter()
            .map(|((symbol, direction, strategy), emitted_at)| SignalRecord {
                symbol: symbol.clone(),
                direction: *direction,
                strategy: *strategy,
                emitted_at: *emitted_at,
            })
            .collect();
        records.sort_by(|a, b| (&a.symbol, a.emitted_at).cmp(&(&b.symbol, b.emitted_at)));
        records
    }

    pub fn snapshot(&self) -> Vec<SignalRecord> {
        self.snapshot_at(Utc::now())
    }

    /// Restore records (e.g. from disk), dropping those already expired.
    pub fn restore_at(&self, records: Vec<SignalRecord>, now: DateTime<Utc>) {
        let mut ledger = self
            .ledger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for record in records {
            if now - record.emitted_at < self.cooldown {
                ledger.insert(
                    (record.symbol, record.direction, record.strategy),
                    record.emitted_at,
                );
            }
        }
    }

    pub fn restore(&self, records: Vec<SignalRecord>) {
        self.restore_at(records, Utc::now())
    }

    pub fn len(&self) -> usize {
        self.ledger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
