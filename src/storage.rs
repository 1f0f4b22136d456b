//! Persistence layer.
//!
//! Saves and loads the duplicate-guard ledger to/from a JSON file so
//! cool-down windows survive process restarts. JSON is sufficient here —
//! the ledger is small (one record per recently alerted key) and written
//! once per scan cycle.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::types::SignalRecord;

/// Default ledger file path.
const DEFAULT_LEDGER_FILE: &str = "scout_ledger.json";

/// Save ledger records to a JSON file.
pub fn save_ledger(records: &[SignalRecord], path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_LEDGER_FILE);
    let json =
        serde_json::to_string_pretty(records).context("Failed to serialise signal ledger")?;

    std::fs::write(path, &json).context(format!("Failed to write ledger to {path}"))?;

    debug!(path, records = records.len(), "Ledger saved");
    Ok(())
}

/// Load ledger records from a JSON file.
/// Returns None if the file doesn't exist (fresh start).
pub fn load_ledger(path: Option<&str>) -> Result<Option<Vec<SignalRecord>>> {
    let path = path.unwrap_or(DEFAULT_LEDGER_FILE);

    if !Path::new(path).exists() {
        info!(path, "No saved ledger found, starting fresh");
        return Ok(None);
    }

    let json =
        std::fs::read_to_string(path).context(format!("Failed to read ledger from {path}"))?;

    let records: Vec<SignalRecord> =
        serde_json::from_str(&json).context(format!("Failed to parse ledger from {path}"))?;

    info!(path, records = records.len(), "Ledger loaded from disk");

    Ok(Some(records))
}

/// Delete the ledger file (for testing or reset).
pub fn delete_ledger(path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_LEDGER_FILE);
    if Path::new(path).exists() {
        std::fs::remove_file(path).context(format!("Failed to delete ledger file {path}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
