//! Notification channel integration.
//!
//! Defines the `Notifier` trait — the boundary to the external alert
//! collaborator — and provides a Telegram implementation plus a log-only
//! sender for dry runs. Delivery failure is non-fatal everywhere: a
//! signal that could not be delivered still counts as generated and
//! still occupies its duplicate-guard slot.

pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::types::Recommendation;

/// Abstraction over alert delivery channels.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name for logging.
    fn name(&self) -> &str;

    /// Deliver one recommendation. Returns whether the channel accepted
    /// it; transport problems surface as `Err`.
    async fn deliver(&self, recommendation: &Recommendation) -> Result<bool>;
}

/// Log-only notifier used when no alert channel is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, recommendation: &Recommendation) -> Result<bool> {
        info!(recommendation = %recommendation, "Signal (dry-run, not delivered)");
        Ok(true)
    }
}
