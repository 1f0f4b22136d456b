//! Telegram alert channel.
//!
//! Sends formatted signal alerts through the Bot API. The bot token and
//! chat id come from the environment (names configured in TOML).
//!
//! API: `https://api.telegram.org/bot{token}/sendMessage`
//! Auth: Bot token in the URL path.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::Notifier;
use crate::types::{OptionStrategy, Recommendation};

const API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    http: Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent("ALPHA-SCOUT/0.1.0")
            .build()
            .context("Failed to build Telegram HTTP client")?;
        Ok(Self {
            http,
            bot_token,
            chat_id,
        })
    }

    /// Render the alert text. Markdown, matching the layout traders see
    /// on their phone: headline, construction, exits, component recap.
    fn format_message(recommendation: &Recommendation) -> String {
        let signal = &recommendation.signal;
        let trade = &recommendation.trade;
        let risk = &recommendation.risk;

        let headline = match trade.strategy {
            OptionStrategy::LongCall => "📈 LONG CALL",
            OptionStrategy::LongPut => "📉 LONG PUT",
        };

        let mut lines = vec![
            format!("{headline} — *{}*", signal.symbol),
            format!(
                "🎯 Probability: {:.1}% | Confidence: {:.1}% | Consensus: {:.0}%",
                signal.final_probability,
                signal.ecosystem_confidence,
                signal.consensus_strength * 100.0,
            ),
            format!(
                "💵 Entry: ${:.2} | Strike: ${:.2} | Expiry: {}",
                recommendation.entry_price, trade.strike, trade.expiry_date,
            ),
            format!(
                "💰 Take Profit: ${:.2} | 🛑 Stop Loss: ${:.2} | Risk: {}",
                risk.take_profit, risk.stop_loss, risk.tier,
            ),
            format!("📊 Expected Return: {:.1}%", trade.expected_return),
        ];

        if !signal.components.is_empty() {
            lines.push("—".to_string());
            for component in &signal.components {
                lines.push(format!(
                    "  {} {} ({:.0}%, conf {:.0}%)",
                    component.analyzer_id,
                    component.direction,
                    component.probability,
                    component.confidence,
                ));
            }
        }

        lines.join("\n")
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, recommendation: &Recommendation) -> Result<bool> {
        let url = format!("{API_BASE}/bot{}/sendMessage", self.bot_token);
        let body = json!({
            "chat_id": self.chat_id,
            "text": Self::format_message(recommendation),
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });

        let response: SendMessageResponse = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Telegram request failed")?
            .error_for_status()
            .context("Telegram returned an error status")?
            .json()
            .await
            .context("Failed to parse Telegram response")?;

        if !response.ok {
            debug!(
                description = ?response.description,
                "Telegram rejected the message"
            );
        }
        Ok(response.ok)
    }
}
