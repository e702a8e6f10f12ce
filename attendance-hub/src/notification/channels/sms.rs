//! SMS notification channel using an HTTP gateway.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::{ChannelSender, OutboundMessage, Recipient, SendReceipt, extract_message_id};
use crate::notification::events::ChannelType;
use crate::{Error, Result};

/// SMS channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    /// Whether the channel is enabled.
    pub enabled: bool,
    /// Gateway send endpoint (JSON POST).
    pub api_url: String,
    /// Bearer token for the gateway.
    pub api_key: Option<String>,
    /// Alphanumeric sender id or originating number.
    pub sender_id: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    10
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: String::new(),
            api_key: None,
            sender_id: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

/// SMS notification channel.
pub struct SmsChannel {
    config: SmsConfig,
    client: Client,
}

impl SmsChannel {
    pub fn new(config: SmsConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self { config, client }
    }

    fn build_payload(&self, to: &str, message: &OutboundMessage) -> serde_json::Value {
        json!({
            "from": self.config.sender_id,
            "to": to,
            "message": message.content.sms_text,
            "reference": message.event_id,
        })
    }
}

/// Digits with an optional leading '+'.
fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };
    let digits: String = rest
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();
    if digits.len() < 7 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}{}", plus, digits))
}

#[async_trait]
impl ChannelSender for SmsChannel {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Sms
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled && !self.config.api_url.is_empty()
    }

    async fn send(&self, recipient: &Recipient, message: &OutboundMessage) -> Result<SendReceipt> {
        if !self.is_enabled() {
            return Err(Error::delivery("sms", "sms channel is not configured"));
        }

        let Some(to) = recipient.phone.as_deref().and_then(normalize_phone) else {
            return Err(Error::delivery(
                "sms",
                format!("user {} has no usable phone number", recipient.user_id),
            ));
        };

        let mut request = self
            .client
            .post(&self.config.api_url)
            .json(&self.build_payload(&to, message));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::delivery("sms", format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("SMS gateway failed: {} - {}", status, body);
            return Err(Error::delivery(
                "sms",
                format!("gateway returned {}: {}", status, body),
            ));
        }

        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let message_id = extract_message_id(&body);
        debug!(user_id = %recipient.user_id, message_id = ?message_id, "SMS notification sent");
        Ok(SendReceipt { message_id })
    }
}
