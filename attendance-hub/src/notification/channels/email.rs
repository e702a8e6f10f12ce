//! Email notification channel using an HTTP transactional mail API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::{ChannelSender, OutboundMessage, Recipient, SendReceipt, extract_message_id};
use crate::notification::events::ChannelType;
use crate::{Error, Result};

/// Email channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Whether the channel is enabled.
    pub enabled: bool,
    /// Send endpoint of the mail API (JSON POST).
    pub api_url: String,
    /// Bearer token for the mail API.
    pub api_key: Option<String>,
    /// Sender email address.
    pub from_address: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    15
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: String::new(),
            api_key: None,
            from_address: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Email notification channel.
pub struct EmailChannel {
    config: EmailConfig,
    client: Client,
}

impl EmailChannel {
    /// Create a new Email channel.
    pub fn new(config: EmailConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self { config, client }
    }

    /// Build the JSON request body.
    fn build_payload(&self, to: &str, message: &OutboundMessage) -> serde_json::Value {
        json!({
            "from": self.config.from_address,
            "to": [to],
            "subject": message.content.email_subject,
            "text": message.content.email_text,
            "html": message.content.email_html,
            "tags": [
                { "name": "category", "value": message.category.to_string() },
                { "name": "priority", "value": message.priority.to_string() },
            ],
        })
    }
}

#[async_trait]
impl ChannelSender for EmailChannel {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Email
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled && !self.config.api_url.is_empty() && !self.config.from_address.is_empty()
    }

    async fn send(&self, recipient: &Recipient, message: &OutboundMessage) -> Result<SendReceipt> {
        if !self.is_enabled() {
            return Err(Error::delivery("email", "email channel is not configured"));
        }

        let Some(to) = recipient.email.as_deref() else {
            return Err(Error::delivery(
                "email",
                format!("user {} has no email address", recipient.user_id),
            ));
        };

        let mut request = self
            .client
            .post(&self.config.api_url)
            .json(&self.build_payload(to, message));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::delivery("email", format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Email API failed: {} - {}", status, body);
            return Err(Error::delivery(
                "email",
                format!("provider returned {}: {}", status, body),
            ));
        }

        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let message_id = extract_message_id(&body);
        debug!(
            user_id = %recipient.user_id,
            message_id = ?message_id,
            "Email notification sent: {}",
            message.event_id
        );
        Ok(SendReceipt { message_id })
    }
}
