//! Notification channels.
//!
//! This module provides the senders the router dispatches to:
//! - Email (HTTP transactional mail API)
//! - SMS (HTTP gateway)
//! - In-app (persisted inbox entry)

mod email;
mod in_app;
mod sms;

pub use email::{EmailChannel, EmailConfig};
pub use in_app::InAppChannel;
pub use sms::{SmsChannel, SmsConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::events::{ChannelType, NotificationCategory, NotificationPriority};
use super::templates::RenderedMessage;
use crate::domain::User;
use crate::Result;

/// Who a message is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Recipient {
    /// A recipient known only by id; only in-app delivery can reach it.
    pub fn bare(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: None,
            email: None,
            phone: None,
        }
    }
}

impl From<User> for Recipient {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            name: Some(user.name),
            email: user.email.filter(|e| !e.trim().is_empty()),
            phone: user.phone.filter(|p| !p.trim().is_empty()),
        }
    }
}

/// A rendered message plus the event metadata senders may persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub event_id: String,
    pub category: NotificationCategory,
    pub priority: NotificationPriority,
    pub content: RenderedMessage,
    /// Serialized event payload.
    pub data: serde_json::Value,
}

/// Successful hand-off to a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub message_id: Option<String>,
}

/// Trait for notification channels.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// The channel this sender delivers on.
    fn channel_type(&self) -> ChannelType;

    /// Check if the channel is configured for delivery.
    fn is_enabled(&self) -> bool;

    /// Attempt delivery. Provider and addressing failures are returned as
    /// `Error::Delivery`.
    async fn send(&self, recipient: &Recipient, message: &OutboundMessage) -> Result<SendReceipt>;
}

/// Pull a provider message id out of a JSON response body.
pub(crate) fn extract_message_id(body: &serde_json::Value) -> Option<String> {
    ["id", "message_id", "messageId", "sid"]
        .iter()
        .find_map(|key| body.get(*key))
        .and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}
