//! In-app notification channel backed by the notification inbox table.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ChannelSender, OutboundMessage, Recipient, SendReceipt};
use crate::database::models::InAppNotificationDbModel;
use crate::database::repositories::InAppNotificationRepository;
use crate::database::time::now_ms;
use crate::notification::events::ChannelType;
use crate::{Error, Result};

pub struct InAppChannel {
    repo: Arc<dyn InAppNotificationRepository>,
}

impl InAppChannel {
    pub fn new(repo: Arc<dyn InAppNotificationRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl ChannelSender for InAppChannel {
    fn channel_type(&self) -> ChannelType {
        ChannelType::InApp
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn send(&self, recipient: &Recipient, message: &OutboundMessage) -> Result<SendReceipt> {
        let row = InAppNotificationDbModel {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: recipient.user_id.clone(),
            event_id: message.event_id.clone(),
            category: message.category.to_string(),
            priority: message.priority.to_string(),
            title: message.content.title.clone(),
            message: message.content.body.clone(),
            data: message.data.to_string(),
            action_url: message.content.action_url.clone(),
            is_read: false,
            scheduled_for: None,
            dispatched_at: None,
            created_at: now_ms(),
            read_at: None,
        };

        self.repo
            .create_notification(&row)
            .await
            .map_err(|e| Error::delivery("in_app", e.to_string()))?;

        Ok(SendReceipt {
            message_id: Some(row.id),
        })
    }
}
