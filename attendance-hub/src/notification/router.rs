//! Notification router.
//!
//! Resolves the effective channel set for every recipient of an event and
//! dispatches to the channel senders. Channel failures are captured per
//! channel and never abort the rest of the route; there is no synchronous
//! retry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::channels::{ChannelSender, OutboundMessage, Recipient};
use super::events::{ChannelType, NotificationEvent};
use super::preferences::{NotificationPreferences, PreferenceStore};
use super::templates::{self, TemplateContext};
use crate::Result;
use crate::database::models::InAppNotificationDbModel;
use crate::database::repositories::{InAppNotificationRepository, UserRepository};
use crate::database::time::{datetime_to_ms, now_ms};
use crate::utils::with_timeout;

/// Router configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRouterConfig {
    /// Upper bound for a single channel send, in milliseconds.
    pub channel_timeout_ms: u64,
    /// Upper bound for preference and directory lookups, in milliseconds.
    pub store_timeout_ms: u64,
    pub templates: TemplateContext,
}

impl Default for NotificationRouterConfig {
    fn default() -> Self {
        Self {
            channel_timeout_ms: 10_000,
            store_timeout_ms: 5_000,
            templates: TemplateContext::default(),
        }
    }
}

impl NotificationRouterConfig {
    fn channel_timeout(&self) -> Duration {
        Duration::from_millis(self.channel_timeout_ms)
    }

    fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Where a delivery result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryRoute {
    Channel(ChannelType),
    /// The event was deferred and persisted for later dispatch.
    Scheduled,
}

impl fmt::Display for DeliveryRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(channel) => write!(f, "{}", channel),
            Self::Scheduled => write!(f, "scheduled"),
        }
    }
}

/// Result of one channel attempt for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDelivery {
    pub route: DeliveryRoute,
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl ChannelDelivery {
    fn delivered(route: DeliveryRoute, message_id: Option<String>) -> Self {
        Self {
            route,
            success: true,
            message_id,
            error: None,
            attempted_at: Utc::now(),
        }
    }

    fn failed(route: DeliveryRoute, error: impl Into<String>) -> Self {
        Self {
            route,
            success: false,
            message_id: None,
            error: Some(error.into()),
            attempted_at: Utc::now(),
        }
    }
}

/// All channel results for one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDelivery {
    pub user_id: String,
    /// At least one channel succeeded.
    pub success: bool,
    pub deliveries: Vec<ChannelDelivery>,
}

impl UserDelivery {
    fn from_deliveries(user_id: String, deliveries: Vec<ChannelDelivery>) -> Self {
        Self {
            success: deliveries.iter().any(|d| d.success),
            user_id,
            deliveries,
        }
    }

    /// Channels that delivered successfully, in attempt order.
    pub fn delivered_channels(&self) -> Vec<ChannelType> {
        self.deliveries
            .iter()
            .filter(|d| d.success)
            .filter_map(|d| match d.route {
                DeliveryRoute::Channel(channel) => Some(channel),
                DeliveryRoute::Scheduled => None,
            })
            .collect()
    }

    pub fn delivery(&self, channel: ChannelType) -> Option<&ChannelDelivery> {
        self.deliveries
            .iter()
            .find(|d| d.route == DeliveryRoute::Channel(channel))
    }
}

/// Aggregated result of routing one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOutcome {
    pub event_id: String,
    /// At least one user succeeded.
    pub success: bool,
    pub users: Vec<UserDelivery>,
}

impl RouteOutcome {
    fn from_users(event_id: String, users: Vec<UserDelivery>) -> Self {
        Self {
            success: users.iter().any(|u| u.success),
            event_id,
            users,
        }
    }

    pub fn for_user(&self, user_id: &str) -> Option<&UserDelivery> {
        self.users.iter().find(|u| u.user_id == user_id)
    }
}

/// Compute the channels an event should use for one user at `now`.
///
/// An explicit channel list on the event is used verbatim; otherwise the
/// category preferences decide. `in_app` is always included and, inside quiet
/// hours, is the only channel kept for non-urgent events.
pub fn resolve_channels(
    preferences: &NotificationPreferences,
    event: &NotificationEvent,
    now: DateTime<Utc>,
) -> Vec<ChannelType> {
    let mut channels: Vec<ChannelType> = match &event.channels {
        Some(explicit) => {
            let mut unique = Vec::with_capacity(explicit.len());
            for channel in explicit {
                if !unique.contains(channel) {
                    unique.push(*channel);
                }
            }
            unique
        }
        None => preferences.channels_for(event.category, event.priority),
    };

    if !channels.contains(&ChannelType::InApp) {
        channels.insert(0, ChannelType::InApp);
    }

    if !event.priority.bypasses_quiet_hours() && preferences.in_quiet_hours(now) {
        channels.retain(|c| *c == ChannelType::InApp);
    }

    channels
}

/// Routes notification events to channel senders.
pub struct NotificationRouter {
    config: NotificationRouterConfig,
    preferences: Arc<PreferenceStore>,
    users: Arc<dyn UserRepository>,
    in_app_repo: Arc<dyn InAppNotificationRepository>,
    senders: HashMap<ChannelType, Arc<dyn ChannelSender>>,
}

impl NotificationRouter {
    pub fn new(
        config: NotificationRouterConfig,
        preferences: Arc<PreferenceStore>,
        users: Arc<dyn UserRepository>,
        in_app_repo: Arc<dyn InAppNotificationRepository>,
    ) -> Self {
        Self {
            config,
            preferences,
            users,
            in_app_repo,
            senders: HashMap::new(),
        }
    }

    /// Register the sender for its channel, replacing any previous one.
    pub fn with_sender(mut self, sender: Arc<dyn ChannelSender>) -> Self {
        self.senders.insert(sender.channel_type(), sender);
        self
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    pub fn registered_channels(&self) -> Vec<ChannelType> {
        let mut channels: Vec<ChannelType> = self.senders.keys().copied().collect();
        channels.sort();
        channels
    }

    /// Route an event to all of its recipients.
    pub async fn route(&self, event: &NotificationEvent) -> RouteOutcome {
        self.route_at(event, Utc::now()).await
    }

    /// Route an event as if the current instant were `now`.
    pub async fn route_at(&self, event: &NotificationEvent, now: DateTime<Utc>) -> RouteOutcome {
        let recipients = unique_recipients(&event.recipients);
        if recipients.is_empty() {
            warn!(event_id = %event.id, "Notification event has no recipients");
            return RouteOutcome::from_users(event.id.clone(), Vec::new());
        }

        let rendered = templates::render(event, &self.config.templates);
        let message = OutboundMessage {
            event_id: event.id.clone(),
            category: event.category,
            priority: event.priority,
            data: serde_json::to_value(&event.payload).unwrap_or(serde_json::Value::Null),
            content: rendered,
        };

        let message = &message;
        let deferred = event.is_deferred(now);
        let users = join_all(recipients.iter().map(|user_id| async move {
            if deferred {
                self.defer_for_user(user_id, event, message).await
            } else {
                self.deliver_to_user(user_id, event, message, now).await
            }
        }))
        .await;

        let outcome = RouteOutcome::from_users(event.id.clone(), users);
        if outcome.success {
            info!(
                event_id = %event.id,
                category = %event.category,
                priority = %event.priority,
                users = outcome.users.len(),
                "Notification routed"
            );
        } else {
            error!(
                event_id = %event.id,
                category = %event.category,
                users = outcome.users.len(),
                "Notification delivery failed for every recipient"
            );
        }
        outcome
    }

    async fn deliver_to_user(
        &self,
        user_id: &str,
        event: &NotificationEvent,
        message: &OutboundMessage,
        now: DateTime<Utc>,
    ) -> UserDelivery {
        let preferences = self.load_preferences(user_id).await;
        let channels = resolve_channels(&preferences, event, now);
        debug!(user_id, event_id = %event.id, ?channels, "Resolved notification channels");

        let recipient = self.load_recipient(user_id).await;
        let deliveries = join_all(
            channels
                .iter()
                .map(|channel| self.send_on(*channel, &recipient, message)),
        )
        .await;

        for delivery in deliveries.iter().filter(|d| !d.success) {
            warn!(
                user_id,
                event_id = %event.id,
                channel = %delivery.route,
                error = delivery.error.as_deref().unwrap_or_default(),
                "Channel delivery failed"
            );
        }

        UserDelivery::from_deliveries(user_id.to_string(), deliveries)
    }

    async fn send_on(
        &self,
        channel: ChannelType,
        recipient: &Recipient,
        message: &OutboundMessage,
    ) -> ChannelDelivery {
        let route = DeliveryRoute::Channel(channel);
        let Some(sender) = self.senders.get(&channel) else {
            return ChannelDelivery::failed(route, format!("no sender registered for {}", channel));
        };
        if !sender.is_enabled() {
            return ChannelDelivery::failed(route, format!("{} channel is not configured", channel));
        }

        let operation = format!("send via {}", channel);
        match with_timeout(
            self.config.channel_timeout(),
            &operation,
            sender.send(recipient, message),
        )
        .await
        {
            Ok(receipt) => ChannelDelivery::delivered(route, receipt.message_id),
            Err(e) => ChannelDelivery::failed(route, e.to_string()),
        }
    }

    /// Persist a deferred marker carrying the whole event for the external drain.
    async fn defer_for_user(
        &self,
        user_id: &str,
        event: &NotificationEvent,
        message: &OutboundMessage,
    ) -> UserDelivery {
        let result = self.persist_deferred(user_id, event, message).await;
        let delivery = match result {
            Ok(id) => {
                debug!(user_id, event_id = %event.id, "Notification deferred");
                ChannelDelivery::delivered(DeliveryRoute::Scheduled, Some(id))
            }
            Err(e) => {
                warn!(user_id, event_id = %event.id, error = %e, "Failed to persist deferred notification");
                ChannelDelivery::failed(DeliveryRoute::Scheduled, e.to_string())
            }
        };
        UserDelivery::from_deliveries(user_id.to_string(), vec![delivery])
    }

    async fn persist_deferred(
        &self,
        user_id: &str,
        event: &NotificationEvent,
        message: &OutboundMessage,
    ) -> Result<String> {
        let mut single = event.clone();
        single.recipients = vec![user_id.to_string()];

        let row = InAppNotificationDbModel {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            event_id: event.id.clone(),
            category: event.category.to_string(),
            priority: event.priority.to_string(),
            title: message.content.title.clone(),
            message: message.content.body.clone(),
            data: serde_json::to_string(&single)?,
            action_url: message.content.action_url.clone(),
            is_read: false,
            scheduled_for: event.scheduled_for.map(datetime_to_ms),
            dispatched_at: None,
            created_at: now_ms(),
            read_at: None,
        };

        with_timeout(
            self.config.store_timeout(),
            "persist deferred notification",
            self.in_app_repo.create_notification(&row),
        )
        .await?;
        Ok(row.id)
    }

    async fn load_preferences(&self, user_id: &str) -> NotificationPreferences {
        match with_timeout(
            self.config.store_timeout(),
            "load notification preferences",
            self.preferences.get_or_create(user_id),
        )
        .await
        {
            Ok(preferences) => preferences,
            Err(e) => {
                warn!(user_id, error = %e, "Falling back to default notification preferences");
                self.preferences.defaults().clone()
            }
        }
    }

    async fn load_recipient(&self, user_id: &str) -> Recipient {
        match with_timeout(
            self.config.store_timeout(),
            "load recipient",
            self.users.find_user(user_id),
        )
        .await
        {
            Ok(Some(user)) => Recipient::from(user),
            Ok(None) => {
                warn!(user_id, "Notification recipient not found in directory");
                Recipient::bare(user_id)
            }
            Err(e) => {
                warn!(user_id, error = %e, "Failed to load notification recipient");
                Recipient::bare(user_id)
            }
        }
    }
}

fn unique_recipients(recipients: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(recipients.len());
    for user_id in recipients {
        let user_id = user_id.trim();
        if !user_id.is_empty() && !unique.iter().any(|u| u == user_id) {
            unique.push(user_id.to_string());
        }
    }
    unique
}
