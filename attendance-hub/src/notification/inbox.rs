//! In-app inbox queries and deferred-delivery lookup.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::events::{NotificationCategory, NotificationEvent, NotificationPriority};
use crate::database::models::InAppNotificationDbModel;
use crate::database::repositories::InAppNotificationRepository;
use crate::database::time::{datetime_to_ms, ms_to_datetime};
use crate::utils::with_timeout;
use crate::Result;

/// Default page size for inbox listings.
pub const DEFAULT_INBOX_LIMIT: i64 = 50;

/// A notification shown in a user's inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InAppNotification {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub category: Option<NotificationCategory>,
    pub priority: Option<NotificationPriority>,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
    pub action_url: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl From<InAppNotificationDbModel> for InAppNotification {
    fn from(row: InAppNotificationDbModel) -> Self {
        Self {
            category: row.category.parse().ok(),
            priority: row.priority.parse().ok(),
            data: serde_json::from_str(&row.data).unwrap_or(serde_json::Value::Null),
            created_at: ms_to_datetime(row.created_at),
            read_at: row.read_at.map(ms_to_datetime),
            id: row.id,
            user_id: row.user_id,
            event_id: row.event_id,
            title: row.title,
            message: row.message,
            action_url: row.action_url,
            is_read: row.is_read,
        }
    }
}

/// A deferred event whose time has come, addressed to a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueNotification {
    /// Id of the deferred marker; pass to `mark_dispatched` once re-routed.
    pub notification_id: String,
    pub event: NotificationEvent,
}

pub struct InboxService {
    repo: Arc<dyn InAppNotificationRepository>,
    store_timeout: Duration,
}

impl InboxService {
    pub fn new(repo: Arc<dyn InAppNotificationRepository>, store_timeout: Duration) -> Self {
        Self {
            repo,
            store_timeout,
        }
    }

    /// Newest first; deferred markers are never listed.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: Option<i64>,
    ) -> Result<Vec<InAppNotification>> {
        let limit = limit.unwrap_or(DEFAULT_INBOX_LIMIT).clamp(1, 500);
        let rows = with_timeout(
            self.store_timeout,
            "list inbox",
            self.repo.list_for_user(user_id, unread_only, limit),
        )
        .await?;
        Ok(rows.into_iter().map(InAppNotification::from).collect())
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<i64> {
        with_timeout(
            self.store_timeout,
            "count unread notifications",
            self.repo.unread_count(user_id),
        )
        .await
    }

    /// Returns `false` when the notification is unknown, belongs to someone
    /// else or was already read.
    pub async fn mark_read(&self, id: &str, user_id: &str) -> Result<bool> {
        with_timeout(
            self.store_timeout,
            "mark notification read",
            self.repo.mark_read(id, user_id),
        )
        .await
    }

    /// Deferred events due at `now`, oldest first.
    ///
    /// Markers whose stored event no longer parses are claimed as dispatched
    /// and dropped, so they cannot hold back the rest of the queue.
    pub async fn list_due_scheduled(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DueNotification>> {
        let limit = limit.max(1);
        let now_ms = datetime_to_ms(now);
        let mut due = Vec::new();

        loop {
            let requested = limit - due.len() as i64;
            let rows = with_timeout(
                self.store_timeout,
                "list due notifications",
                self.repo.list_due_scheduled(now_ms, requested),
            )
            .await?;
            let drained = (rows.len() as i64) < requested;
            let mut discarded = false;

            for row in rows {
                match serde_json::from_str::<NotificationEvent>(&row.data) {
                    Ok(event) => due.push(DueNotification {
                        notification_id: row.id,
                        event,
                    }),
                    Err(e) => {
                        warn!(notification_id = %row.id, error = %e, "Discarding unreadable deferred notification");
                        self.mark_dispatched(&row.id).await?;
                        discarded = true;
                    }
                }
            }

            // Refill the page only when discarded markers left room for more.
            if drained || !discarded {
                break;
            }
        }
        Ok(due)
    }

    pub async fn mark_dispatched(&self, notification_id: &str) -> Result<bool> {
        with_timeout(
            self.store_timeout,
            "mark notification dispatched",
            self.repo.mark_dispatched(notification_id),
        )
        .await
    }
}
