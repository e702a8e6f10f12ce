//! Notification database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Persisted in-app notification.
///
/// Rows with `scheduled_for` set are deferred markers: they hold the full
/// serialized event in `data` until an external drain re-submits it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InAppNotificationDbModel {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    /// Category: attendance, verification, system, reminder, escalation
    pub category: String,
    /// Priority: low, normal, high, urgent
    pub priority: String,
    pub title: String,
    pub message: String,
    /// JSON blob of the event payload
    pub data: String,
    pub action_url: Option<String>,
    pub is_read: bool,
    pub scheduled_for: Option<i64>,
    pub dispatched_at: Option<i64>,
    pub created_at: i64,
    pub read_at: Option<i64>,
}

impl InAppNotificationDbModel {
    pub fn is_deferred(&self) -> bool {
        self.scheduled_for.is_some()
    }
}

/// Key-value row holding one user's notification preferences as JSON.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NotificationPreferencesDbModel {
    pub user_id: String,
    pub preferences: String,
    pub updated_at: i64,
}
