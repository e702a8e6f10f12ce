//! In-app notification repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::database::models::InAppNotificationDbModel;
use crate::database::time::now_ms;
use crate::Result;

#[async_trait]
pub trait InAppNotificationRepository: Send + Sync {
    async fn create_notification(&self, notification: &InAppNotificationDbModel) -> Result<()>;
    /// Inbox listing, newest first. Deferred markers are excluded.
    async fn list_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<InAppNotificationDbModel>>;
    async fn unread_count(&self, user_id: &str) -> Result<i64>;
    async fn mark_read(&self, id: &str, user_id: &str) -> Result<bool>;

    // Deferred delivery
    async fn list_due_scheduled(
        &self,
        now_ms: i64,
        limit: i64,
    ) -> Result<Vec<InAppNotificationDbModel>>;
    async fn mark_dispatched(&self, id: &str) -> Result<bool>;
}

pub struct SqlxInAppNotificationRepository {
    pool: SqlitePool,
}

impl SqlxInAppNotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InAppNotificationRepository for SqlxInAppNotificationRepository {
    async fn create_notification(&self, notification: &InAppNotificationDbModel) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO in_app_notifications (
                id, user_id, event_id, category, priority, title, message, data, action_url,
                is_read, scheduled_for, dispatched_at, created_at, read_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.user_id)
        .bind(&notification.event_id)
        .bind(&notification.category)
        .bind(&notification.priority)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.data)
        .bind(&notification.action_url)
        .bind(notification.is_read)
        .bind(notification.scheduled_for)
        .bind(notification.dispatched_at)
        .bind(notification.created_at)
        .bind(notification.read_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<InAppNotificationDbModel>> {
        let rows = if unread_only {
            sqlx::query_as::<_, InAppNotificationDbModel>(
                r#"
                SELECT * FROM in_app_notifications
                WHERE user_id = ? AND scheduled_for IS NULL AND is_read = 0
                ORDER BY created_at DESC LIMIT ?
                "#,
            )
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, InAppNotificationDbModel>(
                r#"
                SELECT * FROM in_app_notifications
                WHERE user_id = ? AND scheduled_for IS NULL
                ORDER BY created_at DESC LIMIT ?
                "#,
            )
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };
        Ok(rows)
    }

    async fn unread_count(&self, user_id: &str) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM in_app_notifications WHERE user_id = ? AND scheduled_for IS NULL AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn mark_read(&self, id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE in_app_notifications SET is_read = 1, read_at = ? WHERE id = ? AND user_id = ? AND is_read = 0",
        )
        .bind(now_ms())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_due_scheduled(
        &self,
        now_ms: i64,
        limit: i64,
    ) -> Result<Vec<InAppNotificationDbModel>> {
        let rows = sqlx::query_as::<_, InAppNotificationDbModel>(
            r#"
            SELECT * FROM in_app_notifications
            WHERE scheduled_for IS NOT NULL AND scheduled_for <= ? AND dispatched_at IS NULL
            ORDER BY scheduled_for ASC LIMIT ?
            "#,
        )
        .bind(now_ms)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn mark_dispatched(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE in_app_notifications SET dispatched_at = ? WHERE id = ? AND dispatched_at IS NULL",
        )
        .bind(now_ms())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
