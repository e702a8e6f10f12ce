//! Key-value store for per-user notification preferences.
//!
//! Values are opaque JSON documents; the schema lives in
//! `notification::preferences`.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::database::models::NotificationPreferencesDbModel;
use crate::database::time::now_ms;
use crate::Result;

#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    async fn get_preferences(&self, user_id: &str) -> Result<Option<String>>;
    async fn put_preferences(&self, user_id: &str, preferences: &str) -> Result<()>;
    /// Store `preferences` unless the user already has a document.
    /// Returns whether the insert happened.
    async fn insert_if_absent(&self, user_id: &str, preferences: &str) -> Result<bool>;
    async fn delete_preferences(&self, user_id: &str) -> Result<()>;
}

pub struct SqlxPreferenceRepository {
    pool: SqlitePool,
}

impl SqlxPreferenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceRepository for SqlxPreferenceRepository {
    async fn get_preferences(&self, user_id: &str) -> Result<Option<String>> {
        let row = sqlx::query_as::<_, NotificationPreferencesDbModel>(
            "SELECT * FROM notification_preferences WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.preferences))
    }

    async fn put_preferences(&self, user_id: &str, preferences: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_preferences (user_id, preferences, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                preferences = excluded.preferences,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(preferences)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_if_absent(&self, user_id: &str, preferences: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO notification_preferences (user_id, preferences, updated_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(preferences)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_preferences(&self, user_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM notification_preferences WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
