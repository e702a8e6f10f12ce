//! Supervisor log repository.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::database::models::SupervisorLogDbModel;
use crate::database::time::date_to_string;
use crate::domain::SupervisorLog;
use crate::Result;

#[async_trait]
pub trait SupervisorLogRepository: Send + Sync {
    /// Insert or overwrite the log for `(course_schedule_id, log_date)`.
    ///
    /// An existing row keeps its id; every other field is replaced.
    async fn upsert_log(&self, log: &SupervisorLog) -> Result<SupervisorLog>;
    async fn find_log_for_day(
        &self,
        course_schedule_id: &str,
        date: NaiveDate,
    ) -> Result<Option<SupervisorLog>>;
}

pub struct SqlxSupervisorLogRepository {
    pool: SqlitePool,
}

impl SqlxSupervisorLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SupervisorLogRepository for SqlxSupervisorLogRepository {
    async fn upsert_log(&self, log: &SupervisorLog) -> Result<SupervisorLog> {
        let row = SupervisorLogDbModel::from(log);
        let stored = sqlx::query_as::<_, SupervisorLogDbModel>(
            r#"
            INSERT INTO supervisor_logs (
                id, course_schedule_id, supervisor_id, log_date, status, comments,
                is_online, check_in_time
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (course_schedule_id, log_date) DO UPDATE SET
                supervisor_id = excluded.supervisor_id,
                status = excluded.status,
                comments = excluded.comments,
                is_online = excluded.is_online,
                check_in_time = excluded.check_in_time
            RETURNING *
            "#,
        )
        .bind(&row.id)
        .bind(&row.course_schedule_id)
        .bind(&row.supervisor_id)
        .bind(&row.log_date)
        .bind(&row.status)
        .bind(&row.comments)
        .bind(row.is_online)
        .bind(row.check_in_time)
        .fetch_one(&self.pool)
        .await?;
        SupervisorLog::try_from(stored)
    }

    async fn find_log_for_day(
        &self,
        course_schedule_id: &str,
        date: NaiveDate,
    ) -> Result<Option<SupervisorLog>> {
        sqlx::query_as::<_, SupervisorLogDbModel>(
            "SELECT * FROM supervisor_logs WHERE course_schedule_id = ? AND log_date = ?",
        )
        .bind(course_schedule_id)
        .bind(date_to_string(date))
        .fetch_optional(&self.pool)
        .await?
        .map(SupervisorLog::try_from)
        .transpose()
    }
}
