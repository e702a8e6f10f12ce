//! Attendance record and course schedule repository.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::database::models::{AttendanceRecordDbModel, CourseScheduleDbModel};
use crate::database::time::{date_to_string, now_ms};
use crate::domain::{AttendanceRecord, CourseSchedule};
use crate::{Error, Result};

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    // Schedules
    async fn get_schedule(&self, id: &str) -> Result<CourseSchedule>;
    async fn create_schedule(&self, schedule: &CourseSchedule) -> Result<()>;

    // Records
    async fn get_record(&self, id: &str) -> Result<AttendanceRecord>;
    async fn find_record(&self, id: &str) -> Result<Option<AttendanceRecord>>;
    async fn find_record_for_day(
        &self,
        course_schedule_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>>;
    /// Fails with `Conflict` when the slot already has a record for that day.
    async fn create_record(&self, record: &AttendanceRecord) -> Result<()>;
    /// Write the supervisor projection. Returns `false` when the stored values
    /// already match and nothing was written.
    async fn set_supervisor_verification(
        &self,
        id: &str,
        verified: bool,
        comment: Option<&str>,
    ) -> Result<bool>;
}

pub struct SqlxAttendanceRepository {
    pool: SqlitePool,
}

impl SqlxAttendanceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceRepository for SqlxAttendanceRepository {
    async fn get_schedule(&self, id: &str) -> Result<CourseSchedule> {
        sqlx::query_as::<_, CourseScheduleDbModel>("SELECT * FROM course_schedules WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(CourseSchedule::from)
            .ok_or_else(|| Error::not_found("CourseSchedule", id))
    }

    async fn create_schedule(&self, schedule: &CourseSchedule) -> Result<()> {
        let row = CourseScheduleDbModel::from(schedule);
        sqlx::query(
            r#"
            INSERT INTO course_schedules (
                id, course_code, course_title, lecturer_id, programme_id, venue, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.course_code)
        .bind(&row.course_title)
        .bind(&row.lecturer_id)
        .bind(&row.programme_id)
        .bind(&row.venue)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_record(&self, id: &str) -> Result<AttendanceRecord> {
        self.find_record(id)
            .await?
            .ok_or_else(|| Error::not_found("AttendanceRecord", id))
    }

    async fn find_record(&self, id: &str) -> Result<Option<AttendanceRecord>> {
        sqlx::query_as::<_, AttendanceRecordDbModel>(
            "SELECT * FROM attendance_records WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(AttendanceRecord::try_from)
        .transpose()
    }

    async fn find_record_for_day(
        &self,
        course_schedule_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        sqlx::query_as::<_, AttendanceRecordDbModel>(
            "SELECT * FROM attendance_records WHERE course_schedule_id = ? AND attendance_date = ?",
        )
        .bind(course_schedule_id)
        .bind(date_to_string(date))
        .fetch_optional(&self.pool)
        .await?
        .map(AttendanceRecord::try_from)
        .transpose()
    }

    async fn create_record(&self, record: &AttendanceRecord) -> Result<()> {
        let row = AttendanceRecordDbModel::from(record);
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_records (
                id, course_schedule_id, lecturer_id, attendance_date, timestamp, method,
                location_verified, supervisor_verified, supervisor_comment, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.course_schedule_id)
        .bind(&row.lecturer_id)
        .bind(&row.attendance_date)
        .bind(row.timestamp)
        .bind(&row.method)
        .bind(row.location_verified)
        .bind(row.supervisor_verified)
        .bind(&row.supervisor_comment)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await;

        match result.map_err(Error::from) {
            Ok(_) => Ok(()),
            Err(e) if e.is_unique_violation() => Err(Error::conflict(format!(
                "attendance already recorded for schedule {} on {}",
                row.course_schedule_id, row.attendance_date
            ))),
            Err(e) => Err(e),
        }
    }

    async fn set_supervisor_verification(
        &self,
        id: &str,
        verified: bool,
        comment: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE attendance_records SET
                supervisor_verified = ?,
                supervisor_comment = ?,
                updated_at = ?
            WHERE id = ?
              AND (supervisor_verified IS NOT ? OR supervisor_comment IS NOT ?)
            "#,
        )
        .bind(verified)
        .bind(comment)
        .bind(now_ms())
        .bind(id)
        .bind(verified)
        .bind(comment)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
