//! Verification request repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::database::models::VerificationRequestDbModel;
use crate::database::time::datetime_to_ms;
use crate::domain::{VerificationRequest, VerificationStatus};
use crate::{Error, Result};

/// Fields written when a reviewer decides a request.
#[derive(Debug, Clone)]
pub struct VerificationReview {
    pub status: VerificationStatus,
    pub reviewed_by: String,
    pub reviewed_at: DateTime<Utc>,
    pub review_notes: Option<String>,
    pub escalated_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait VerificationRepository: Send + Sync {
    async fn get_request(&self, id: &str) -> Result<VerificationRequest>;
    async fn find_open_for_record(&self, attendance_record_id: &str)
        -> Result<Option<VerificationRequest>>;
    async fn list_for_record(&self, attendance_record_id: &str) -> Result<Vec<VerificationRequest>>;
    /// Fails with `Conflict` when the record already has an open request.
    async fn create_request(&self, request: &VerificationRequest) -> Result<()>;
    /// Conditional write: applies `review` only while the stored status is
    /// still `expected`. Returns whether this call won the transition.
    async fn apply_review(
        &self,
        id: &str,
        expected: VerificationStatus,
        review: &VerificationReview,
    ) -> Result<bool>;
}

pub struct SqlxVerificationRepository {
    pool: SqlitePool,
}

impl SqlxVerificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerificationRepository for SqlxVerificationRepository {
    async fn get_request(&self, id: &str) -> Result<VerificationRequest> {
        sqlx::query_as::<_, VerificationRequestDbModel>(
            "SELECT * FROM verification_requests WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::not_found("VerificationRequest", id))
        .and_then(VerificationRequest::try_from)
    }

    async fn find_open_for_record(
        &self,
        attendance_record_id: &str,
    ) -> Result<Option<VerificationRequest>> {
        sqlx::query_as::<_, VerificationRequestDbModel>(
            "SELECT * FROM verification_requests WHERE attendance_record_id = ? AND status = ?",
        )
        .bind(attendance_record_id)
        .bind(VerificationStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(VerificationRequest::try_from)
        .transpose()
    }

    async fn list_for_record(&self, attendance_record_id: &str) -> Result<Vec<VerificationRequest>> {
        let rows = sqlx::query_as::<_, VerificationRequestDbModel>(
            "SELECT * FROM verification_requests WHERE attendance_record_id = ? ORDER BY submitted_at DESC",
        )
        .bind(attendance_record_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(VerificationRequest::try_from).collect()
    }

    async fn create_request(&self, request: &VerificationRequest) -> Result<()> {
        let row = VerificationRequestDbModel::try_from(request)?;
        let result = sqlx::query(
            r#"
            INSERT INTO verification_requests (
                id, attendance_record_id, submitted_by, status, submitted_at, reviewed_at,
                reviewed_by, escalated_at, verification_notes, review_notes, evidence_urls,
                student_attendance_data
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.attendance_record_id)
        .bind(&row.submitted_by)
        .bind(&row.status)
        .bind(row.submitted_at)
        .bind(row.reviewed_at)
        .bind(&row.reviewed_by)
        .bind(row.escalated_at)
        .bind(&row.verification_notes)
        .bind(&row.review_notes)
        .bind(&row.evidence_urls)
        .bind(&row.student_attendance_data)
        .execute(&self.pool)
        .await;

        match result.map_err(Error::from) {
            Ok(_) => Ok(()),
            Err(e) if e.is_unique_violation() => Err(Error::conflict(format!(
                "attendance record {} already has an open verification request",
                row.attendance_record_id
            ))),
            Err(e) => Err(e),
        }
    }

    async fn apply_review(
        &self,
        id: &str,
        expected: VerificationStatus,
        review: &VerificationReview,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE verification_requests SET
                status = ?,
                reviewed_by = ?,
                reviewed_at = ?,
                review_notes = ?,
                escalated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(review.status.as_str())
        .bind(&review.reviewed_by)
        .bind(datetime_to_ms(review.reviewed_at))
        .bind(&review.review_notes)
        .bind(review.escalated_at.map(datetime_to_ms))
        .bind(id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
