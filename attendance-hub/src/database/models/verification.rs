//! Verification request database model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::time::{datetime_to_ms, ms_to_datetime};
use crate::domain::{StudentAttendanceData, VerificationRequest, VerificationStatus};
use crate::{Error, Result};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct VerificationRequestDbModel {
    pub id: String,
    pub attendance_record_id: String,
    pub submitted_by: String,
    /// Status: pending, approved, rejected, disputed
    pub status: String,
    pub submitted_at: i64,
    pub reviewed_at: Option<i64>,
    pub reviewed_by: Option<String>,
    pub escalated_at: Option<i64>,
    pub verification_notes: Option<String>,
    pub review_notes: Option<String>,
    /// JSON array of evidence URLs, in submission order
    pub evidence_urls: String,
    /// JSON blob of the class representative's head count
    pub student_attendance_data: Option<String>,
}

impl TryFrom<&VerificationRequest> for VerificationRequestDbModel {
    type Error = Error;

    fn try_from(request: &VerificationRequest) -> Result<Self> {
        let student_attendance_data = request
            .student_attendance_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        Ok(Self {
            id: request.id.clone(),
            attendance_record_id: request.attendance_record_id.clone(),
            submitted_by: request.submitted_by.clone(),
            status: request.status.as_str().to_string(),
            submitted_at: datetime_to_ms(request.submitted_at),
            reviewed_at: request.reviewed_at.map(datetime_to_ms),
            reviewed_by: request.reviewed_by.clone(),
            escalated_at: request.escalated_at.map(datetime_to_ms),
            verification_notes: request.verification_notes.clone(),
            review_notes: request.review_notes.clone(),
            evidence_urls: serde_json::to_string(&request.evidence_urls)?,
            student_attendance_data,
        })
    }
}

impl TryFrom<VerificationRequestDbModel> for VerificationRequest {
    type Error = Error;

    fn try_from(row: VerificationRequestDbModel) -> Result<Self> {
        let status = VerificationStatus::parse(&row.status).ok_or_else(|| {
            Error::Database(format!("unknown verification status '{}'", row.status))
        })?;
        let student_attendance_data: Option<StudentAttendanceData> = row
            .student_attendance_data
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(Self {
            id: row.id,
            attendance_record_id: row.attendance_record_id,
            submitted_by: row.submitted_by,
            status,
            submitted_at: ms_to_datetime(row.submitted_at),
            reviewed_at: row.reviewed_at.map(ms_to_datetime),
            reviewed_by: row.reviewed_by,
            escalated_at: row.escalated_at.map(ms_to_datetime),
            verification_notes: row.verification_notes,
            review_notes: row.review_notes,
            evidence_urls: serde_json::from_str(&row.evidence_urls)?,
            student_attendance_data,
        })
    }
}
