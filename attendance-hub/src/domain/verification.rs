//! Verification request lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Status of a verification request.
///
/// `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Submitted by a class representative, awaiting review.
    #[default]
    Pending,
    /// The reviewer confirmed the attendance record.
    Approved,
    /// The reviewer rejected the attendance record.
    Rejected,
    /// The attendance record is contested and may be escalated.
    Disputed,
}

impl VerificationStatus {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Disputed => "disputed",
        }
    }

    /// Parse from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "disputed" => Some(Self::Disputed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Validate a state transition.
    pub fn can_transition_to(&self, target: VerificationStatus) -> bool {
        use VerificationStatus::*;

        matches!((self, target), (Pending, Approved | Rejected | Disputed))
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(&self, target: VerificationStatus) -> Result<VerificationStatus, Error> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(Error::InvalidStateTransition {
                from: self.as_str().to_string(),
                to: target.as_str().to_string(),
            })
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome a reviewer may choose for a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
    Disputed,
}

impl ReviewDecision {
    pub fn status(&self) -> VerificationStatus {
        match self {
            Self::Approved => VerificationStatus::Approved,
            Self::Rejected => VerificationStatus::Rejected,
            Self::Disputed => VerificationStatus::Disputed,
        }
    }
}

/// Class representative's head count for the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentAttendanceData {
    pub present_count: u32,
    #[serde(default)]
    pub absent_students: Vec<String>,
    /// Session quality, 1 (poor) to 5 (excellent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_issues: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A class representative's dispute or confirmation of one attendance record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub id: String,
    pub attendance_record_id: String,
    pub submitted_by: String,
    pub status: VerificationStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub escalated_at: Option<DateTime<Utc>>,
    pub verification_notes: Option<String>,
    pub review_notes: Option<String>,
    pub evidence_urls: Vec<String>,
    pub student_attendance_data: Option<StudentAttendanceData>,
}

impl VerificationRequest {
    /// A fresh pending request.
    pub fn new(
        attendance_record_id: impl Into<String>,
        submitted_by: impl Into<String>,
        evidence_urls: Vec<String>,
        verification_notes: Option<String>,
        student_attendance_data: Option<StudentAttendanceData>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            attendance_record_id: attendance_record_id.into(),
            submitted_by: submitted_by.into(),
            status: VerificationStatus::Pending,
            submitted_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
            escalated_at: None,
            verification_notes,
            review_notes: None,
            evidence_urls,
            student_attendance_data,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == VerificationStatus::Pending
    }

    pub fn is_escalated(&self) -> bool {
        self.escalated_at.is_some()
    }
}
