//! Attendance records and the schedule slots they belong to.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How the lecturer delivered the session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceMethod {
    Onsite,
    Virtual,
}

impl AttendanceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Onsite => "onsite",
            Self::Virtual => "virtual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "onsite" => Some(Self::Onsite),
            "virtual" => Some(Self::Virtual),
            _ => None,
        }
    }
}

/// A recurring teaching slot of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSchedule {
    pub id: String,
    pub course_code: String,
    pub course_title: String,
    pub lecturer_id: String,
    pub programme_id: String,
    pub venue: Option<String>,
}

/// A lecturer's logged presence for one schedule slot on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub course_schedule_id: String,
    pub lecturer_id: String,
    pub attendance_date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    pub method: AttendanceMethod,
    pub location_verified: bool,
    /// `None` while no supervisor has reported on the session.
    pub supervisor_verified: Option<bool>,
    pub supervisor_comment: Option<String>,
}

impl AttendanceRecord {
    pub fn new(
        course_schedule_id: impl Into<String>,
        lecturer_id: impl Into<String>,
        attendance_date: NaiveDate,
        timestamp: DateTime<Utc>,
        method: AttendanceMethod,
        location_verified: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            course_schedule_id: course_schedule_id.into(),
            lecturer_id: lecturer_id.into(),
            attendance_date,
            timestamp,
            method,
            location_verified,
            supervisor_verified: None,
            supervisor_comment: None,
        }
    }

    pub fn is_supervisor_pending(&self) -> bool {
        self.supervisor_verified.is_none()
    }
}
