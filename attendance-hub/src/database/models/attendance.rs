//! Attendance and schedule database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::time::{date_to_string, datetime_to_ms, ms_to_datetime, now_ms, parse_date};
use crate::domain::{AttendanceMethod, AttendanceRecord, CourseSchedule};
use crate::{Error, Result};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CourseScheduleDbModel {
    pub id: String,
    pub course_code: String,
    pub course_title: String,
    pub lecturer_id: String,
    pub programme_id: String,
    pub venue: Option<String>,
    pub created_at: i64,
}

impl From<&CourseSchedule> for CourseScheduleDbModel {
    fn from(schedule: &CourseSchedule) -> Self {
        Self {
            id: schedule.id.clone(),
            course_code: schedule.course_code.clone(),
            course_title: schedule.course_title.clone(),
            lecturer_id: schedule.lecturer_id.clone(),
            programme_id: schedule.programme_id.clone(),
            venue: schedule.venue.clone(),
            created_at: now_ms(),
        }
    }
}

impl From<CourseScheduleDbModel> for CourseSchedule {
    fn from(row: CourseScheduleDbModel) -> Self {
        Self {
            id: row.id,
            course_code: row.course_code,
            course_title: row.course_title,
            lecturer_id: row.lecturer_id,
            programme_id: row.programme_id,
            venue: row.venue,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AttendanceRecordDbModel {
    pub id: String,
    pub course_schedule_id: String,
    pub lecturer_id: String,
    /// Calendar day, YYYY-MM-DD
    pub attendance_date: String,
    pub timestamp: i64,
    /// Method: onsite, virtual
    pub method: String,
    pub location_verified: bool,
    /// NULL while no supervisor has reported
    pub supervisor_verified: Option<bool>,
    pub supervisor_comment: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&AttendanceRecord> for AttendanceRecordDbModel {
    fn from(record: &AttendanceRecord) -> Self {
        let now = now_ms();
        Self {
            id: record.id.clone(),
            course_schedule_id: record.course_schedule_id.clone(),
            lecturer_id: record.lecturer_id.clone(),
            attendance_date: date_to_string(record.attendance_date),
            timestamp: datetime_to_ms(record.timestamp),
            method: record.method.as_str().to_string(),
            location_verified: record.location_verified,
            supervisor_verified: record.supervisor_verified,
            supervisor_comment: record.supervisor_comment.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl TryFrom<AttendanceRecordDbModel> for AttendanceRecord {
    type Error = Error;

    fn try_from(row: AttendanceRecordDbModel) -> Result<Self> {
        let method = AttendanceMethod::parse(&row.method)
            .ok_or_else(|| Error::Database(format!("unknown attendance method '{}'", row.method)))?;
        Ok(Self {
            id: row.id,
            course_schedule_id: row.course_schedule_id,
            lecturer_id: row.lecturer_id,
            attendance_date: parse_date(&row.attendance_date)?,
            timestamp: ms_to_datetime(row.timestamp),
            method,
            location_verified: row.location_verified,
            supervisor_verified: row.supervisor_verified,
            supervisor_comment: row.supervisor_comment,
        })
    }
}
