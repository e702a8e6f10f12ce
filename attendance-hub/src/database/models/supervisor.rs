//! Supervisor log database model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::time::{date_to_string, datetime_to_ms, ms_to_datetime, parse_date};
use crate::domain::{SessionStatus, SupervisorLog};
use crate::{Error, Result};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SupervisorLogDbModel {
    pub id: String,
    pub course_schedule_id: String,
    pub supervisor_id: String,
    /// Calendar day, YYYY-MM-DD
    pub log_date: String,
    /// Session-state token, stored verbatim
    pub status: String,
    pub comments: Option<String>,
    pub is_online: bool,
    pub check_in_time: i64,
}

impl From<&SupervisorLog> for SupervisorLogDbModel {
    fn from(log: &SupervisorLog) -> Self {
        Self {
            id: log.id.clone(),
            course_schedule_id: log.course_schedule_id.clone(),
            supervisor_id: log.supervisor_id.clone(),
            log_date: date_to_string(log.log_date),
            status: log.status.as_str().to_string(),
            comments: log.comments.clone(),
            is_online: log.is_online,
            check_in_time: datetime_to_ms(log.check_in_time),
        }
    }
}

impl TryFrom<SupervisorLogDbModel> for SupervisorLog {
    type Error = Error;

    fn try_from(row: SupervisorLogDbModel) -> Result<Self> {
        Ok(Self {
            id: row.id,
            course_schedule_id: row.course_schedule_id,
            supervisor_id: row.supervisor_id,
            log_date: parse_date(&row.log_date)?,
            status: SessionStatus::parse(&row.status),
            comments: row.comments,
            is_online: row.is_online,
            check_in_time: ms_to_datetime(row.check_in_time),
        })
    }
}
