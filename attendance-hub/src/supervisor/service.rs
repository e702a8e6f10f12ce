//! Supervisor reconciliation service.
//!
//! Supervisor logs are upserted per schedule slot and calendar day. The log's
//! verdict is then copied onto the attendance record of the same day on a
//! best-effort basis: a missing record is skipped and a projection failure
//! never fails the log write.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::database::repositories::{AttendanceRepository, SupervisorLogRepository};
use crate::database::retry::retry_on_sqlite_busy;
use crate::domain::{SessionStatus, SupervisorLog};
use crate::utils::with_timeout;
use crate::{Error, Result};

/// A supervisor's report for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorCheck {
    pub course_schedule_id: String,
    pub supervisor_id: String,
    pub status: SessionStatus,
    pub comments: Option<String>,
    #[serde(default)]
    pub is_online: bool,
    pub check_in_time: DateTime<Utc>,
}

/// What happened to the attendance record after a check was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "error", rename_all = "snake_case")]
pub enum ProjectionOutcome {
    /// The record's supervisor fields were updated.
    Applied,
    /// The record already carried the same verdict.
    Unchanged,
    /// No attendance was recorded for that slot and day.
    NoAttendanceRecord,
    Failed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorCheckOutcome {
    pub log: SupervisorLog,
    pub projection: ProjectionOutcome,
}

pub struct ReconciliationService {
    attendance: Arc<dyn AttendanceRepository>,
    logs: Arc<dyn SupervisorLogRepository>,
    institution_tz: Tz,
    store_timeout: Duration,
}

impl ReconciliationService {
    pub fn new(
        attendance: Arc<dyn AttendanceRepository>,
        logs: Arc<dyn SupervisorLogRepository>,
        institution_tz: Tz,
        store_timeout: Duration,
    ) -> Self {
        Self {
            attendance,
            logs,
            institution_tz,
            store_timeout,
        }
    }

    /// Calendar day of `at` in the institution's timezone.
    pub fn log_date_for(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.institution_tz).date_naive()
    }

    /// Store a supervisor check and project it onto the day's attendance record.
    #[instrument(skip(self, check), fields(schedule_id = %check.course_schedule_id, status = %check.status))]
    pub async fn record_supervisor_check(
        &self,
        check: SupervisorCheck,
    ) -> Result<SupervisorCheckOutcome> {
        if check.supervisor_id.trim().is_empty() {
            return Err(Error::validation("supervisor_id is required"));
        }
        with_timeout(
            self.store_timeout,
            "load course schedule",
            self.attendance.get_schedule(&check.course_schedule_id),
        )
        .await?;

        let log = SupervisorLog {
            id: uuid::Uuid::new_v4().to_string(),
            log_date: self.log_date_for(check.check_in_time),
            course_schedule_id: check.course_schedule_id,
            supervisor_id: check.supervisor_id,
            status: check.status,
            comments: check
                .comments
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            is_online: check.is_online,
            check_in_time: check.check_in_time,
        };

        let log = with_timeout(
            self.store_timeout,
            "upsert supervisor log",
            retry_on_sqlite_busy("upsert supervisor log", || self.logs.upsert_log(&log)),
        )
        .await?;
        info!(
            log_id = %log.id,
            log_date = %log.log_date,
            presence_confirmed = log.presence_confirmed(),
            "Supervisor check recorded"
        );

        let projection = self.project(&log).await;
        Ok(SupervisorCheckOutcome { log, projection })
    }

    /// Re-apply the stored log for a slot and day, if any.
    pub async fn reconcile_day(
        &self,
        course_schedule_id: &str,
        date: NaiveDate,
    ) -> Result<Option<ProjectionOutcome>> {
        let log = with_timeout(
            self.store_timeout,
            "load supervisor log",
            self.logs.find_log_for_day(course_schedule_id, date),
        )
        .await?;
        match log {
            Some(log) => Ok(Some(self.project(&log).await)),
            None => Ok(None),
        }
    }

    async fn project(&self, log: &SupervisorLog) -> ProjectionOutcome {
        match self.try_project(log).await {
            Ok(outcome) => {
                debug!(log_id = %log.id, ?outcome, "Supervisor projection finished");
                outcome
            }
            Err(e) => {
                warn!(
                    log_id = %log.id,
                    schedule_id = %log.course_schedule_id,
                    error = %e,
                    "Supervisor projection failed"
                );
                ProjectionOutcome::Failed(e.to_string())
            }
        }
    }

    async fn try_project(&self, log: &SupervisorLog) -> Result<ProjectionOutcome> {
        let record = with_timeout(
            self.store_timeout,
            "load attendance record for day",
            self.attendance
                .find_record_for_day(&log.course_schedule_id, log.log_date),
        )
        .await?;
        let Some(record) = record else {
            return Ok(ProjectionOutcome::NoAttendanceRecord);
        };

        let verified = log.presence_confirmed();
        let comment = log.comments.as_deref();
        let written = with_timeout(
            self.store_timeout,
            "project supervisor verification",
            retry_on_sqlite_busy("project supervisor verification", || {
                self.attendance
                    .set_supervisor_verification(&record.id, verified, comment)
            }),
        )
        .await?;

        Ok(if written {
            ProjectionOutcome::Applied
        } else {
            ProjectionOutcome::Unchanged
        })
    }
}
