//! Verification request service.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::database::repositories::{
    AttendanceRepository, UserRepository, VerificationRepository, VerificationReview,
};
use crate::database::retry::retry_on_sqlite_busy;
use crate::domain::{
    AttendanceRecord, CourseSchedule, ReviewDecision, StudentAttendanceData, UserRole,
    VerificationRequest, VerificationStatus,
};
use crate::notification::{
    ChannelType, NotificationCategory, NotificationEvent, NotificationPayload,
    NotificationPriority, NotificationRouter, RouteOutcome,
};
use crate::utils::with_timeout;
use crate::{Error, Result};

/// Input for opening a verification request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewVerificationRequest {
    pub attendance_record_id: String,
    pub submitted_by: String,
    #[serde(default)]
    pub evidence_urls: Vec<String>,
    pub notes: Option<String>,
    pub student_data: Option<StudentAttendanceData>,
}

/// A reviewer's decision on an open request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewCommand {
    pub request_id: String,
    pub reviewer_id: String,
    pub decision: ReviewDecision,
    pub review_notes: Option<String>,
    /// Alert the programme coordinators.
    #[serde(default)]
    pub escalate: bool,
}

/// A committed transition and the notifications it triggered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationTransition {
    pub request: VerificationRequest,
    pub notifications: Vec<RouteOutcome>,
}

pub struct VerificationService {
    attendance: Arc<dyn AttendanceRepository>,
    verifications: Arc<dyn VerificationRepository>,
    users: Arc<dyn UserRepository>,
    router: Arc<NotificationRouter>,
    store_timeout: Duration,
}

impl VerificationService {
    pub fn new(
        attendance: Arc<dyn AttendanceRepository>,
        verifications: Arc<dyn VerificationRepository>,
        users: Arc<dyn UserRepository>,
        router: Arc<NotificationRouter>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            attendance,
            verifications,
            users,
            router,
            store_timeout,
        }
    }

    /// Open a pending request and notify the record's lecturer.
    #[instrument(skip(self, input), fields(record_id = %input.attendance_record_id))]
    pub async fn create_request(
        &self,
        input: NewVerificationRequest,
    ) -> Result<VerificationTransition> {
        let record = with_timeout(
            self.store_timeout,
            "load attendance record",
            self.attendance.find_record(&input.attendance_record_id),
        )
        .await?
        .ok_or_else(|| Error::not_found("AttendanceRecord", &input.attendance_record_id))?;

        with_timeout(
            self.store_timeout,
            "load submitter",
            self.users.find_user(&input.submitted_by),
        )
        .await?
        .ok_or_else(|| Error::not_found("User", &input.submitted_by))?;

        let open = with_timeout(
            self.store_timeout,
            "check open verification request",
            self.verifications.find_open_for_record(&record.id),
        )
        .await?;
        if let Some(open) = open {
            return Err(Error::conflict(format!(
                "attendance record {} already has open verification request {}",
                record.id, open.id
            )));
        }

        let evidence_urls: Vec<String> = input
            .evidence_urls
            .into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();
        let request = VerificationRequest::new(
            record.id.clone(),
            input.submitted_by,
            evidence_urls,
            input.notes,
            input.student_data,
        );

        with_timeout(
            self.store_timeout,
            "create verification request",
            retry_on_sqlite_busy("create verification request", || {
                self.verifications.create_request(&request)
            }),
        )
        .await?;

        info!(
            request_id = %request.id,
            submitted_by = %request.submitted_by,
            "Verification request opened"
        );

        let notifications = match self.load_schedule(&record).await {
            Some(schedule) => {
                let submitter = self.display_name(&request.submitted_by).await;
                let event = NotificationEvent::new(
                    NotificationCategory::Verification,
                    NotificationPriority::High,
                    NotificationPayload::VerificationRequest {
                        request_id: request.id.clone(),
                        course_code: schedule.course_code,
                        course_title: schedule.course_title,
                        attendance_date: record.attendance_date,
                        submitted_by: submitter,
                        evidence_count: request.evidence_urls.len(),
                    },
                )
                .to(record.lecturer_id.clone())
                .via([ChannelType::InApp, ChannelType::Email]);
                vec![self.router.route(&event).await]
            }
            None => Vec::new(),
        };

        Ok(VerificationTransition {
            request,
            notifications,
        })
    }

    /// Decide an open request.
    ///
    /// The write only lands while the stored status is still `pending`; a
    /// reviewer that loses a concurrent decision gets `InvalidStateTransition`.
    #[instrument(skip(self, command), fields(request_id = %command.request_id, decision = ?command.decision))]
    pub async fn decide(&self, command: ReviewCommand) -> Result<VerificationTransition> {
        let mut request = self.get_request(&command.request_id).await?;
        let target = command.decision.status();
        request.status.transition_to(target)?;

        let reviewer = with_timeout(
            self.store_timeout,
            "load reviewer",
            self.users.get_user(&command.reviewer_id),
        )
        .await?;
        if !reviewer.role.can_review_verifications() {
            return Err(Error::forbidden(format!(
                "user {} with role {} cannot review verification requests",
                reviewer.id,
                reviewer.role.as_str()
            )));
        }

        let now = Utc::now();
        let review = VerificationReview {
            status: target,
            reviewed_by: reviewer.id.clone(),
            reviewed_at: now,
            review_notes: command.review_notes.clone(),
            escalated_at: (command.escalate || target == VerificationStatus::Disputed)
                .then_some(now),
        };

        let won = with_timeout(
            self.store_timeout,
            "apply verification review",
            retry_on_sqlite_busy("apply verification review", || {
                self.verifications
                    .apply_review(&request.id, VerificationStatus::Pending, &review)
            }),
        )
        .await?;
        if !won {
            let current = self.get_request(&request.id).await?;
            warn!(
                request_id = %request.id,
                current = current.status.as_str(),
                "Lost concurrent verification decision"
            );
            return Err(Error::InvalidStateTransition {
                from: current.status.as_str().to_string(),
                to: target.as_str().to_string(),
            });
        }

        request.status = review.status;
        request.reviewed_by = Some(review.reviewed_by);
        request.reviewed_at = Some(review.reviewed_at);
        request.review_notes = review.review_notes;
        request.escalated_at = review.escalated_at;

        info!(
            request_id = %request.id,
            status = request.status.as_str(),
            escalated = request.is_escalated(),
            "Verification request decided"
        );

        let notifications = self.notify_decision(&request, command.escalate).await;
        Ok(VerificationTransition {
            request,
            notifications,
        })
    }

    pub async fn get_request(&self, id: &str) -> Result<VerificationRequest> {
        with_timeout(
            self.store_timeout,
            "load verification request",
            self.verifications.get_request(id),
        )
        .await
    }

    /// All requests for a record, newest first.
    pub async fn list_for_record(&self, attendance_record_id: &str) -> Result<Vec<VerificationRequest>> {
        with_timeout(
            self.store_timeout,
            "list verification requests",
            self.verifications.list_for_record(attendance_record_id),
        )
        .await
    }

    async fn notify_decision(
        &self,
        request: &VerificationRequest,
        escalate: bool,
    ) -> Vec<RouteOutcome> {
        let record = match with_timeout(
            self.store_timeout,
            "load attendance record",
            self.attendance.get_record(&request.attendance_record_id),
        )
        .await
        {
            Ok(record) => record,
            Err(e) => {
                warn!(request_id = %request.id, error = %e, "Skipping decision notifications");
                return Vec::new();
            }
        };
        let Some(schedule) = self.load_schedule(&record).await else {
            return Vec::new();
        };

        let (priority, channels) = if request.status == VerificationStatus::Rejected {
            (
                NotificationPriority::High,
                vec![ChannelType::InApp, ChannelType::Email, ChannelType::Sms],
            )
        } else {
            (
                NotificationPriority::Normal,
                vec![ChannelType::InApp, ChannelType::Email],
            )
        };
        let update = NotificationEvent::new(
            NotificationCategory::Verification,
            priority,
            NotificationPayload::VerificationStatusUpdate {
                request_id: request.id.clone(),
                course_code: schedule.course_code.clone(),
                attendance_date: record.attendance_date,
                status: request.status,
                review_notes: request.review_notes.clone(),
            },
        )
        .to(request.submitted_by.clone())
        .via(channels);

        let mut outcomes = vec![self.router.route(&update).await];

        if escalate {
            if let Some(outcome) = self.escalate(request, &record, schedule).await {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    async fn escalate(
        &self,
        request: &VerificationRequest,
        record: &AttendanceRecord,
        schedule: CourseSchedule,
    ) -> Option<RouteOutcome> {
        let coordinators = match with_timeout(
            self.store_timeout,
            "list programme coordinators",
            self.users
                .list_by_role(UserRole::Coordinator, Some(schedule.programme_id.as_str())),
        )
        .await
        {
            Ok(users) => users,
            Err(e) => {
                warn!(request_id = %request.id, error = %e, "Failed to load coordinators for escalation");
                return None;
            }
        };
        if coordinators.is_empty() {
            warn!(
                request_id = %request.id,
                programme_id = %schedule.programme_id,
                "No coordinators to escalate to"
            );
            return None;
        }

        let lecturer_name = self.display_name(&record.lecturer_id).await;
        let event = NotificationEvent::new(
            NotificationCategory::Escalation,
            NotificationPriority::Urgent,
            NotificationPayload::EscalationAlert {
                request_id: request.id.clone(),
                course_code: schedule.course_code,
                course_title: schedule.course_title,
                attendance_date: record.attendance_date,
                lecturer_name,
                review_notes: request.review_notes.clone(),
            },
        )
        .to_all(coordinators.into_iter().map(|u| u.id))
        .via([ChannelType::InApp, ChannelType::Email, ChannelType::Sms]);

        Some(self.router.route(&event).await)
    }

    async fn load_schedule(&self, record: &AttendanceRecord) -> Option<CourseSchedule> {
        match with_timeout(
            self.store_timeout,
            "load course schedule",
            self.attendance.get_schedule(&record.course_schedule_id),
        )
        .await
        {
            Ok(schedule) => Some(schedule),
            Err(e) => {
                warn!(
                    record_id = %record.id,
                    error = %e,
                    "Course schedule unavailable, skipping notification"
                );
                None
            }
        }
    }

    /// User's display name, falling back to the id.
    async fn display_name(&self, user_id: &str) -> String {
        match with_timeout(self.store_timeout, "load user", self.users.find_user(user_id)).await {
            Ok(Some(user)) => user.name,
            _ => user_id.to_string(),
        }
    }
}
