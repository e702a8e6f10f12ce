//! Notification events.
//!
//! Defines the events the router delivers, their categories, priority levels
//! and the typed payloads templates are rendered from.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::VerificationStatus;

/// Subject area of a notification; keys the per-category channel preferences.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Attendance,
    Verification,
    System,
    Reminder,
    Escalation,
}

/// Priority level for notifications.
///
/// Declaration order is the rank order used for channel thresholds.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    /// Informational only.
    Low,
    /// Standard notifications.
    #[default]
    Normal,
    /// Important events.
    High,
    /// Requires immediate attention; ignores quiet hours.
    Urgent,
}

impl NotificationPriority {
    pub fn rank(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Normal => 1,
            Self::High => 2,
            Self::Urgent => 3,
        }
    }

    /// Whether an event at this priority clears a channel's minimum.
    pub fn meets(&self, minimum: NotificationPriority) -> bool {
        self.rank() >= minimum.rank()
    }

    pub fn bypasses_quiet_hours(&self) -> bool {
        matches!(self, Self::Urgent)
    }
}

/// Delivery medium.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    InApp,
    Email,
    Sms,
    Push,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InApp => "in_app",
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Push => "push",
        }
    }
}

/// Typed template data carried by an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum NotificationPayload {
    /// A lecturer should submit attendance for an upcoming session.
    AttendanceReminder {
        course_code: String,
        course_title: String,
        starts_at: DateTime<Utc>,
        venue: Option<String>,
    },
    /// A class representative asked the lecturer to verify a record.
    VerificationRequest {
        request_id: String,
        course_code: String,
        course_title: String,
        attendance_date: NaiveDate,
        submitted_by: String,
        evidence_count: usize,
    },
    /// A reviewer decided the submitter's request.
    VerificationStatusUpdate {
        request_id: String,
        course_code: String,
        attendance_date: NaiveDate,
        status: VerificationStatus,
        review_notes: Option<String>,
    },
    /// A disputed verification needs coordinator attention.
    EscalationAlert {
        request_id: String,
        course_code: String,
        course_title: String,
        attendance_date: NaiveDate,
        lecturer_name: String,
        review_notes: Option<String>,
    },
    /// Free-form message without a dedicated template.
    Message { title: String, message: String },
}

impl NotificationPayload {
    /// Template identifier, `None` for free-form messages.
    pub fn template_name(&self) -> Option<&'static str> {
        match self {
            Self::AttendanceReminder { .. } => Some("attendance-reminder"),
            Self::VerificationRequest { .. } => Some("verification-request"),
            Self::VerificationStatusUpdate { .. } => Some("verification-status-update"),
            Self::EscalationAlert { .. } => Some("escalation-alert"),
            Self::Message { .. } => None,
        }
    }

    /// Short human-readable title.
    pub fn title(&self) -> String {
        match self {
            Self::AttendanceReminder { course_code, .. } => {
                format!("Attendance reminder: {}", course_code)
            }
            Self::VerificationRequest { course_code, .. } => {
                format!("Verification requested for {}", course_code)
            }
            Self::VerificationStatusUpdate {
                course_code,
                status,
                ..
            } => format!("Verification {} for {}", status, course_code),
            Self::EscalationAlert { course_code, .. } => {
                format!("Escalation: disputed attendance for {}", course_code)
            }
            Self::Message { title, .. } => title.clone(),
        }
    }

    /// One-paragraph description.
    pub fn description(&self) -> String {
        match self {
            Self::AttendanceReminder {
                course_code,
                course_title,
                starts_at,
                venue,
            } => {
                let venue = venue
                    .as_deref()
                    .map(|v| format!(" in {}", v))
                    .unwrap_or_default();
                format!(
                    "Please submit attendance for {} ({}) starting {}{}.",
                    course_code,
                    course_title,
                    starts_at.format("%Y-%m-%d %H:%M UTC"),
                    venue
                )
            }
            Self::VerificationRequest {
                course_code,
                course_title,
                attendance_date,
                submitted_by,
                evidence_count,
                ..
            } => format!(
                "{} has asked you to verify the attendance recorded for {} ({}) on {}. Evidence items attached: {}.",
                submitted_by, course_code, course_title, attendance_date, evidence_count
            ),
            Self::VerificationStatusUpdate {
                course_code,
                attendance_date,
                status,
                review_notes,
                ..
            } => {
                let mut text = format!(
                    "Your verification request for {} on {} was {}.",
                    course_code, attendance_date, status
                );
                if let Some(notes) = review_notes.as_deref().filter(|n| !n.is_empty()) {
                    text.push_str(&format!(" Reviewer notes: {}", notes));
                }
                text
            }
            Self::EscalationAlert {
                course_code,
                course_title,
                attendance_date,
                lecturer_name,
                review_notes,
                ..
            } => {
                let mut text = format!(
                    "The attendance recorded by {} for {} ({}) on {} is disputed and needs coordinator review.",
                    lecturer_name, course_code, course_title, attendance_date
                );
                if let Some(notes) = review_notes.as_deref().filter(|n| !n.is_empty()) {
                    text.push_str(&format!(" Notes: {}", notes));
                }
                text
            }
            Self::Message { message, .. } => message.clone(),
        }
    }
}

/// An event to be routed to one or more users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: String,
    pub category: NotificationCategory,
    pub priority: NotificationPriority,
    pub recipients: Vec<String>,
    /// Explicit channel override; skips preference lookup when set.
    pub channels: Option<Vec<ChannelType>>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub action_url: Option<String>,
    pub payload: NotificationPayload,
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(
        category: NotificationCategory,
        priority: NotificationPriority,
        payload: NotificationPayload,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            category,
            priority,
            recipients: Vec::new(),
            channels: None,
            scheduled_for: None,
            action_url: None,
            payload,
            created_at: Utc::now(),
        }
    }

    /// Reminder asking a lecturer to log attendance for an upcoming session.
    pub fn attendance_reminder(
        lecturer_id: impl Into<String>,
        course_code: impl Into<String>,
        course_title: impl Into<String>,
        starts_at: DateTime<Utc>,
        venue: Option<String>,
    ) -> Self {
        Self::new(
            NotificationCategory::Reminder,
            NotificationPriority::Normal,
            NotificationPayload::AttendanceReminder {
                course_code: course_code.into(),
                course_title: course_title.into(),
                starts_at,
                venue,
            },
        )
        .to(lecturer_id)
    }

    pub fn to(mut self, user_id: impl Into<String>) -> Self {
        self.recipients.push(user_id.into());
        self
    }

    pub fn to_all<I, S>(mut self, user_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipients.extend(user_ids.into_iter().map(Into::into));
        self
    }

    pub fn via(mut self, channels: impl Into<Vec<ChannelType>>) -> Self {
        self.channels = Some(channels.into());
        self
    }

    pub fn scheduled_for(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(at);
        self
    }

    pub fn with_action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }

    pub fn title(&self) -> String {
        self.payload.title()
    }

    pub fn description(&self) -> String {
        self.payload.description()
    }

    /// Whether delivery must wait until `scheduled_for`.
    pub fn is_deferred(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_for.is_some_and(|at| at > now)
    }
}
