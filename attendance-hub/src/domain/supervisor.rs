//! Supervisor check-in logs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Session state reported by a supervisor.
///
/// Tokens are matched exactly; anything else, including case variants of the
/// known tokens, is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    Ongoing,
    Online,
    NotStarted,
    LecturerAbsent,
    Cancelled,
    TechnicalIssues,
    Other(String),
}

impl SessionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ongoing => "ongoing",
            Self::Online => "online",
            Self::NotStarted => "not_started",
            Self::LecturerAbsent => "lecturer_absent",
            Self::Cancelled => "cancelled",
            Self::TechnicalIssues => "technical_issues",
            Self::Other(token) => token,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "ongoing" => Self::Ongoing,
            "online" => Self::Online,
            "not_started" => Self::NotStarted,
            "lecturer_absent" => Self::LecturerAbsent,
            "cancelled" => Self::Cancelled,
            "technical_issues" => Self::TechnicalIssues,
            _ => Self::Other(s.to_string()),
        }
    }

    /// Whether the supervisor saw the lecturer teaching.
    pub fn confirms_presence(&self) -> bool {
        matches!(self, Self::Ongoing | Self::Online)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SessionStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SessionStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// One supervisor observation for a schedule slot on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorLog {
    pub id: String,
    pub course_schedule_id: String,
    pub supervisor_id: String,
    pub log_date: NaiveDate,
    pub status: SessionStatus,
    pub comments: Option<String>,
    pub is_online: bool,
    pub check_in_time: DateTime<Utc>,
}

impl SupervisorLog {
    pub fn presence_confirmed(&self) -> bool {
        self.status.confirms_presence()
    }
}
