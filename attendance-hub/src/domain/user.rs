//! Users as seen by the notification and review workflow.

use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Coordinator,
    Lecturer,
    ClassRep,
    Supervisor,
    Student,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Coordinator => "coordinator",
            Self::Lecturer => "lecturer",
            Self::ClassRep => "class_rep",
            Self::Supervisor => "supervisor",
            Self::Student => "student",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "coordinator" => Some(Self::Coordinator),
            "lecturer" => Some(Self::Lecturer),
            "class_rep" => Some(Self::ClassRep),
            "supervisor" => Some(Self::Supervisor),
            "student" => Some(Self::Student),
            _ => None,
        }
    }

    /// Roles allowed to decide verification requests.
    pub fn can_review_verifications(&self) -> bool {
        matches!(self, Self::Lecturer | Self::Admin | Self::Coordinator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
    pub programme_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reviewer_roles() {
        assert!(UserRole::Lecturer.can_review_verifications());
        assert!(UserRole::Admin.can_review_verifications());
        assert!(UserRole::Coordinator.can_review_verifications());
        assert!(!UserRole::ClassRep.can_review_verifications());
        assert!(!UserRole::Supervisor.can_review_verifications());
        assert!(!UserRole::Student.can_review_verifications());
    }

    #[test]
    fn test_role_strings() {
        assert_eq!(UserRole::parse("class_rep"), Some(UserRole::ClassRep));
        assert_eq!(UserRole::ClassRep.to_string(), "class_rep");
        assert_eq!(UserRole::parse("dean"), None);
    }
}
