//! Domain layer for attendance-hub.
//!
//! Entities and closed value types shared by the verification workflow,
//! supervisor reconciliation and the notification router.

pub mod attendance;
pub mod supervisor;
pub mod user;
pub mod verification;

pub use attendance::{AttendanceMethod, AttendanceRecord, CourseSchedule};
pub use supervisor::{SessionStatus, SupervisorLog};
pub use user::{User, UserRole};
pub use verification::{
    ReviewDecision, StudentAttendanceData, VerificationRequest, VerificationStatus,
};
