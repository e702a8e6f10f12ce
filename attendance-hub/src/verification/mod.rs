//! Attendance verification workflow.
//!
//! A class representative opens a request against one attendance record; a
//! reviewer decides it exactly once. Every committed transition notifies the
//! affected users through the notification router.

pub mod service;

pub use service::{NewVerificationRequest, ReviewCommand, VerificationService, VerificationTransition};
