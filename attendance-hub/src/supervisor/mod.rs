//! Supervisor check-ins and their projection onto attendance records.

pub mod service;

pub use service::{ProjectionOutcome, ReconciliationService, SupervisorCheck, SupervisorCheckOutcome};
