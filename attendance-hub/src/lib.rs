//! attendance-hub library crate.
//!
//! Attendance verification workflow, supervisor reconciliation and the
//! multi-channel notification router that both of them drive.

pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod logging;
pub mod notification;
pub mod services;
pub mod supervisor;
pub mod utils;
pub mod verification;

pub use error::{Error, Result};
