//! Supervisor check-ins and their projection onto attendance records.

mod common;

use chrono::{NaiveDate, TimeZone, Utc};

use attendance_hub::Error;
use attendance_hub::domain::SessionStatus;
use attendance_hub::supervisor::{ProjectionOutcome, SupervisorCheck};
use common::*;

fn check(status: &str, comments: Option<&str>, hour: u32) -> SupervisorCheck {
    let date = session_date();
    SupervisorCheck {
        course_schedule_id: SCHEDULE.to_string(),
        supervisor_id: SUPERVISOR.to_string(),
        status: SessionStatus::parse(status),
        comments: comments.map(str::to_string),
        is_online: false,
        check_in_time: Utc.from_utc_datetime(&date.and_hms_opt(hour, 15, 0).unwrap()),
    }
}

#[tokio::test]
async fn test_presence_confirmation_projects_onto_record() {
    let env = TestEnv::new().await;
    let record = env.record_attendance(session_date()).await;

    let outcome = env
        .reconciliation
        .record_supervisor_check(check("ongoing", Some("Class in session"), 9))
        .await
        .unwrap();
    assert_eq!(outcome.projection, ProjectionOutcome::Applied);
    assert_eq!(outcome.log.log_date, session_date());
    assert!(outcome.log.presence_confirmed());

    let stored = env.attendance.get_record(&record.id).await.unwrap();
    assert_eq!(stored.supervisor_verified, Some(true));
    assert_eq!(stored.supervisor_comment.as_deref(), Some("Class in session"));
}

#[tokio::test]
async fn test_reconciliation_is_idempotent() {
    let env = TestEnv::new().await;
    let record = env.record_attendance(session_date()).await;

    let first = env
        .reconciliation
        .record_supervisor_check(check("online", Some("Streaming on Teams"), 9))
        .await
        .unwrap();
    let second = env
        .reconciliation
        .record_supervisor_check(check("online", Some("Streaming on Teams"), 9))
        .await
        .unwrap();

    assert_eq!(first.projection, ProjectionOutcome::Applied);
    assert_eq!(second.projection, ProjectionOutcome::Unchanged);
    assert_eq!(first.log.id, second.log.id);

    let replay = env
        .reconciliation
        .reconcile_day(SCHEDULE, session_date())
        .await
        .unwrap();
    assert_eq!(replay, Some(ProjectionOutcome::Unchanged));

    let stored = env.attendance.get_record(&record.id).await.unwrap();
    assert_eq!(stored.supervisor_verified, Some(true));
    assert_eq!(stored.supervisor_comment.as_deref(), Some("Streaming on Teams"));
}

#[tokio::test]
async fn test_later_check_overwrites_same_day() {
    let env = TestEnv::new().await;
    let record = env.record_attendance(session_date()).await;

    let morning = env
        .reconciliation
        .record_supervisor_check(check("ongoing", None, 9))
        .await
        .unwrap();
    let later = env
        .reconciliation
        .record_supervisor_check(check("lecturer_absent", Some("Left after 10 minutes"), 11))
        .await
        .unwrap();

    assert_eq!(later.log.id, morning.log.id);
    assert_eq!(later.log.status, SessionStatus::LecturerAbsent);
    assert_eq!(later.projection, ProjectionOutcome::Applied);

    let log = env
        .supervisor_logs
        .find_log_for_day(SCHEDULE, session_date())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.status, SessionStatus::LecturerAbsent);

    let stored = env.attendance.get_record(&record.id).await.unwrap();
    assert_eq!(stored.supervisor_verified, Some(false));
    assert_eq!(
        stored.supervisor_comment.as_deref(),
        Some("Left after 10 minutes")
    );
}

#[tokio::test]
async fn test_missing_record_is_skipped() {
    let env = TestEnv::new().await;

    let outcome = env
        .reconciliation
        .record_supervisor_check(check("not_started", None, 9))
        .await
        .unwrap();
    assert_eq!(outcome.projection, ProjectionOutcome::NoAttendanceRecord);

    let log = env
        .supervisor_logs
        .find_log_for_day(SCHEDULE, session_date())
        .await
        .unwrap();
    assert!(log.is_some());

    // Attendance recorded afterwards picks the verdict up on replay.
    let record = env.record_attendance(session_date()).await;
    let replay = env
        .reconciliation
        .reconcile_day(SCHEDULE, session_date())
        .await
        .unwrap();
    assert_eq!(replay, Some(ProjectionOutcome::Applied));
    let stored = env.attendance.get_record(&record.id).await.unwrap();
    assert_eq!(stored.supervisor_verified, Some(false));
}

#[tokio::test]
async fn test_unknown_status_token_is_preserved() {
    let env = TestEnv::new().await;
    env.record_attendance(session_date()).await;

    let outcome = env
        .reconciliation
        .record_supervisor_check(check("Late_Start", None, 9))
        .await
        .unwrap();
    assert_eq!(outcome.log.status, SessionStatus::Other("Late_Start".to_string()));
    assert!(!outcome.log.presence_confirmed());

    let log = env
        .supervisor_logs
        .find_log_for_day(SCHEDULE, session_date())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.status.as_str(), "Late_Start");
}

#[tokio::test]
async fn test_uppercase_presence_token_does_not_confirm() {
    let env = TestEnv::new().await;
    let record = env.record_attendance(session_date()).await;

    let outcome = env
        .reconciliation
        .record_supervisor_check(check("ONGOING", None, 9))
        .await
        .unwrap();
    assert_eq!(outcome.log.status, SessionStatus::Other("ONGOING".to_string()));
    assert!(!outcome.log.presence_confirmed());
    assert_eq!(outcome.projection, ProjectionOutcome::Applied);

    let stored = env.attendance.get_record(&record.id).await.unwrap();
    assert_eq!(stored.supervisor_verified, Some(false));
    let log = env
        .supervisor_logs
        .find_log_for_day(SCHEDULE, session_date())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.status.as_str(), "ONGOING");
}

#[tokio::test]
async fn test_log_day_uses_institution_timezone() {
    let env = TestEnv::with_options(TestOptions {
        timezone: chrono_tz::Africa::Lagos,
        ..TestOptions::default()
    })
    .await;
    let next_day = NaiveDate::from_ymd_opt(2026, 3, 11).unwrap();
    let record = env.record_attendance(next_day).await;

    // 23:30 UTC on the 10th is 00:30 on the 11th in Lagos.
    let mut late = check("ongoing", None, 23);
    late.check_in_time = Utc.with_ymd_and_hms(2026, 3, 10, 23, 30, 0).unwrap();
    let outcome = env.reconciliation.record_supervisor_check(late).await.unwrap();

    assert_eq!(outcome.log.log_date, next_day);
    assert_eq!(outcome.projection, ProjectionOutcome::Applied);
    let stored = env.attendance.get_record(&record.id).await.unwrap();
    assert_eq!(stored.supervisor_verified, Some(true));
}

#[tokio::test]
async fn test_unknown_schedule_rejected() {
    let env = TestEnv::new().await;
    let mut bad = check("ongoing", None, 9);
    bad.course_schedule_id = "no-such-schedule".to_string();

    let result = env.reconciliation.record_supervisor_check(bad).await;
    assert!(matches!(result, Err(Error::NotFound { .. })));
}
