//! Notification routing against a real SQLite database.

mod common;

use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};

use attendance_hub::Error;
use attendance_hub::database::models::InAppNotificationDbModel;
use attendance_hub::database::time::datetime_to_ms;
use attendance_hub::notification::{
    ChannelSetting, ChannelType, DeliveryRoute, NotificationCategory, NotificationEvent,
    NotificationPayload, NotificationPreferences, NotificationPriority, QuietHours,
};
use common::*;

fn message_event(category: NotificationCategory, priority: NotificationPriority) -> NotificationEvent {
    NotificationEvent::new(
        category,
        priority,
        NotificationPayload::Message {
            title: "Timetable change".to_string(),
            message: "CSC301 moves to LT-3 from next week.".to_string(),
        },
    )
}

fn late_evening() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 23, 0, 0).unwrap()
}

fn midday() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
}

async fn enable_quiet_hours(env: &TestEnv, user_id: &str) {
    let preferences = NotificationPreferences {
        quiet_hours: Some(QuietHours::new("22:00", "07:00", "UTC")),
        ..NotificationPreferences::default()
    };
    env.preferences.update(user_id, &preferences).await.unwrap();
}

#[tokio::test]
async fn test_urgent_bypasses_quiet_hours() {
    let env = TestEnv::new().await;
    enable_quiet_hours(&env, COORDINATOR_A).await;

    let urgent = message_event(NotificationCategory::Escalation, NotificationPriority::Urgent)
        .to(COORDINATOR_A);
    let outcome = env.router.route_at(&urgent, late_evening()).await;
    assert_eq!(
        outcome.for_user(COORDINATOR_A).unwrap().delivered_channels(),
        vec![ChannelType::InApp, ChannelType::Email, ChannelType::Sms]
    );

    let high = message_event(NotificationCategory::Escalation, NotificationPriority::High)
        .to(COORDINATOR_A);
    let outcome = env.router.route_at(&high, late_evening()).await;
    assert_eq!(
        outcome.for_user(COORDINATOR_A).unwrap().delivered_channels(),
        vec![ChannelType::InApp]
    );

    // Outside the window the full category list applies again.
    let outcome = env.router.route_at(&high, midday()).await;
    assert_eq!(
        outcome.for_user(COORDINATOR_A).unwrap().delivered_channels(),
        vec![ChannelType::InApp, ChannelType::Email, ChannelType::Sms]
    );
}

#[tokio::test]
async fn test_quiet_hours_follow_user_timezone() {
    let env = TestEnv::new().await;
    // 21:30 UTC is 22:30 in Lagos.
    let preferences = NotificationPreferences {
        quiet_hours: Some(QuietHours::new("22:00", "07:00", "Africa/Lagos")),
        ..NotificationPreferences::default()
    };
    env.preferences.update(LECTURER, &preferences).await.unwrap();

    let event = message_event(NotificationCategory::Attendance, NotificationPriority::Normal)
        .to(LECTURER);
    let at = Utc.with_ymd_and_hms(2026, 3, 10, 21, 30, 0).unwrap();
    let outcome = env.router.route_at(&event, at).await;
    assert_eq!(
        outcome.for_user(LECTURER).unwrap().delivered_channels(),
        vec![ChannelType::InApp]
    );
}

#[tokio::test]
async fn test_priority_threshold_gates_sms() {
    let env = TestEnv::new().await;

    let normal = message_event(NotificationCategory::Verification, NotificationPriority::Normal)
        .to(CLASS_REP);
    let outcome = env.router.route_at(&normal, midday()).await;
    assert_eq!(
        outcome.for_user(CLASS_REP).unwrap().delivered_channels(),
        vec![ChannelType::InApp, ChannelType::Email]
    );
    assert!(env.sms.sent().is_empty());

    let high = message_event(NotificationCategory::Verification, NotificationPriority::High)
        .to(CLASS_REP);
    let outcome = env.router.route_at(&high, midday()).await;
    assert_eq!(
        outcome.for_user(CLASS_REP).unwrap().delivered_channels(),
        vec![ChannelType::InApp, ChannelType::Email, ChannelType::Sms]
    );
    assert_eq!(env.sms.sent_to(CLASS_REP).len(), 1);
}

#[tokio::test]
async fn test_in_app_is_always_attempted() {
    let env = TestEnv::new().await;
    let event = message_event(NotificationCategory::System, NotificationPriority::Low)
        .to(STUDENT)
        .via([ChannelType::Email]);

    let outcome = env.router.route(&event).await;
    let student = outcome.for_user(STUDENT).unwrap();
    assert_eq!(
        student.delivered_channels(),
        vec![ChannelType::InApp, ChannelType::Email]
    );

    let inbox = env.inbox.list_for_user(STUDENT, false, None).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].title, "Timetable change");
    assert_eq!(inbox[0].category, Some(NotificationCategory::System));
    assert_eq!(
        student.delivery(ChannelType::InApp).unwrap().message_id.as_deref(),
        Some(inbox[0].id.as_str())
    );
}

#[tokio::test]
async fn test_inbox_read_tracking() {
    let env = TestEnv::new().await;
    let event = message_event(NotificationCategory::System, NotificationPriority::Normal)
        .to(STUDENT);
    env.router.route(&event).await;

    assert_eq!(env.inbox.unread_count(STUDENT).await.unwrap(), 1);
    let id = env.inbox.list_for_user(STUDENT, true, None).await.unwrap()[0]
        .id
        .clone();

    assert!(!env.inbox.mark_read(&id, LECTURER).await.unwrap());
    assert!(env.inbox.mark_read(&id, STUDENT).await.unwrap());
    assert!(!env.inbox.mark_read(&id, STUDENT).await.unwrap());

    assert_eq!(env.inbox.unread_count(STUDENT).await.unwrap(), 0);
    assert!(env.inbox.list_for_user(STUDENT, true, None).await.unwrap().is_empty());
    let all = env.inbox.list_for_user(STUDENT, false, None).await.unwrap();
    assert!(all[0].is_read);
    assert!(all[0].read_at.is_some());
}

fn deferred_marker(
    id: &str,
    data: String,
    scheduled_for: chrono::DateTime<Utc>,
) -> InAppNotificationDbModel {
    InAppNotificationDbModel {
        id: id.to_string(),
        user_id: LECTURER.to_string(),
        event_id: format!("event-{}", id),
        category: "reminder".to_string(),
        priority: "normal".to_string(),
        title: String::new(),
        message: String::new(),
        data,
        action_url: None,
        is_read: false,
        scheduled_for: Some(datetime_to_ms(scheduled_for)),
        dispatched_at: None,
        created_at: datetime_to_ms(scheduled_for),
        read_at: None,
    }
}

#[tokio::test]
async fn test_unreadable_deferred_markers_do_not_block_the_queue() {
    let env = TestEnv::new().await;
    let now = midday();
    let limit = 3;

    for i in 0..limit {
        let marker = deferred_marker(
            &format!("broken-{}", i),
            "{not json".to_string(),
            now - chrono::Duration::hours(2) + chrono::Duration::minutes(i),
        );
        env.in_app.create_notification(&marker).await.unwrap();
    }

    let event = message_event(NotificationCategory::Reminder, NotificationPriority::Normal)
        .to(LECTURER)
        .scheduled_for(now - chrono::Duration::hours(1));
    let valid = deferred_marker(
        "valid",
        serde_json::to_string(&event).unwrap(),
        now - chrono::Duration::hours(1),
    );
    env.in_app.create_notification(&valid).await.unwrap();

    let due = env.inbox.list_due_scheduled(now, limit).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].notification_id, "valid");
    assert_eq!(due[0].event.id, event.id);

    // Broken markers were claimed and stay out of later polls.
    assert!(env.inbox.mark_dispatched(&due[0].notification_id).await.unwrap());
    for _ in 0..3 {
        assert!(env.inbox.list_due_scheduled(now, limit).await.unwrap().is_empty());
    }
    assert!(!env.inbox.mark_dispatched("broken-0").await.unwrap());
}

#[tokio::test]
async fn test_scheduled_event_is_deferred() {
    let env = TestEnv::new().await;
    let now = midday();
    let starts_at = now + chrono::Duration::hours(2);
    let event = NotificationEvent::attendance_reminder(
        LECTURER,
        "CSC301",
        "Data Structures",
        starts_at,
        Some("LT-2".to_string()),
    )
    .scheduled_for(now + chrono::Duration::hours(1));

    let outcome = env.router.route_at(&event, now).await;
    assert!(outcome.success);
    let lecturer = outcome.for_user(LECTURER).unwrap();
    assert_eq!(lecturer.deliveries.len(), 1);
    assert_eq!(lecturer.deliveries[0].route, DeliveryRoute::Scheduled);
    assert!(lecturer.deliveries[0].success);

    assert!(env.email.sent().is_empty());
    assert!(env.inbox.list_for_user(LECTURER, false, None).await.unwrap().is_empty());
    assert_eq!(env.inbox.unread_count(LECTURER).await.unwrap(), 0);

    let not_yet = env.inbox.list_due_scheduled(now, 10).await.unwrap();
    assert!(not_yet.is_empty());

    let due = env
        .inbox
        .list_due_scheduled(now + chrono::Duration::minutes(90), 10)
        .await
        .unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].event.id, event.id);
    assert_eq!(due[0].event.recipients, vec![LECTURER.to_string()]);
    assert_eq!(due[0].event.payload, event.payload);

    assert!(env.inbox.mark_dispatched(&due[0].notification_id).await.unwrap());
    assert!(
        env.inbox
            .list_due_scheduled(now + chrono::Duration::minutes(90), 10)
            .await
            .unwrap()
            .is_empty()
    );

    // Re-routing once due delivers normally.
    let outcome = env
        .router
        .route_at(&due[0].event, now + chrono::Duration::minutes(90))
        .await;
    assert_eq!(
        outcome.for_user(LECTURER).unwrap().delivered_channels(),
        vec![ChannelType::InApp, ChannelType::Email]
    );
    assert_eq!(env.email.sent_to(LECTURER)[0].template.as_deref(), Some("attendance-reminder"));
}

#[tokio::test]
async fn test_channel_failure_is_isolated() {
    let env = TestEnv::with_options(TestOptions {
        sms: SendBehavior::Fail,
        ..TestOptions::default()
    })
    .await;
    let event = message_event(NotificationCategory::Escalation, NotificationPriority::High)
        .to_all([COORDINATOR_A, COORDINATOR_B]);

    let outcome = env.router.route(&event).await;
    assert!(outcome.success);
    for user in &outcome.users {
        assert!(user.success);
        assert_eq!(
            user.delivered_channels(),
            vec![ChannelType::InApp, ChannelType::Email]
        );
        let sms = user.delivery(ChannelType::Sms).unwrap();
        assert!(!sms.success);
        assert!(sms.error.is_some());
    }
    assert_eq!(env.email.sent().len(), 2);
}

#[tokio::test]
async fn test_slow_channel_times_out() {
    let env = TestEnv::with_options(TestOptions {
        email: SendBehavior::Delay(Duration::from_secs(5)),
        channel_timeout_ms: 100,
        ..TestOptions::default()
    })
    .await;
    let event = message_event(NotificationCategory::Attendance, NotificationPriority::Normal)
        .to(LECTURER);

    let started = Instant::now();
    let outcome = env.router.route(&event).await;
    assert!(started.elapsed() < Duration::from_secs(4));

    let lecturer = outcome.for_user(LECTURER).unwrap();
    assert!(lecturer.success);
    let email = lecturer.delivery(ChannelType::Email).unwrap();
    assert!(!email.success);
    assert!(email.error.as_deref().unwrap().contains("Timed out"));
}

#[tokio::test]
async fn test_unregistered_channel_reports_failure() {
    let env = TestEnv::new().await;
    let event = message_event(NotificationCategory::System, NotificationPriority::Normal)
        .to(STUDENT)
        .via([ChannelType::Push]);

    let outcome = env.router.route(&event).await;
    let student = outcome.for_user(STUDENT).unwrap();
    assert!(student.success);
    let push = student.delivery(ChannelType::Push).unwrap();
    assert!(!push.success);
    assert!(push.error.as_deref().unwrap().contains("no sender"));
}

#[tokio::test]
async fn test_unknown_recipient_still_gets_in_app() {
    let env = TestEnv::new().await;
    let event = message_event(NotificationCategory::System, NotificationPriority::Normal)
        .to("not-in-directory");

    let outcome = env.router.route(&event).await;
    let user = outcome.for_user("not-in-directory").unwrap();
    assert_eq!(user.delivered_channels(), vec![ChannelType::InApp]);
}

#[tokio::test]
async fn test_preferences_lifecycle() {
    let env = TestEnv::new().await;

    let defaults = env.preferences.get_or_create(LECTURER).await.unwrap();
    assert_eq!(defaults, NotificationPreferences::default());

    let invalid = NotificationPreferences {
        quiet_hours: Some(QuietHours::new("25:00", "07:00", "UTC")),
        ..NotificationPreferences::default()
    };
    let result = env.preferences.update(LECTURER, &invalid).await;
    assert!(matches!(result, Err(Error::Validation(_))));

    let mut no_email = NotificationPreferences::default();
    no_email.channels.insert(
        ChannelType::Email,
        ChannelSetting {
            enabled: false,
            priority: NotificationPriority::Low,
        },
    );
    env.preferences.update(LECTURER, &no_email).await.unwrap();
    assert_eq!(env.preferences.get_or_create(LECTURER).await.unwrap(), no_email);

    let event = message_event(NotificationCategory::Attendance, NotificationPriority::Normal)
        .to(LECTURER);
    let outcome = env.router.route_at(&event, midday()).await;
    assert_eq!(
        outcome.for_user(LECTURER).unwrap().delivered_channels(),
        vec![ChannelType::InApp]
    );

    env.preferences.reset(LECTURER).await.unwrap();
    assert_eq!(
        env.preferences.get_or_create(LECTURER).await.unwrap(),
        NotificationPreferences::default()
    );
}

#[tokio::test]
async fn test_event_without_recipients_fails() {
    let env = TestEnv::new().await;
    let event = message_event(NotificationCategory::System, NotificationPriority::Normal);
    let outcome = env.router.route(&event).await;
    assert!(!outcome.success);
    assert!(outcome.users.is_empty());
}
