//! Shared fixtures for the integration tests.
//!
//! Every environment gets its own SQLite file in a temporary directory with
//! migrations applied, the SQLx repositories, the real in-app channel and
//! recording fakes for email and SMS.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use tempfile::TempDir;

use attendance_hub::database::repositories::{
    AttendanceRepository, InAppNotificationRepository, SqlxAttendanceRepository,
    SqlxInAppNotificationRepository, SqlxPreferenceRepository, SqlxSupervisorLogRepository,
    SqlxUserRepository, SqlxVerificationRepository, SupervisorLogRepository, UserRepository,
    VerificationRepository,
};
use attendance_hub::database::{DbPool, init_pool_with_size, run_migrations};
use attendance_hub::domain::{AttendanceMethod, AttendanceRecord, CourseSchedule, User, UserRole};
use attendance_hub::notification::channels::InAppChannel;
use attendance_hub::notification::{
    ChannelSender, ChannelType, InboxService, NotificationPreferences, NotificationPriority,
    NotificationRouter, NotificationRouterConfig, OutboundMessage, PreferenceStore, Recipient,
    SendReceipt,
};
use attendance_hub::supervisor::ReconciliationService;
use attendance_hub::verification::VerificationService;
use attendance_hub::{Error, Result};

pub const LECTURER: &str = "lecturer-1";
pub const CLASS_REP: &str = "rep-1";
pub const COORDINATOR_A: &str = "coord-1";
pub const COORDINATOR_B: &str = "coord-2";
pub const OTHER_COORDINATOR: &str = "coord-other";
pub const ADMIN: &str = "admin-1";
pub const STUDENT: &str = "student-1";
pub const SUPERVISOR: &str = "supervisor-1";

pub const PROGRAMME: &str = "prog-cs";
pub const OTHER_PROGRAMME: &str = "prog-ee";
pub const SCHEDULE: &str = "sched-csc301";

pub fn session_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
}

/// How a recording sender answers.
#[derive(Debug, Clone, Copy)]
pub enum SendBehavior {
    Succeed,
    Fail,
    Delay(Duration),
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub user_id: String,
    pub event_id: String,
    pub template: Option<String>,
    pub priority: NotificationPriority,
    pub title: String,
}

/// Fake provider that records every message it accepts.
pub struct RecordingSender {
    channel: ChannelType,
    behavior: SendBehavior,
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingSender {
    pub fn new(channel: ChannelType, behavior: SendBehavior) -> Self {
        Self {
            channel,
            behavior,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, user_id: &str) -> Vec<SentMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.user_id == user_id)
            .collect()
    }
}

#[async_trait]
impl ChannelSender for RecordingSender {
    fn channel_type(&self) -> ChannelType {
        self.channel
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn send(&self, recipient: &Recipient, message: &OutboundMessage) -> Result<SendReceipt> {
        match self.behavior {
            SendBehavior::Succeed => {}
            SendBehavior::Fail => {
                return Err(Error::delivery(self.channel.as_str(), "provider unavailable"));
            }
            SendBehavior::Delay(delay) => tokio::time::sleep(delay).await,
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(SentMessage {
            user_id: recipient.user_id.clone(),
            event_id: message.event_id.clone(),
            template: message.content.template.clone(),
            priority: message.priority,
            title: message.content.title.clone(),
        });
        Ok(SendReceipt {
            message_id: Some(format!("{}-{}", self.channel, sent.len())),
        })
    }
}

pub struct TestOptions {
    pub email: SendBehavior,
    pub sms: SendBehavior,
    pub channel_timeout_ms: u64,
    pub timezone: Tz,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            email: SendBehavior::Succeed,
            sms: SendBehavior::Succeed,
            channel_timeout_ms: 2_000,
            timezone: chrono_tz::UTC,
        }
    }
}

pub struct TestEnv {
    _dir: TempDir,
    pub pool: DbPool,
    pub users: Arc<dyn UserRepository>,
    pub attendance: Arc<dyn AttendanceRepository>,
    pub verifications: Arc<dyn VerificationRepository>,
    pub supervisor_logs: Arc<dyn SupervisorLogRepository>,
    pub in_app: Arc<dyn InAppNotificationRepository>,
    pub preferences: Arc<PreferenceStore>,
    pub inbox: InboxService,
    pub email: Arc<RecordingSender>,
    pub sms: Arc<RecordingSender>,
    pub router: Arc<NotificationRouter>,
    pub verification: VerificationService,
    pub reconciliation: ReconciliationService,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_options(TestOptions::default()).await
    }

    pub async fn with_options(options: TestOptions) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("hub.db").display());
        let pool = init_pool_with_size(&url, 4).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let users: Arc<dyn UserRepository> = Arc::new(SqlxUserRepository::new(pool.clone()));
        let attendance: Arc<dyn AttendanceRepository> =
            Arc::new(SqlxAttendanceRepository::new(pool.clone()));
        let verifications: Arc<dyn VerificationRepository> =
            Arc::new(SqlxVerificationRepository::new(pool.clone()));
        let supervisor_logs: Arc<dyn SupervisorLogRepository> =
            Arc::new(SqlxSupervisorLogRepository::new(pool.clone()));
        let in_app: Arc<dyn InAppNotificationRepository> =
            Arc::new(SqlxInAppNotificationRepository::new(pool.clone()));
        let store_timeout = Duration::from_secs(5);
        let preferences = Arc::new(PreferenceStore::new(
            Arc::new(SqlxPreferenceRepository::new(pool.clone())),
            NotificationPreferences::default(),
            store_timeout,
        ));

        let email = Arc::new(RecordingSender::new(ChannelType::Email, options.email));
        let sms = Arc::new(RecordingSender::new(ChannelType::Sms, options.sms));

        let router_config = NotificationRouterConfig {
            channel_timeout_ms: options.channel_timeout_ms,
            ..NotificationRouterConfig::default()
        };
        let router = Arc::new(
            NotificationRouter::new(
                router_config,
                preferences.clone(),
                users.clone(),
                in_app.clone(),
            )
            .with_sender(Arc::new(InAppChannel::new(in_app.clone())))
            .with_sender(email.clone())
            .with_sender(sms.clone()),
        );

        let verification = VerificationService::new(
            attendance.clone(),
            verifications.clone(),
            users.clone(),
            router.clone(),
            store_timeout,
        );
        let reconciliation = ReconciliationService::new(
            attendance.clone(),
            supervisor_logs.clone(),
            options.timezone,
            store_timeout,
        );

        let env = Self {
            _dir: dir,
            pool,
            users,
            attendance,
            verifications,
            supervisor_logs,
            inbox: InboxService::new(in_app.clone(), store_timeout),
            in_app,
            preferences,
            email,
            sms,
            router,
            verification,
            reconciliation,
        };
        env.seed().await;
        env
    }

    async fn seed(&self) {
        let people = [
            (LECTURER, "Dr. Okafor", UserRole::Lecturer, Some(PROGRAMME)),
            (CLASS_REP, "Ada Eze", UserRole::ClassRep, Some(PROGRAMME)),
            (COORDINATOR_A, "Prof. Bello", UserRole::Coordinator, Some(PROGRAMME)),
            (COORDINATOR_B, "Dr. Musa", UserRole::Coordinator, Some(PROGRAMME)),
            (OTHER_COORDINATOR, "Dr. Ade", UserRole::Coordinator, Some(OTHER_PROGRAMME)),
            (ADMIN, "Registry Admin", UserRole::Admin, None),
            (STUDENT, "Tunde Ola", UserRole::Student, Some(PROGRAMME)),
            (SUPERVISOR, "Mrs. Nwosu", UserRole::Supervisor, Some(PROGRAMME)),
        ];
        for (id, name, role, programme) in people {
            self.users
                .create_user(&User {
                    id: id.to_string(),
                    name: name.to_string(),
                    email: Some(format!("{}@example.edu", id)),
                    phone: Some("+2348012345678".to_string()),
                    role,
                    programme_id: programme.map(str::to_string),
                })
                .await
                .unwrap();
        }

        self.attendance
            .create_schedule(&CourseSchedule {
                id: SCHEDULE.to_string(),
                course_code: "CSC301".to_string(),
                course_title: "Data Structures".to_string(),
                lecturer_id: LECTURER.to_string(),
                programme_id: PROGRAMME.to_string(),
                venue: Some("LT-2".to_string()),
            })
            .await
            .unwrap();
    }

    /// Record the lecturer's attendance for `date`.
    pub async fn record_attendance(&self, date: NaiveDate) -> AttendanceRecord {
        let record = AttendanceRecord::new(
            SCHEDULE,
            LECTURER,
            date,
            Utc.from_utc_datetime(&date.and_hms_opt(9, 0, 0).unwrap()),
            AttendanceMethod::Onsite,
            true,
        );
        self.attendance.create_record(&record).await.unwrap();
        record
    }
}
