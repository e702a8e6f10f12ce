//! Service container for dependency injection.
//!
//! Builds the repositories, the preference store, the notification router and
//! the workflow services from one configuration and database pool.

use std::sync::Arc;

use tracing::info;

use crate::config::AppConfig;
use crate::database::DbPool;
use crate::database::repositories::{
    AttendanceRepository, InAppNotificationRepository, SqlxAttendanceRepository,
    SqlxInAppNotificationRepository, SqlxPreferenceRepository, SqlxSupervisorLogRepository,
    SqlxUserRepository, SqlxVerificationRepository, SupervisorLogRepository, UserRepository,
    VerificationRepository,
};
use crate::notification::channels::{EmailChannel, InAppChannel, SmsChannel};
use crate::notification::{InboxService, NotificationPreferences, NotificationRouter, PreferenceStore};
use crate::supervisor::ReconciliationService;
use crate::verification::VerificationService;

/// Service container holding all application services.
pub struct ServiceContainer {
    pub pool: DbPool,
    pub users: Arc<dyn UserRepository>,
    pub attendance: Arc<dyn AttendanceRepository>,
    pub preferences: Arc<PreferenceStore>,
    pub inbox: Arc<InboxService>,
    pub router: Arc<NotificationRouter>,
    pub verification: Arc<VerificationService>,
    pub reconciliation: Arc<ReconciliationService>,
}

impl ServiceContainer {
    /// Wire everything with the built-in default preferences.
    pub fn new(config: &AppConfig, pool: DbPool) -> Self {
        Self::with_default_preferences(config, pool, NotificationPreferences::default())
    }

    /// Wire everything, handing `defaults` to users without stored preferences.
    pub fn with_default_preferences(
        config: &AppConfig,
        pool: DbPool,
        defaults: NotificationPreferences,
    ) -> Self {
        let users: Arc<dyn UserRepository> = Arc::new(SqlxUserRepository::new(pool.clone()));
        let attendance: Arc<dyn AttendanceRepository> =
            Arc::new(SqlxAttendanceRepository::new(pool.clone()));
        let verifications: Arc<dyn VerificationRepository> =
            Arc::new(SqlxVerificationRepository::new(pool.clone()));
        let supervisor_logs: Arc<dyn SupervisorLogRepository> =
            Arc::new(SqlxSupervisorLogRepository::new(pool.clone()));
        let in_app: Arc<dyn InAppNotificationRepository> =
            Arc::new(SqlxInAppNotificationRepository::new(pool.clone()));

        let preferences = Arc::new(PreferenceStore::new(
            Arc::new(SqlxPreferenceRepository::new(pool.clone())),
            defaults,
            config.store_timeout(),
        ));

        let router = Arc::new(
            NotificationRouter::new(
                config.router.clone(),
                preferences.clone(),
                users.clone(),
                in_app.clone(),
            )
            .with_sender(Arc::new(InAppChannel::new(in_app.clone())))
            .with_sender(Arc::new(EmailChannel::new(config.email.clone())))
            .with_sender(Arc::new(SmsChannel::new(config.sms.clone()))),
        );

        let verification = Arc::new(VerificationService::new(
            attendance.clone(),
            verifications,
            users.clone(),
            router.clone(),
            config.store_timeout(),
        ));

        let reconciliation = Arc::new(ReconciliationService::new(
            attendance.clone(),
            supervisor_logs,
            config.institution_timezone,
            config.store_timeout(),
        ));

        info!(
            channels = ?router.registered_channels(),
            "Services initialized"
        );

        Self {
            pool,
            users,
            attendance,
            preferences,
            inbox: Arc::new(InboxService::new(in_app, config.store_timeout())),
            router,
            verification,
            reconciliation,
        }
    }
}
