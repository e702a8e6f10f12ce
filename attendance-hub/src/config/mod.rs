//! Process configuration loaded from environment variables.
//!
//! Supported variables (all optional):
//! - `DATABASE_URL` (default `sqlite:attendance-hub.db?mode=rwc`)
//! - `LOG_DIR` (default `logs`)
//! - `INSTITUTION_TIMEZONE` IANA name used to derive calendar days (default `UTC`)
//! - `APP_NAME`, `APP_BASE_URL` used in rendered notifications
//! - `NOTIFICATION_CHANNEL_TIMEOUT_MS`, `STORE_TIMEOUT_MS`
//! - `EMAIL_API_URL`, `EMAIL_API_KEY`, `EMAIL_FROM`
//! - `SMS_API_URL`, `SMS_API_KEY`, `SMS_SENDER_ID`

use std::time::Duration;

use chrono_tz::Tz;
use tracing::info;

use crate::notification::channels::{EmailConfig, SmsConfig};
use crate::notification::router::NotificationRouterConfig;
use crate::notification::templates::TemplateContext;
use crate::{Error, Result};

const DEFAULT_DATABASE_URL: &str = "sqlite:attendance-hub.db?mode=rwc";
const DEFAULT_LOG_DIR: &str = "logs";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_dir: String,
    pub institution_timezone: Tz,
    pub router: NotificationRouterConfig,
    pub email: EmailConfig,
    pub sms: SmsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            log_dir: DEFAULT_LOG_DIR.to_string(),
            institution_timezone: chrono_tz::UTC,
            router: NotificationRouterConfig::default(),
            email: EmailConfig::default(),
            sms: SmsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(url) = get("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(dir) = get("LOG_DIR") {
            config.log_dir = dir;
        }
        if let Some(tz) = get("INSTITUTION_TIMEZONE") {
            config.institution_timezone = tz
                .parse::<Tz>()
                .map_err(|_| Error::config(format!("INSTITUTION_TIMEZONE: unknown timezone '{}'", tz)))?;
        }

        let mut templates = TemplateContext::default();
        if let Some(name) = get("APP_NAME") {
            templates.app_name = name;
        }
        templates.base_url = get("APP_BASE_URL").map(|u| u.trim_end_matches('/').to_string());
        config.router.templates = templates;

        if let Some(raw) = get("NOTIFICATION_CHANNEL_TIMEOUT_MS") {
            config.router.channel_timeout_ms = parse_millis("NOTIFICATION_CHANNEL_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = get("STORE_TIMEOUT_MS") {
            config.router.store_timeout_ms = parse_millis("STORE_TIMEOUT_MS", &raw)?;
        }

        if let (Some(api_url), Some(from_address)) = (get("EMAIL_API_URL"), get("EMAIL_FROM")) {
            config.email = EmailConfig {
                enabled: true,
                api_url,
                api_key: get("EMAIL_API_KEY"),
                from_address,
                ..EmailConfig::default()
            };
        }

        if let (Some(api_url), Some(api_key)) = (get("SMS_API_URL"), get("SMS_API_KEY")) {
            config.sms = SmsConfig {
                enabled: true,
                api_url,
                api_key: Some(api_key),
                sender_id: get("SMS_SENDER_ID").unwrap_or_else(|| "ATTENDANCE".to_string()),
                ..SmsConfig::default()
            };
        }

        info!(
            timezone = %config.institution_timezone,
            email = config.email.enabled,
            sms = config.sms.enabled,
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.router.store_timeout_ms)
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<u64> {
    match raw.parse::<u64>() {
        Ok(0) => Err(Error::config(format!("{}: must be greater than zero", key))),
        Ok(ms) => Ok(ms),
        Err(_) => Err(Error::config(format!("{}: expected milliseconds, got '{}'", key, raw))),
    }
}
