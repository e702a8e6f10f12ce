//! Per-user notification preferences.
//!
//! The document schema, quiet-hour evaluation and the store accessor that
//! lazily creates a user's document from injected defaults.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::events::{ChannelType, NotificationCategory, NotificationPriority};
use crate::database::repositories::PreferenceRepository;
use crate::utils::with_timeout;
use crate::{Error, Result};

const QUIET_HOURS_FORMAT: &str = "%H:%M";

/// Global switch for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSetting {
    pub enabled: bool,
    /// Minimum event priority, used by category entries without their own.
    #[serde(default)]
    pub priority: NotificationPriority,
}

/// One entry of a category's ordered channel list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryChannel {
    pub channel: ChannelType,
    pub enabled: bool,
    /// Minimum event priority for this channel in this category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<NotificationPriority>,
}

impl CategoryChannel {
    pub fn new(channel: ChannelType) -> Self {
        Self {
            channel,
            enabled: true,
            priority: None,
        }
    }

    pub fn min_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// Daily window during which only in-app delivery happens for non-urgent events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    pub enabled: bool,
    /// "HH:MM", inclusive.
    pub start: String,
    /// "HH:MM", exclusive.
    pub end: String,
    /// IANA timezone name, e.g. "Africa/Lagos".
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl QuietHours {
    pub fn new(start: &str, end: &str, timezone: &str) -> Self {
        Self {
            enabled: true,
            start: start.to_string(),
            end: end.to_string(),
            timezone: timezone.to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        parse_clock(&self.start)?;
        parse_clock(&self.end)?;
        self.timezone
            .parse::<Tz>()
            .map_err(|_| Error::validation(format!("unknown timezone '{}'", self.timezone)))?;
        Ok(())
    }

    /// Whether `now` falls inside the window in the configured timezone.
    ///
    /// The window is `[start, end)`; `start > end` wraps across midnight and
    /// `start == end` is an empty window. An unknown timezone is treated as UTC;
    /// unparsable bounds disable the window.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }

        let (Ok(start), Ok(end)) = (parse_clock(&self.start), parse_clock(&self.end)) else {
            warn!(
                start = %self.start,
                end = %self.end,
                "Ignoring quiet hours with invalid bounds"
            );
            return false;
        };

        let local = match self.timezone.parse::<Tz>() {
            Ok(tz) => now.with_timezone(&tz).time(),
            Err(_) => {
                warn!(timezone = %self.timezone, "Unknown quiet-hours timezone, using UTC");
                now.time()
            }
        };

        if start <= end {
            local >= start && local < end
        } else {
            local >= start || local < end
        }
    }
}

fn parse_clock(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), QUIET_HOURS_FORMAT)
        .map_err(|_| Error::validation(format!("invalid time '{}', expected HH:MM", raw)))
}

/// A user's notification configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    #[serde(default)]
    pub channels: BTreeMap<ChannelType, ChannelSetting>,
    #[serde(default)]
    pub categories: BTreeMap<NotificationCategory, Vec<CategoryChannel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_hours: Option<QuietHours>,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        use ChannelType::*;
        use NotificationCategory::*;
        use NotificationPriority::*;

        let setting = |enabled, priority| ChannelSetting { enabled, priority };
        let channels = BTreeMap::from([
            (InApp, setting(true, Low)),
            (Email, setting(true, Low)),
            (Sms, setting(true, High)),
            (Push, setting(false, Normal)),
        ]);

        let categories = BTreeMap::from([
            (
                Attendance,
                vec![CategoryChannel::new(InApp), CategoryChannel::new(Email)],
            ),
            (
                Verification,
                vec![
                    CategoryChannel::new(InApp),
                    CategoryChannel::new(Email),
                    CategoryChannel::new(Sms).min_priority(High),
                ],
            ),
            (System, vec![CategoryChannel::new(InApp)]),
            (
                Reminder,
                vec![CategoryChannel::new(InApp), CategoryChannel::new(Email)],
            ),
            (
                Escalation,
                vec![
                    CategoryChannel::new(InApp),
                    CategoryChannel::new(Email),
                    CategoryChannel::new(Sms),
                ],
            ),
        ]);

        Self {
            channels,
            categories,
            quiet_hours: None,
        }
    }
}

impl NotificationPreferences {
    pub fn validate(&self) -> Result<()> {
        if let Some(quiet_hours) = &self.quiet_hours {
            quiet_hours.validate()?;
        }
        Ok(())
    }

    pub fn channel_enabled(&self, channel: ChannelType) -> bool {
        self.channels.get(&channel).is_none_or(|s| s.enabled)
    }

    fn channel_min_priority(&self, channel: ChannelType) -> NotificationPriority {
        self.channels
            .get(&channel)
            .map(|s| s.priority)
            .unwrap_or(NotificationPriority::Low)
    }

    /// Channels the category is configured to use for an event at `priority`.
    ///
    /// Order follows the category list; `in_app` is not added here.
    pub fn channels_for(
        &self,
        category: NotificationCategory,
        priority: NotificationPriority,
    ) -> Vec<ChannelType> {
        let Some(entries) = self.categories.get(&category) else {
            return Vec::new();
        };

        let mut selected = Vec::with_capacity(entries.len());
        for entry in entries {
            if !entry.enabled || !self.channel_enabled(entry.channel) {
                continue;
            }
            let minimum = entry
                .priority
                .unwrap_or_else(|| self.channel_min_priority(entry.channel));
            if !priority.meets(minimum) {
                debug!(
                    channel = %entry.channel,
                    %priority,
                    %minimum,
                    "Channel below priority threshold"
                );
                continue;
            }
            if !selected.contains(&entry.channel) {
                selected.push(entry.channel);
            }
        }
        selected
    }

    pub fn in_quiet_hours(&self, now: DateTime<Utc>) -> bool {
        self.quiet_hours
            .as_ref()
            .is_some_and(|q| q.is_active_at(now))
    }
}

/// Accessor over the key-value preference store.
pub struct PreferenceStore {
    repo: Arc<dyn PreferenceRepository>,
    defaults: NotificationPreferences,
    store_timeout: Duration,
}

impl PreferenceStore {
    /// Create a store that hands out `defaults` to users without a document.
    pub fn new(
        repo: Arc<dyn PreferenceRepository>,
        defaults: NotificationPreferences,
        store_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            defaults,
            store_timeout,
        }
    }

    pub fn defaults(&self) -> &NotificationPreferences {
        &self.defaults
    }

    /// Load a user's preferences, persisting the defaults on first access.
    ///
    /// A stored document that no longer parses is replaced by the defaults for
    /// this read only; it is left untouched in the store.
    pub async fn get_or_create(&self, user_id: &str) -> Result<NotificationPreferences> {
        if let Some(raw) = self.load(user_id).await? {
            return match serde_json::from_str(&raw) {
                Ok(prefs) => Ok(prefs),
                Err(e) => {
                    warn!(user_id, error = %e, "Stored notification preferences are invalid, using defaults");
                    Ok(self.defaults.clone())
                }
            };
        }

        let raw = serde_json::to_string(&self.defaults)?;
        let inserted = with_timeout(
            self.store_timeout,
            "create default preferences",
            self.repo.insert_if_absent(user_id, &raw),
        )
        .await?;
        if inserted {
            debug!(user_id, "Created default notification preferences");
            return Ok(self.defaults.clone());
        }

        // Lost a race with a concurrent first access; read the winner.
        match self.load(user_id).await? {
            Some(raw) => Ok(serde_json::from_str(&raw).unwrap_or_else(|_| self.defaults.clone())),
            None => Ok(self.defaults.clone()),
        }
    }

    /// Replace a user's preferences after validating them.
    pub async fn update(
        &self,
        user_id: &str,
        preferences: &NotificationPreferences,
    ) -> Result<()> {
        preferences.validate()?;
        let raw = serde_json::to_string(preferences)?;
        with_timeout(
            self.store_timeout,
            "update preferences",
            self.repo.put_preferences(user_id, &raw),
        )
        .await
    }

    /// Drop a user's document so the defaults apply again.
    pub async fn reset(&self, user_id: &str) -> Result<()> {
        with_timeout(
            self.store_timeout,
            "reset preferences",
            self.repo.delete_preferences(user_id),
        )
        .await
    }

    async fn load(&self, user_id: &str) -> Result<Option<String>> {
        with_timeout(
            self.store_timeout,
            "load preferences",
            self.repo.get_preferences(user_id),
        )
        .await
    }
}
