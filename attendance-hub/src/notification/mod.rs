//! Notification module for multi-channel delivery.
//!
//! Events are resolved per user against their preferences, rendered once and
//! fanned out concurrently to the configured channel senders:
//! - In-app (persisted inbox entry, always attempted)
//! - Email (HTTP transactional mail API)
//! - SMS (HTTP gateway)

pub mod channels;
pub mod events;
pub mod inbox;
pub mod preferences;
pub mod router;
pub mod templates;

pub use channels::{ChannelSender, OutboundMessage, Recipient, SendReceipt};
pub use events::{
    ChannelType, NotificationCategory, NotificationEvent, NotificationPayload,
    NotificationPriority,
};
pub use inbox::{DueNotification, InAppNotification, InboxService};
pub use preferences::{
    CategoryChannel, ChannelSetting, NotificationPreferences, PreferenceStore, QuietHours,
};
pub use router::{
    ChannelDelivery, DeliveryRoute, NotificationRouter, NotificationRouterConfig, RouteOutcome,
    UserDelivery, resolve_channels,
};
pub use templates::{RenderedMessage, TemplateContext};
