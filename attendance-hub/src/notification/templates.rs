//! Message templates.
//!
//! Renders an event into the per-channel content the senders need. Events whose
//! payload has no dedicated template fall back to a generic title + message
//! rendering.

use serde::{Deserialize, Serialize};

use super::events::{NotificationEvent, NotificationPayload, NotificationPriority};

/// Maximum length of a single SMS segment.
pub const SMS_MAX_CHARS: usize = 160;

/// Values shared by every rendered message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateContext {
    /// Product name used in subjects and footers.
    pub app_name: String,
    /// Base URL used to build links when an event has no explicit action URL.
    pub base_url: Option<String>,
}

impl Default for TemplateContext {
    fn default() -> Self {
        Self {
            app_name: "Attendance Hub".to_string(),
            base_url: None,
        }
    }
}

/// Content ready for the channel senders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedMessage {
    pub template: Option<String>,
    pub title: String,
    pub body: String,
    pub email_subject: String,
    pub email_text: String,
    pub email_html: String,
    pub sms_text: String,
    pub action_url: Option<String>,
}

/// Render `event` for every channel.
pub fn render(event: &NotificationEvent, ctx: &TemplateContext) -> RenderedMessage {
    let payload = &event.payload;
    let title = payload.title();
    let body = payload.description();
    let action_url = event
        .action_url
        .clone()
        .or_else(|| default_action_url(payload, ctx));

    let email_subject = match event.priority {
        NotificationPriority::Urgent => format!("[{}] URGENT: {}", ctx.app_name, title),
        _ => format!("[{}] {}", ctx.app_name, title),
    };

    let mut email_text = format!("{}\n\n{}", title, body);
    if let Some(url) = &action_url {
        email_text.push_str(&format!("\n\nOpen: {}", url));
    }
    email_text.push_str(&format!(
        "\n\nPriority: {} | Category: {}",
        event.priority, event.category
    ));

    RenderedMessage {
        template: payload.template_name().map(str::to_string),
        email_html: build_html(event, ctx, &title, &body, action_url.as_deref()),
        sms_text: build_sms(event, ctx, &title, payload),
        title,
        body,
        email_subject,
        email_text,
        action_url,
    }
}

fn default_action_url(payload: &NotificationPayload, ctx: &TemplateContext) -> Option<String> {
    let base = ctx.base_url.as_deref()?.trim_end_matches('/');
    match payload {
        NotificationPayload::VerificationRequest { request_id, .. }
        | NotificationPayload::VerificationStatusUpdate { request_id, .. }
        | NotificationPayload::EscalationAlert { request_id, .. } => {
            Some(format!("{}/verifications/{}", base, request_id))
        }
        NotificationPayload::AttendanceReminder { .. } => Some(format!("{}/attendance", base)),
        NotificationPayload::Message { .. } => None,
    }
}

fn build_html(
    event: &NotificationEvent,
    ctx: &TemplateContext,
    title: &str,
    body: &str,
    action_url: Option<&str>,
) -> String {
    let header_color = match event.priority {
        NotificationPriority::Low => "#808080",
        NotificationPriority::Normal => "#3498db",
        NotificationPriority::High => "#f39c12",
        NotificationPriority::Urgent => "#e74c3c",
    };

    let action = action_url
        .map(|url| {
            format!(
                r#"<p><a href="{}" style="color: {};">View details</a></p>"#,
                escape_html(url),
                header_color
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 20px; }}
        .header {{ background-color: {}; color: white; padding: 15px; border-radius: 5px; }}
        .content {{ padding: 20px; background-color: #f9f9f9; border-radius: 5px; margin-top: 10px; }}
        .footer {{ color: #666; font-size: 12px; margin-top: 20px; }}
    </style>
</head>
<body>
    <div class="header">
        <h2>{}</h2>
    </div>
    <div class="content">
        <p>{}</p>
        {}
    </div>
    <div class="footer">
        <p>{} | Priority: {} | Category: {}</p>
    </div>
</body>
</html>"#,
        header_color,
        escape_html(title),
        escape_html(body),
        action,
        escape_html(&ctx.app_name),
        event.priority,
        event.category,
    )
}

fn build_sms(
    event: &NotificationEvent,
    ctx: &TemplateContext,
    title: &str,
    payload: &NotificationPayload,
) -> String {
    let text = match payload {
        NotificationPayload::VerificationStatusUpdate {
            course_code,
            attendance_date,
            status,
            ..
        } => format!(
            "{}: verification for {} on {} was {}.",
            ctx.app_name, course_code, attendance_date, status
        ),
        NotificationPayload::EscalationAlert {
            course_code,
            attendance_date,
            ..
        } => format!(
            "{} URGENT: disputed attendance for {} on {} needs review.",
            ctx.app_name, course_code, attendance_date
        ),
        _ if event.priority == NotificationPriority::Urgent => {
            format!("{} URGENT: {}", ctx.app_name, title)
        }
        _ => format!("{}: {}", ctx.app_name, title),
    };
    truncate_chars(&text, SMS_MAX_CHARS)
}

/// Cut `text` to at most `max` characters, marking the cut with "...".
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VerificationStatus;
    use crate::notification::events::NotificationCategory;
    use chrono::NaiveDate;

    fn status_update_event() -> NotificationEvent {
        NotificationEvent::new(
            NotificationCategory::Verification,
            NotificationPriority::High,
            NotificationPayload::VerificationStatusUpdate {
                request_id: "req-9".to_string(),
                course_code: "CSC201".to_string(),
                attendance_date: NaiveDate::from_ymd_opt(2026, 4, 14).unwrap(),
                status: VerificationStatus::Rejected,
                review_notes: Some("Did not attend <really>".to_string()),
            },
        )
    }

    #[test]
    fn test_render_status_update() {
        let ctx = TemplateContext {
            app_name: "Attendance Hub".to_string(),
            base_url: Some("https://attendance.example.edu/".to_string()),
        };
        let rendered = render(&status_update_event(), &ctx);

        assert_eq!(
            rendered.template.as_deref(),
            Some("verification-status-update")
        );
        assert!(rendered.email_subject.starts_with("[Attendance Hub]"));
        assert_eq!(
            rendered.action_url.as_deref(),
            Some("https://attendance.example.edu/verifications/req-9")
        );
        assert!(rendered.sms_text.contains("rejected"));
        assert!(rendered.email_html.contains("&lt;really&gt;"));
        assert!(!rendered.email_html.contains("<really>"));
    }

    #[test]
    fn test_generic_fallback() {
        let event = NotificationEvent::new(
            NotificationCategory::System,
            NotificationPriority::Urgent,
            NotificationPayload::Message {
                title: "Server maintenance".to_string(),
                message: "Downtime at midnight".to_string(),
            },
        );
        let rendered = render(&event, &TemplateContext::default());

        assert!(rendered.template.is_none());
        assert_eq!(rendered.title, "Server maintenance");
        assert_eq!(rendered.body, "Downtime at midnight");
        assert!(rendered.email_subject.contains("URGENT"));
        assert!(rendered.action_url.is_none());
    }

    #[test]
    fn test_explicit_action_url_wins() {
        let event = status_update_event().with_action_url("https://x.test/custom");
        let ctx = TemplateContext {
            base_url: Some("https://attendance.example.edu".to_string()),
            ..Default::default()
        };
        let rendered = render(&event, &ctx);
        assert_eq!(rendered.action_url.as_deref(), Some("https://x.test/custom"));
    }

    #[test]
    fn test_sms_is_truncated() {
        let event = NotificationEvent::new(
            NotificationCategory::System,
            NotificationPriority::Normal,
            NotificationPayload::Message {
                title: "é".repeat(300),
                message: String::new(),
            },
        );
        let rendered = render(&event, &TemplateContext::default());
        assert_eq!(rendered.sms_text.chars().count(), SMS_MAX_CHARS);
        assert!(rendered.sms_text.ends_with("..."));
    }
}
