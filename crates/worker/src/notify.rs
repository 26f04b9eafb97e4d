//! Push notifications and notification clicks.

use kanthu_core::{Error, NotificationConfig};
use serde::{Deserialize, Serialize};

use crate::context::WorkerContext;

/// Action that opens the site root.
pub const ACTION_EXPLORE: &str = "explore";
/// Action that only dismisses.
pub const ACTION_CLOSE: &str = "close";

/// A button on a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

/// Data attached to a notification for the click handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationData {
    /// Milliseconds since the Unix epoch.
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

/// A notification for the host to display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationIntent {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

/// What the host should do after a notification click.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ClickOutcome {
    /// The clicked notification is dismissed.
    pub close: bool,
    /// URL to open in a new window or tab.
    pub open_window: Option<String>,
}

/// Build the notification for a push message.
///
/// An absent or empty payload gets the configured default body.
pub fn push(config: &NotificationConfig, payload: Option<&str>) -> NotificationIntent {
    let body = match payload {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => config.default_body.clone(),
    };

    NotificationIntent {
        title: config.title.clone(),
        body,
        icon: config.icon.clone(),
        badge: config.badge.clone(),
        vibrate: config.vibrate.clone(),
        data: NotificationData { date_of_arrival: chrono::Utc::now().timestamp_millis(), primary_key: 1 },
        actions: vec![
            NotificationAction { action: ACTION_EXPLORE.into(), title: "View Content".into(), icon: config.icon.clone() },
            NotificationAction { action: ACTION_CLOSE.into(), title: "Close".into(), icon: config.icon.clone() },
        ],
    }
}

/// Handle a click on a displayed notification.
///
/// The notification is always closed; only `explore` navigates.
pub fn notification_click(ctx: &WorkerContext, action: Option<&str>) -> Result<ClickOutcome, Error> {
    let open_window = match action {
        Some(ACTION_EXPLORE) => Some(ctx.resolve("/")?.to_string()),
        _ => None,
    };
    tracing::debug!(action = action.unwrap_or(""), opens = open_window.is_some(), "notification clicked");
    Ok(ClickOutcome { close: true, open_window })
}
