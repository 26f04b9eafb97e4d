//! sw_push and sw_notification_click.
//!
//! The worker only decides what to show and where to go; the host displays
//! the notification and opens the window.

use kanthu_worker::{WorkerContext, notify};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for the sw_push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PushParams {
    /// Push message text, if the message carried one.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Input parameters for the sw_notification_click tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ClickParams {
    /// Action button clicked; absent for a click on the notification body.
    #[serde(default)]
    pub action: Option<String>,
}

pub async fn push_impl(ctx: &WorkerContext, params: PushParams) -> Result<CallToolResult, McpError> {
    let intent = notify::push(&ctx.config().notification, params.payload.as_deref());
    tracing::debug!(body = %intent.body, "push received");
    json_result(&intent)
}

pub async fn click_impl(ctx: &WorkerContext, params: ClickParams) -> Result<CallToolResult, McpError> {
    json_result(&notify::notification_click(ctx, params.action.as_deref())?)
}
