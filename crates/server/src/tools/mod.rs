//! One tool per worker event, plus status and submission queueing.

pub mod fetch;
pub mod lifecycle;
pub mod notify;
pub mod sync;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::HostError;

pub use fetch::{FetchParams, fetch_impl};
pub use lifecycle::{activate_impl, install_impl, status_impl};
pub use notify::{ClickParams, PushParams, click_impl, push_impl};
pub use sync::{QueueParams, SyncParams, queue_impl, sync_impl};

/// Encode a handler result as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(HostError::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
