//! sw_sync and sw_queue_submission.

use kanthu_worker::{SyncOutcome, SyncTag, WorkerContext, sync};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::HostError;

/// Input parameters for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncParams {
    /// Sync event tag, e.g. `contact-form-sync`.
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncOutput {
    pub tag: String,
    pub outcome: SyncOutcome,
}

/// Input parameters for the sw_queue_submission tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QueueParams {
    pub tag: SyncTag,
    /// JSON object to POST when the sync fires.
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QueueOutput {
    pub tag: SyncTag,
    pub queued_at: String,
}

/// Implementation of the sw_sync tool.
///
/// A failed replay surfaces as a `REPLAY_FAILED` error so the host keeps the
/// sync registered and fires it again later.
pub async fn sync_impl(ctx: &WorkerContext, params: SyncParams) -> Result<CallToolResult, McpError> {
    let outcome = sync::replay(ctx, &params.tag).await?;
    json_result(&SyncOutput { tag: params.tag, outcome })
}

/// Implementation of the sw_queue_submission tool.
pub async fn queue_impl(ctx: &WorkerContext, params: QueueParams) -> Result<CallToolResult, McpError> {
    if !params.payload.is_object() {
        return Err(HostError::InvalidParams("payload must be a JSON object".into()).into());
    }

    let submission = sync::queue_submission(ctx, params.tag, &params.payload).await?;
    json_result(&QueueOutput { tag: params.tag, queued_at: submission.queued_at })
}
