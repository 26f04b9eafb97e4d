//! sw_install, sw_activate and sw_status.

use kanthu_core::Error;
use kanthu_worker::{SyncTag, WorkerContext, WorkerState, lifecycle};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the sw_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatusOutput {
    pub state: WorkerState,
    /// Cache version owned by this generation.
    pub cache_version: String,
    /// Cache versions present in the store, oldest first.
    pub caches: Vec<String>,
    /// Sync tags with a queued submission.
    pub pending: Vec<SyncTag>,
}

pub async fn install_impl(ctx: &WorkerContext) -> Result<CallToolResult, McpError> {
    json_result(&lifecycle::install(ctx).await?)
}

pub async fn activate_impl(ctx: &WorkerContext) -> Result<CallToolResult, McpError> {
    json_result(&lifecycle::activate(ctx).await?)
}

pub async fn status(ctx: &WorkerContext) -> Result<StatusOutput, Error> {
    let mut pending = Vec::new();
    for tag in [SyncTag::ContactForm, SyncTag::Newsletter] {
        if ctx.db().get_submission(tag.storage_key()).await?.is_some() {
            pending.push(tag);
        }
    }

    Ok(StatusOutput {
        state: ctx.state().await,
        cache_version: ctx.cache_name().to_string(),
        caches: ctx.db().cache_names().await?,
        pending,
    })
}

pub async fn status_impl(ctx: &WorkerContext) -> Result<CallToolResult, McpError> {
    json_result(&status(ctx).await?)
}
