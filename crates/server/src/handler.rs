//! MCP server handler.
//!
//! Each worker event the host observes is one tool call. Handlers run
//! against the single `WorkerContext` of this generation.

use std::sync::Arc;

use kanthu_worker::WorkerContext;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::tools::{
    ClickParams, FetchParams, PushParams, QueueParams, SyncParams, activate_impl, click_impl, fetch_impl,
    install_impl, push_impl, queue_impl, status_impl, sync_impl,
};

#[derive(Clone)]
pub struct KanthuWorkerServer {
    tool_router: ToolRouter<Self>,
    ctx: Arc<WorkerContext>,
}

#[tool_router]
impl KanthuWorkerServer {
    pub fn new(ctx: Arc<WorkerContext>) -> Self {
        Self { tool_router: Self::tool_router(), ctx }
    }

    #[tool(description = "Install event. Precaches the manifest into the current cache version; all-or-nothing.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.ctx).await
    }

    #[tool(description = "Activate event. Deletes every other cache version and starts handling fetches.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.ctx).await
    }

    /// Cache first, then network, then the offline page for navigations.
    #[tool(
        description = "Fetch event. Answers a request from the cache, the network, or the offline page for navigations."
    )]
    async fn sw_fetch(&self, params: Parameters<FetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.ctx, params.0).await
    }

    #[tool(description = "Sync event. Replays the submission queued under the tag; fails if it must be retried.")]
    async fn sw_sync(&self, params: Parameters<SyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.ctx, params.0).await
    }

    #[tool(description = "Push event. Returns the notification to display.")]
    async fn sw_push(&self, params: Parameters<PushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.ctx, params.0).await
    }

    #[tool(description = "Notification click. Returns whether to close it and which URL to open, if any.")]
    async fn sw_notification_click(&self, params: Parameters<ClickParams>) -> Result<CallToolResult, McpError> {
        click_impl(&self.ctx, params.0).await
    }

    #[tool(description = "Queue a form payload for background sync, replacing any payload queued under the tag.")]
    async fn sw_queue_submission(&self, params: Parameters<QueueParams>) -> Result<CallToolResult, McpError> {
        queue_impl(&self.ctx, params.0).await
    }

    #[tool(description = "Lifecycle state, cache versions in the store, and tags with queued submissions.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.ctx).await
    }
}

impl ServerHandler for KanthuWorkerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "kanthu-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
