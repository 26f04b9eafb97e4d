//! sw_fetch tool implementation.
//!
//! Routes one intercepted request through the worker and returns the
//! response the page should receive.

use std::collections::BTreeMap;

use kanthu_core::{Destination, RequestMode, ResponseType, WorkerRequest};
use kanthu_worker::{ResponseSource, WorkerContext, interceptor};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::HostError;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Request URL; paths are resolved against the site origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// What the request loads; `document` marks a navigation.
    #[serde(default)]
    pub destination: Destination,

    #[serde(default)]
    pub mode: RequestMode,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// UTF-8 request body.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchOutput {
    /// URL the response was produced for.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub response_type: ResponseType,
    pub source: ResponseSource,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, invalid sequences replaced.
    pub body: String,
    pub body_bytes: usize,
    /// A background copy into the current cache version was started.
    pub cache_write_scheduled: bool,
}

fn build_request(ctx: &WorkerContext, params: FetchParams) -> Result<WorkerRequest, McpError> {
    if params.url.trim().is_empty() {
        return Err(HostError::InvalidParams("url cannot be empty".into()).into());
    }
    if params.method.is_empty() || !params.method.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(HostError::InvalidParams(format!("invalid method: {:?}", params.method)).into());
    }

    let url = ctx.resolve(&params.url)?;
    Ok(WorkerRequest {
        method: params.method.to_ascii_uppercase(),
        url,
        destination: params.destination,
        mode: params.mode,
        headers: params.headers.into_iter().collect(),
        body: params.body.map(Into::into),
    })
}

pub async fn fetch(ctx: &WorkerContext, params: FetchParams) -> Result<FetchOutput, McpError> {
    let request = build_request(ctx, params)?;
    let outcome = interceptor::handle_fetch(ctx, request).await?;
    let response = outcome.response;

    Ok(FetchOutput {
        url: response.url,
        status: response.status,
        status_text: response.status_text,
        response_type: response.response_type,
        source: outcome.source,
        headers: response.headers,
        body: String::from_utf8_lossy(&response.body).into_owned(),
        body_bytes: response.body.len(),
        cache_write_scheduled: outcome.population.is_some(),
    })
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(ctx: &WorkerContext, params: FetchParams) -> Result<CallToolResult, McpError> {
    json_result(&fetch(ctx, params).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::context;
    use kanthu_worker::lifecycle;

    fn params(url: &str) -> FetchParams {
        FetchParams {
            url: url.into(),
            method: default_method(),
            destination: Destination::Empty,
            mode: RequestMode::Cors,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn test_fetch_before_activation_fails() {
        let (ctx, _) = context().await;
        let err = fetch(&ctx, params("/")).await.unwrap_err();
        assert!(err.message.starts_with("NOT_ACTIVE"));
    }

    #[tokio::test]
    async fn test_fetch_serves_precached_page_offline() {
        let (ctx, network) = context().await;
        lifecycle::install(&ctx).await.unwrap();
        lifecycle::activate(&ctx).await.unwrap();
        network.set_offline(true);

        let output = fetch(&ctx, params("/")).await.unwrap();
        assert_eq!(output.source, ResponseSource::Cache);
        assert_eq!(output.status, 200);
        assert_eq!(output.body, "page /");
        assert!(!output.cache_write_scheduled);
    }

    #[tokio::test]
    async fn test_fetch_offline_navigation_fallback() {
        let (ctx, network) = context().await;
        lifecycle::install(&ctx).await.unwrap();
        lifecycle::activate(&ctx).await.unwrap();
        network.set_offline(true);

        let navigation =
            FetchParams { destination: Destination::Document, mode: RequestMode::Navigate, ..params("/about.html") };
        let output = fetch(&ctx, navigation).await.unwrap();
        assert_eq!(output.source, ResponseSource::OfflineFallback);
        assert_eq!(output.body, "page /offline.html");
    }

    #[tokio::test]
    async fn test_fetch_miss_schedules_cache_write() {
        let (ctx, _) = context().await;
        lifecycle::install(&ctx).await.unwrap();
        lifecycle::activate(&ctx).await.unwrap();

        let output = fetch(&ctx, params("/gadgets.html")).await.unwrap();
        assert_eq!(output.source, ResponseSource::Network);
        assert!(output.cache_write_scheduled);
    }

    #[tokio::test]
    async fn test_fetch_rejects_bad_method() {
        let (ctx, _) = context().await;
        let bad = FetchParams { method: "GE T".into(), ..params("/") };
        let err = fetch(&ctx, bad).await.unwrap_err();
        assert!(err.message.starts_with("INVALID_PARAMS"));
    }
}
