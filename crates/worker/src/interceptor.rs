//! Fetch interception: cache first, then network, then the offline page.

use kanthu_core::cache::hash::compute_request_key;
use kanthu_core::{CacheEntry, Error, WorkerRequest, WorkerResponse};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::context::{WorkerContext, WorkerState};

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    Cache,
    Network,
    OfflineFallback,
}

/// The answer to one intercepted request.
#[derive(Debug)]
pub struct FetchOutcome {
    pub response: WorkerResponse,
    pub source: ResponseSource,
    /// Background cache write started for this response, if any. Nothing
    /// needs to await it; tests do, to observe the populated cache.
    pub population: Option<JoinHandle<()>>,
}

impl FetchOutcome {
    fn new(response: WorkerResponse, source: ResponseSource) -> Self {
        Self { response, source, population: None }
    }
}

/// Answer an intercepted request.
///
/// 1. A stored entry in any cache version is returned as-is, without touching
///    the network.
/// 2. Otherwise the request goes to the network. A 200 same-origin GET
///    response is copied into the current cache version in the background.
///    Every other response is returned uncached.
/// 3. If the network fails, navigations get the cached offline page; other
///    requests get the network error.
///
/// # Errors
///
/// `NotActive` before activation has completed, otherwise the network error
/// when no fallback applies.
pub async fn handle_fetch(ctx: &WorkerContext, request: WorkerRequest) -> Result<FetchOutcome, Error> {
    let state = ctx.state().await;
    if state != WorkerState::Active {
        return Err(Error::NotActive(state.to_string()));
    }

    if let Some(response) = lookup(ctx, &request.method, request.url.as_str()).await {
        tracing::debug!("cache hit for {} {}", request.method, request.url);
        return Ok(FetchOutcome::new(response, ResponseSource::Cache));
    }
    tracing::debug!("cache miss for {} {}", request.method, request.url);

    match ctx.network().fetch(&request).await {
        Ok(response) => {
            let population = if request.is_get() && response.is_cacheable() {
                populate(ctx, &request, &response)
            } else {
                None
            };
            Ok(FetchOutcome { response, source: ResponseSource::Network, population })
        }
        Err(err) if request.is_navigation() => offline_fallback(ctx, err).await,
        Err(err) => Err(err),
    }
}

/// Any readable version; lookup failures count as a miss.
async fn lookup(ctx: &WorkerContext, method: &str, url: &str) -> Option<WorkerResponse> {
    let key = compute_request_key(method, url);
    let entry = match ctx.db().match_entry(&key).await {
        Ok(entry) => entry?,
        Err(err) => {
            tracing::warn!(url, error = %err, "cache lookup failed");
            return None;
        }
    };
    match entry.to_response() {
        Ok(response) => Some(response),
        Err(err) => {
            tracing::warn!(url, error = %err, "ignoring unreadable cache entry");
            None
        }
    }
}

/// Start the background write of `response` into the current version.
fn populate(ctx: &WorkerContext, request: &WorkerRequest, response: &WorkerResponse) -> Option<JoinHandle<()>> {
    let limit = ctx.config().max_entry_bytes;
    if response.body.len() > limit {
        let err = Error::QuotaExceeded { size: response.body.len(), limit };
        tracing::warn!(url = %request.url, error = %err, "not caching response");
        return None;
    }

    let entry = CacheEntry::from_response(ctx.cache_name(), &request.method, request.url.as_str(), response);
    let db = ctx.db().clone();
    Some(tokio::spawn(async move {
        match db.put_entry(&entry).await {
            Ok(()) => tracing::debug!("cached {} in {}", entry.url, entry.cache_name),
            Err(err) => tracing::warn!(url = %entry.url, error = %err, "failed to cache response"),
        }
    }))
}

async fn offline_fallback(ctx: &WorkerContext, err: Error) -> Result<FetchOutcome, Error> {
    let offline = ctx.resolve(&ctx.config().offline_page)?;
    match lookup(ctx, "GET", offline.as_str()).await {
        Some(response) => {
            tracing::debug!(error = %err, "serving offline page");
            Ok(FetchOutcome::new(response, ResponseSource::OfflineFallback))
        }
        None => {
            tracing::warn!(offline_page = %offline, "offline page is not cached");
            Err(err)
        }
    }
}
