//! Install and activate.
//!
//! Install precaches the manifest into the current cache version,
//! all-or-nothing. Activate deletes every other version; it is the only
//! garbage collection there is. Fetch handling starts once activation has
//! finished.

use futures::future::try_join_all;
use kanthu_core::{CacheEntry, Error, WorkerRequest};
use serde::{Deserialize, Serialize};

use crate::context::{WorkerContext, WorkerState};

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InstallReport {
    /// Cache version the manifest was written to.
    pub cache_name: String,
    /// Number of manifest entries stored.
    pub entries: usize,
}

/// Result of a successful activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivationReport {
    /// The only cache version left.
    pub cache_name: String,
    /// Stale versions that were deleted.
    pub deleted: Vec<String>,
    /// Whether in-scope clients are now controlled by this generation.
    pub clients_claimed: bool,
}

/// Precache the manifest into the current cache version.
///
/// Every entry is fetched before anything is written. A transport failure or
/// a non-2xx status on any entry fails the whole install, leaves the store
/// untouched and marks the generation `redundant`; the host may retry.
pub async fn install(ctx: &WorkerContext) -> Result<InstallReport, Error> {
    ctx.begin(
        "install",
        &[WorkerState::Parsed, WorkerState::Installed, WorkerState::Redundant],
        WorkerState::Installing,
    )
    .await?;

    match precache(ctx).await {
        Ok(entries) => {
            ctx.set_state(WorkerState::Installed).await;
            tracing::info!(cache = ctx.cache_name(), entries, "installed");
            Ok(InstallReport { cache_name: ctx.cache_name().to_string(), entries })
        }
        Err(err) => {
            ctx.set_state(WorkerState::Redundant).await;
            tracing::error!(cache = ctx.cache_name(), error = %err, "failed to cache resources");
            Err(err)
        }
    }
}

async fn precache(ctx: &WorkerContext) -> Result<usize, Error> {
    let cache_name = ctx.cache_name();
    let urls = ctx
        .config()
        .manifest
        .iter()
        .map(|entry| ctx.resolve(entry).map_err(|e| Error::InstallFailed(e.to_string())))
        .collect::<Result<Vec<_>, _>>()?;

    let entries = try_join_all(urls.into_iter().map(|url| async move {
        let request = WorkerRequest::get(url);
        let response = ctx
            .network()
            .fetch(&request)
            .await
            .map_err(|e| Error::InstallFailed(format!("{}: {e}", request.url)))?;
        if !response.ok() {
            return Err(Error::InstallFailed(format!("{}: status {}", request.url, response.status)));
        }
        Ok::<_, Error>(CacheEntry::from_response(cache_name, &request.method, request.url.as_str(), &response))
    }))
    .await?;

    ctx.db()
        .put_all(cache_name, entries)
        .await
        .map_err(|e| Error::InstallFailed(format!("storing manifest: {e}")))
}

/// Delete every cache version except the current one and take control of
/// clients.
///
/// Allowed after a successful install; repeating it on an active generation
/// is a no-op apart from collecting versions that appeared since.
pub async fn activate(ctx: &WorkerContext) -> Result<ActivationReport, Error> {
    let previous = ctx
        .begin("activate", &[WorkerState::Installed, WorkerState::Active], WorkerState::Activating)
        .await?;

    match delete_stale(ctx).await {
        Ok(deleted) => {
            ctx.set_state(WorkerState::Active).await;
            tracing::info!(cache = ctx.cache_name(), deleted = deleted.len(), "activated; clients claimed");
            Ok(ActivationReport { cache_name: ctx.cache_name().to_string(), deleted, clients_claimed: true })
        }
        Err(err) => {
            ctx.set_state(previous).await;
            tracing::error!(cache = ctx.cache_name(), error = %err, "activation failed");
            Err(err)
        }
    }
}

async fn delete_stale(ctx: &WorkerContext) -> Result<Vec<String>, Error> {
    let mut deleted = Vec::new();
    for name in ctx.db().cache_names().await? {
        if name != ctx.cache_name() && ctx.db().delete_cache(&name).await? {
            tracing::debug!(cache = %name, "deleted stale cache");
            deleted.push(name);
        }
    }
    Ok(deleted)
}
