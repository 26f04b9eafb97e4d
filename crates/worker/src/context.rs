//! Per-generation worker state.

use std::fmt;
use std::sync::Arc;

use kanthu_client::{Network, resolve};
use kanthu_core::{CacheDb, Error, WorkerConfig};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;

use crate::sync::SyncCoordinator;

/// Lifecycle position of a worker generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Active,
    /// The last install failed; a new install attempt may follow.
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
            WorkerState::Redundant => "redundant",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one worker generation owns.
///
/// The cache store and the submission queue share `db`. Only the lifecycle
/// functions create or delete cache versions.
pub struct WorkerContext {
    config: Arc<WorkerConfig>,
    origin: Url,
    db: CacheDb,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
    pub(crate) sync: SyncCoordinator,
}

impl WorkerContext {
    /// Build the context for a new generation in the `parsed` state.
    pub fn new(config: WorkerConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            config: Arc::new(config),
            origin,
            db,
            network,
            state: RwLock::new(WorkerState::Parsed),
            sync: SyncCoordinator::default(),
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn network(&self) -> &dyn Network {
        self.network.as_ref()
    }

    /// Name of the cache version this generation owns.
    pub fn cache_name(&self) -> &str {
        &self.config.cache_version
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Resolve a configured path or URL against the site origin.
    pub fn resolve(&self, input: &str) -> Result<Url, Error> {
        resolve(&self.origin, input).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))
    }

    /// Move to `next` if the current state is one of `allowed`.
    ///
    /// Returns the state that was left.
    pub(crate) async fn begin(
        &self, action: &str, allowed: &[WorkerState], next: WorkerState,
    ) -> Result<WorkerState, Error> {
        let mut state = self.state.write().await;
        if !allowed.contains(&*state) {
            return Err(Error::InvalidState { action: action.to_string(), state: state.to_string() });
        }
        let previous = *state;
        *state = next;
        tracing::debug!(from = %previous, to = %next, "{action}");
        Ok(previous)
    }

    pub(crate) async fn set_state(&self, next: WorkerState) {
        *self.state.write().await = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedNetwork, test_config};

    async fn context() -> WorkerContext {
        let db = CacheDb::open_in_memory().await.unwrap();
        WorkerContext::new(test_config("v1"), db, Arc::new(ScriptedNetwork::default())).unwrap()
    }

    #[tokio::test]
    async fn test_new_context_is_parsed() {
        let ctx = context().await;
        assert_eq!(ctx.state().await, WorkerState::Parsed);
        assert_eq!(ctx.cache_name(), "v1");
    }

    #[tokio::test]
    async fn test_new_rejects_bad_origin() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let config = WorkerConfig { origin: "nowhere".into(), ..test_config("v1") };
        let result = WorkerContext::new(config, db, Arc::new(ScriptedNetwork::default()));
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_begin_checks_allowed_states() {
        let ctx = context().await;
        let result = ctx.begin("activate", &[WorkerState::Installed], WorkerState::Activating).await;
        assert!(matches!(result, Err(Error::InvalidState { .. })));
        assert_eq!(ctx.state().await, WorkerState::Parsed);

        let previous = ctx
            .begin("install", &[WorkerState::Parsed], WorkerState::Installing)
            .await
            .unwrap();
        assert_eq!(previous, WorkerState::Parsed);
        assert_eq!(ctx.state().await, WorkerState::Installing);
    }

    #[tokio::test]
    async fn test_resolve_relative() {
        let ctx = context().await;
        assert_eq!(ctx.resolve("/blog.html").unwrap().as_str(), "http://localhost:8000/blog.html");
        assert!(matches!(ctx.resolve(""), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(WorkerState::Redundant.to_string(), "redundant");
        assert_eq!(serde_json::to_string(&WorkerState::Active).unwrap(), "\"active\"");
    }
}
