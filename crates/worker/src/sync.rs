//! Background sync replay of queued form submissions.
//!
//! Delivery is at-least-once: a submission is deleted only after its
//! endpoint confirmed it with a 2xx, and a failed replay leaves it queued for
//! the host to retry. A payload queued while a replay is in flight survives
//! that replay. Overlapping replays of the same tag are collapsed by an
//! in-flight guard.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use kanthu_core::{Error, PendingSubmission, WorkerConfig, WorkerRequest};
use serde::{Deserialize, Serialize};

use crate::context::WorkerContext;

/// A background sync queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
pub enum SyncTag {
    #[serde(rename = "contact-form-sync")]
    ContactForm,
    #[serde(rename = "newsletter-sync")]
    Newsletter,
}

impl SyncTag {
    /// Parse a sync event tag. Unknown tags are not ours to handle.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "contact-form-sync" => Some(SyncTag::ContactForm),
            "newsletter-sync" => Some(SyncTag::Newsletter),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTag::ContactForm => "contact-form-sync",
            SyncTag::Newsletter => "newsletter-sync",
        }
    }

    /// Key of the pending submission in the request store.
    pub fn storage_key(&self) -> &'static str {
        match self {
            SyncTag::ContactForm => "contact-form",
            SyncTag::Newsletter => "newsletter",
        }
    }

    pub fn endpoint<'a>(&self, config: &'a WorkerConfig) -> &'a str {
        match self {
            SyncTag::ContactForm => &config.contact_endpoint,
            SyncTag::Newsletter => &config.newsletter_endpoint,
        }
    }
}

impl fmt::Display for SyncTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a replay did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SyncOutcome {
    /// The tag does not belong to any queue.
    Ignored,
    /// Nothing was queued; no request was made.
    Empty,
    /// The endpoint accepted the payload and it was dequeued.
    Delivered,
    /// Another replay of the same tag is still running.
    InFlight,
}

/// Tracks which tags have a replay running.
#[derive(Debug, Default)]
pub(crate) struct SyncCoordinator {
    in_flight: Mutex<HashSet<SyncTag>>,
}

impl SyncCoordinator {
    /// Claim `tag`, or None if a replay for it is already running.
    pub(crate) fn try_begin(&self, tag: SyncTag) -> Option<InFlightGuard<'_>> {
        if lock(&self.in_flight).insert(tag) { Some(InFlightGuard { owner: self, tag }) } else { None }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Releases the tag when the replay finishes, however it finishes.
pub(crate) struct InFlightGuard<'a> {
    owner: &'a SyncCoordinator,
    tag: SyncTag,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(&self.owner.in_flight).remove(&self.tag);
    }
}

/// Queue a form payload for later replay, replacing any payload already
/// queued under the same tag.
pub async fn queue_submission(
    ctx: &WorkerContext, tag: SyncTag, payload: &serde_json::Value,
) -> Result<PendingSubmission, Error> {
    let submission = ctx.db().put_submission(tag.storage_key(), payload).await?;
    tracing::info!(tag = %tag, "queued submission for background sync");
    Ok(submission)
}

/// Replay the submission queued under `tag`.
///
/// # Errors
///
/// `ReplayFailed` when the endpoint could not be reached or answered with a
/// non-2xx status. The submission stays queued; retrying is up to the host.
pub async fn replay(ctx: &WorkerContext, tag: &str) -> Result<SyncOutcome, Error> {
    let Some(tag) = SyncTag::parse(tag) else {
        tracing::debug!(tag, "ignoring unknown sync tag");
        return Ok(SyncOutcome::Ignored);
    };

    let Some(_guard) = ctx.sync.try_begin(tag) else {
        tracing::debug!(tag = %tag, "replay already in flight");
        return Ok(SyncOutcome::InFlight);
    };

    let Some(submission) = ctx.db().get_submission(tag.storage_key()).await? else {
        return Ok(SyncOutcome::Empty);
    };

    let endpoint = ctx.resolve(tag.endpoint(ctx.config()))?;
    let body = serde_json::to_vec(&submission.payload)
        .map_err(|e| Error::InvalidInput(format!("queued payload for {tag}: {e}")))?;
    let request = WorkerRequest::post_json(endpoint, body);

    let response = match ctx.network().fetch(&request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(tag = %tag, error = %err, "failed to sync submission");
            return Err(Error::ReplayFailed(format!("{tag}: {err}")));
        }
    };

    if !response.ok() {
        tracing::error!(tag = %tag, status = response.status, "failed to sync submission");
        return Err(Error::ReplayFailed(format!("{tag}: {} answered {}", request.url, response.status)));
    }

    if !ctx.db().delete_submission(&submission).await? {
        tracing::debug!(tag = %tag, "submission re-queued during replay; keeping the newer payload");
    }
    tracing::info!(tag = %tag, "submission delivered");
    Ok(SyncOutcome::Delivered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ORIGIN, ScriptedNetwork, response, test_config};
    use async_trait::async_trait;
    use kanthu_client::Network;
    use kanthu_core::{CacheDb, ResponseType, WorkerResponse};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Accepts every POST, but the page queues a newer payload while the
    /// request is on the wire.
    struct RequeueDuringPost {
        db: CacheDb,
        sent: Mutex<Vec<serde_json::Value>>,
    }

    #[async_trait]
    impl Network for RequeueDuringPost {
        async fn fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse, Error> {
            let body = request.body.clone().unwrap_or_default();
            self.sent.lock().unwrap().push(serde_json::from_slice(&body).unwrap());
            self.db
                .put_submission("contact-form", &json!({"message": "second"}))
                .await?;
            Ok(response(request.url.as_str(), 200, ResponseType::Basic, ""))
        }
    }

    async fn context() -> (WorkerContext, Arc<ScriptedNetwork>) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = Arc::new(ScriptedNetwork::default());
        let ctx = WorkerContext::new(test_config("v1"), db, network.clone()).unwrap();
        (ctx, network)
    }

    #[test]
    fn test_tag_mapping() {
        let config = WorkerConfig::default();
        assert_eq!(SyncTag::parse("contact-form-sync"), Some(SyncTag::ContactForm));
        assert_eq!(SyncTag::parse("newsletter-sync"), Some(SyncTag::Newsletter));
        assert_eq!(SyncTag::parse("contact-form"), None);
        assert_eq!(SyncTag::ContactForm.storage_key(), "contact-form");
        assert_eq!(SyncTag::Newsletter.endpoint(&config), "/api/newsletter");
    }

    #[tokio::test]
    async fn test_empty_queue_is_noop() {
        let (ctx, network) = context().await;

        let outcome = replay(&ctx, "contact-form-sync").await.unwrap();
        assert_eq!(outcome, SyncOutcome::Empty);
        assert_eq!(network.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_tag_ignored() {
        let (ctx, network) = context().await;
        assert_eq!(replay(&ctx, "periodic-refresh").await.unwrap(), SyncOutcome::Ignored);
        assert_eq!(network.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_replay_keeps_submission_then_delivers() {
        let (ctx, network) = context().await;
        let payload = json!({"name": "Ravi", "email": "ravi@example.com", "message": "Namaste"});
        queue_submission(&ctx, SyncTag::ContactForm, &payload).await.unwrap();

        let endpoint = format!("{ORIGIN}/api/contact");
        network.respond("POST", &endpoint, 503, ResponseType::Basic, "busy");
        let result = replay(&ctx, "contact-form-sync").await;
        assert!(matches!(result, Err(Error::ReplayFailed(_))));
        assert!(ctx.db().get_submission("contact-form").await.unwrap().is_some());

        network.respond("POST", &endpoint, 200, ResponseType::Basic, "{\"ok\":true}");
        assert_eq!(replay(&ctx, "contact-form-sync").await.unwrap(), SyncOutcome::Delivered);
        assert!(ctx.db().get_submission("contact-form").await.unwrap().is_none());

        let calls = network.calls();
        let last = calls.last().unwrap();
        assert_eq!(last.method, "POST");
        assert_eq!(last.url.as_str(), endpoint);
        assert!(
            last.headers
                .iter()
                .any(|(k, v)| k == "Content-Type" && v == "application/json")
        );
        let sent: serde_json::Value = serde_json::from_slice(last.body.as_ref().unwrap()).unwrap();
        assert_eq!(sent, payload);
    }

    #[tokio::test]
    async fn test_network_error_keeps_submission() {
        let (ctx, network) = context().await;
        queue_submission(&ctx, SyncTag::Newsletter, &json!({"email": "a@example.com"}))
            .await
            .unwrap();
        network.set_offline(true);

        assert!(matches!(replay(&ctx, "newsletter-sync").await, Err(Error::ReplayFailed(_))));
        assert!(ctx.db().get_submission("newsletter").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_replay_only_touches_its_queue() {
        let (ctx, network) = context().await;
        queue_submission(&ctx, SyncTag::ContactForm, &json!({"message": "hi"}))
            .await
            .unwrap();
        queue_submission(&ctx, SyncTag::Newsletter, &json!({"email": "a@example.com"}))
            .await
            .unwrap();
        network.respond("POST", &format!("{ORIGIN}/api/newsletter"), 201, ResponseType::Basic, "");

        assert_eq!(replay(&ctx, "newsletter-sync").await.unwrap(), SyncOutcome::Delivered);
        assert!(ctx.db().get_submission("newsletter").await.unwrap().is_none());
        assert!(ctx.db().get_submission("contact-form").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_overlapping_replay_is_collapsed() {
        let (ctx, network) = context().await;
        queue_submission(&ctx, SyncTag::ContactForm, &json!({"message": "hi"}))
            .await
            .unwrap();

        let guard = ctx.sync.try_begin(SyncTag::ContactForm).unwrap();
        assert_eq!(replay(&ctx, "contact-form-sync").await.unwrap(), SyncOutcome::InFlight);
        assert_eq!(network.call_count(), 0);

        // other tags are not blocked
        assert_eq!(replay(&ctx, "newsletter-sync").await.unwrap(), SyncOutcome::Empty);

        drop(guard);
        network.respond("POST", &format!("{ORIGIN}/api/contact"), 200, ResponseType::Basic, "");
        assert_eq!(replay(&ctx, "contact-form-sync").await.unwrap(), SyncOutcome::Delivered);
    }

    #[tokio::test]
    async fn test_guard_released_after_failure() {
        let (ctx, network) = context().await;
        queue_submission(&ctx, SyncTag::ContactForm, &json!({"message": "hi"}))
            .await
            .unwrap();
        network.set_offline(true);

        assert!(replay(&ctx, "contact-form-sync").await.is_err());
        assert!(ctx.sync.try_begin(SyncTag::ContactForm).is_some());
    }

    #[tokio::test]
    async fn test_requeue_during_replay_is_kept() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = Arc::new(RequeueDuringPost { db: db.clone(), sent: Mutex::new(Vec::new()) });
        let ctx = WorkerContext::new(test_config("v1"), db, network.clone()).unwrap();
        queue_submission(&ctx, SyncTag::ContactForm, &json!({"message": "first"}))
            .await
            .unwrap();

        assert_eq!(replay(&ctx, "contact-form-sync").await.unwrap(), SyncOutcome::Delivered);
        assert_eq!(*network.sent.lock().unwrap(), vec![json!({"message": "first"})]);

        let remaining = ctx.db().get_submission("contact-form").await.unwrap().unwrap();
        assert_eq!(remaining.payload, json!({"message": "second"}));
    }
}
