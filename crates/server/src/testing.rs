//! Network stub for tool tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use kanthu_client::Network;
use kanthu_core::{CacheDb, Error, ResponseType, WorkerConfig, WorkerRequest, WorkerResponse};
use kanthu_worker::WorkerContext;
use rmcp::model::CallToolResult;
use serde::de::DeserializeOwned;

/// Answers every request with `200 OK` and a body naming the path, unless
/// switched offline.
#[derive(Default)]
pub(crate) struct StubNetwork {
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl StubNetwork {
    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: offline", request.url)));
        }
        Ok(WorkerResponse {
            url: request.url.to_string(),
            status: 200,
            status_text: "OK".into(),
            headers: vec![("Content-Type".into(), "text/html".into())],
            body: format!("page {}", request.url.path()).into(),
            response_type: ResponseType::Basic,
        })
    }
}

pub(crate) async fn context() -> (Arc<WorkerContext>, Arc<StubNetwork>) {
    let config = WorkerConfig {
        cache_version: "test-v1".into(),
        manifest: vec!["/".into(), "/offline.html".into()],
        ..Default::default()
    };
    let db = CacheDb::open_in_memory().await.unwrap();
    let network = Arc::new(StubNetwork::default());
    let ctx = WorkerContext::new(config, db, network.clone()).unwrap();
    (Arc::new(ctx), network)
}

/// Decode the JSON text content of a tool result.
pub(crate) fn output<T: DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
