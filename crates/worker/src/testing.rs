//! Scripted network double for worker tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use kanthu_client::Network;
use kanthu_core::{Error, ResponseType, WorkerConfig, WorkerRequest, WorkerResponse};

pub(crate) const ORIGIN: &str = "http://localhost:8000";

enum Route {
    Respond(WorkerResponse),
    Fail,
}

/// Answers requests from a route table and records every call.
///
/// Unrouted requests get a same-origin 404.
#[derive(Default)]
pub(crate) struct ScriptedNetwork {
    routes: Mutex<HashMap<(String, String), Route>>,
    calls: Mutex<Vec<WorkerRequest>>,
    offline: AtomicBool,
}

impl ScriptedNetwork {
    pub(crate) fn respond(&self, method: &str, url: &str, status: u16, response_type: ResponseType, body: &str) {
        let response = response(url, status, response_type, body);
        self.routes
            .lock()
            .unwrap()
            .insert((method.to_string(), url.to_string()), Route::Respond(response));
    }

    pub(crate) fn fail(&self, method: &str, url: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert((method.to_string(), url.to_string()), Route::Fail);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<WorkerRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse, Error> {
        self.calls.lock().unwrap().push(request.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: offline", request.url)));
        }

        let routes = self.routes.lock().unwrap();
        match routes.get(&(request.method.clone(), request.url.to_string())) {
            Some(Route::Respond(response)) => Ok(response.clone()),
            Some(Route::Fail) => Err(Error::Network(format!("{}: connection reset", request.url))),
            None => Ok(response(request.url.as_str(), 404, ResponseType::Basic, "not found")),
        }
    }
}

pub(crate) fn response(url: &str, status: u16, response_type: ResponseType, body: &str) -> WorkerResponse {
    WorkerResponse {
        url: url.to_string(),
        status,
        status_text: String::new(),
        headers: vec![("Content-Type".to_string(), "text/html; charset=utf-8".to_string())],
        body: Bytes::copy_from_slice(body.as_bytes()),
        response_type,
    }
}

/// A small manifest with one cross-origin asset.
pub(crate) fn test_config(cache_version: &str) -> WorkerConfig {
    WorkerConfig {
        cache_version: cache_version.to_string(),
        origin: ORIGIN.to_string(),
        manifest: vec![
            "/".to_string(),
            "/offline.html".to_string(),
            "/assets/css/style.css".to_string(),
            "https://unpkg.com/aos@2.3.1/dist/aos.js".to_string(),
        ],
        ..Default::default()
    }
}

/// Route every manifest entry of `test_config` to a successful response.
pub(crate) fn serve_manifest(network: &ScriptedNetwork) {
    network.respond("GET", &format!("{ORIGIN}/"), 200, ResponseType::Basic, "<h1>home</h1>");
    network.respond("GET", &format!("{ORIGIN}/offline.html"), 200, ResponseType::Basic, "<h1>offline</h1>");
    network.respond("GET", &format!("{ORIGIN}/assets/css/style.css"), 200, ResponseType::Basic, "body{}");
    network.respond("GET", "https://unpkg.com/aos@2.3.1/dist/aos.js", 200, ResponseType::Cors, "AOS.init()");
}
