//! Network seam and the HTTP fetch client behind it.
//!
//! ### Response classification
//! - Same-origin responses are `basic`
//! - Cross-origin responses are `cors`, or `opaque` for `no-cors` requests
//!   (status 0, no headers, empty body)
//! - `same-origin` mode requests to another origin fail like a network error
//!
//! ### Failure model
//! Only transport failures (offline, DNS, TLS, timeout) are errors. Any HTTP
//! status, including 4xx/5xx, is returned as a response for the caller to
//! judge.

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method};

pub use self::url::{UrlError, is_same_origin, resolve};

use kanthu_core::{Error, RequestMode, ResponseType, WorkerConfig, WorkerRequest, WorkerResponse};

/// Everything the worker needs from the network.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform a request, returning any HTTP response the server produced.
    ///
    /// # Errors
    ///
    /// Returns `Error::Network` on transport failure.
    async fn fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "kanthu-sw/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Origin whose responses are classified as `basic`
    pub origin: ::url::Url,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "kanthu-sw/0.1".to_string(),
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            origin: ::url::Url::parse("http://localhost:8000").expect("static origin parses"),
        }
    }
}

impl FetchConfig {
    /// Derive the client configuration from the worker configuration.
    pub fn from_worker_config(config: &WorkerConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), origin, ..Default::default() })
    }
}

/// HTTP fetch client classifying responses relative to the site origin.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn classify(&self, request: &WorkerRequest, final_url: &::url::Url) -> ResponseType {
        if is_same_origin(&self.config.origin, final_url) {
            ResponseType::Basic
        } else if request.mode == RequestMode::NoCors {
            ResponseType::Opaque
        } else {
            ResponseType::Cors
        }
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse, Error> {
        let start = Instant::now();

        if request.mode == RequestMode::SameOrigin && !is_same_origin(&self.config.origin, &request.url) {
            return Err(Error::Network(format!("same-origin request to {} blocked", request.url)));
        }

        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {e}", request.method)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("{}: {}", request.url, e)))?;

        let final_url = response.url().clone();
        let status = response.status();
        let response_type = self.classify(request, &final_url);

        if response_type == ResponseType::Opaque {
            tracing::debug!("opaque response for {}", request.url);
            return Ok(WorkerResponse {
                url: final_url.to_string(),
                status: 0,
                status_text: String::new(),
                headers: Vec::new(),
                body: Bytes::new(),
                response_type,
            });
        }

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response from {}: {}", final_url, e)))?;

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} ({}) in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            response_type,
            fetch_ms,
            body.len()
        );

        Ok(WorkerResponse {
            url: final_url.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
            response_type,
        })
    }
}
