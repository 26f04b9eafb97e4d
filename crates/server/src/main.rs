//! kanthu-sw entry point.
//!
//! Boots one worker generation and serves its events as MCP tools on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on
//! stdout.

use std::sync::Arc;

use anyhow::Result;
use kanthu_client::{FetchClient, FetchConfig};
use kanthu_core::{CacheDb, WorkerConfig};
use kanthu_worker::WorkerContext;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
#[cfg(test)]
mod testing;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = WorkerConfig::load()?;
    tracing::info!(
        cache = %config.cache_version,
        origin = %config.origin,
        db = %config.db_path.display(),
        "starting kanthu-sw on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from_worker_config(&config)?)?;
    let ctx = WorkerContext::new(config, db, Arc::new(network))?;

    let handler = handler::KanthuWorkerServer::new(Arc::new(ctx));
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
