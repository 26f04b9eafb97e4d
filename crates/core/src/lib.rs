//! Core types and shared functionality for the kanthu offline worker.
//!
//! This crate provides:
//! - Versioned response caches and the pending submission queue on SQLite
//! - Request/response values shared by the network and the cache
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CacheEntry, PendingSubmission};
pub use config::{ConfigError, NotificationConfig, WorkerConfig};
pub use error::Error;
pub use http::{Destination, RequestMode, ResponseType, WorkerRequest, WorkerResponse};
