//! SQLite-backed storage for the offline worker.
//!
//! One database holds both durable stores:
//!
//! - Named, versioned response caches keyed by request identity
//! - Pending form submissions waiting for a background sync replay
//!
//! Access is async via tokio-rusqlite, with WAL mode and versioned
//! migrations.

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod submissions;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheEntry;
pub use submissions::PendingSubmission;
