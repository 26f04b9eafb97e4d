//! Unified error types for the offline worker.
//!
//! Each variant carries a stable code prefix so hosts can match on the
//! message as well as on the JSON-RPC error code.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the offline worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., unknown destination).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or unresolvable URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Transport-level network failure (offline, DNS, TLS, timeout).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// A manifest entry could not be cached; nothing was committed.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),

    /// The worker has not finished activation yet.
    #[error("NOT_ACTIVE: worker is {0}")]
    NotActive(String),

    /// A lifecycle transition was requested from the wrong state.
    #[error("INVALID_STATE: cannot {action} while {state}")]
    InvalidState { action: String, state: String },

    /// A queued submission could not be delivered and stays queued.
    #[error("REPLAY_FAILED: {0}")]
    ReplayFailed(String),

    /// A response body exceeds the per-entry storage quota.
    #[error("QUOTA_EXCEEDED: {size} bytes exceeds {limit}")]
    QuotaExceeded { size: usize, limit: usize },

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// No cache version with the given name exists.
    #[error("CACHE_ERROR: no cache named {0}")]
    UnknownCache(String),

    /// A stored row could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::InvalidUrl(_) => -32003,
            Error::Network(_) => -32008,
            Error::InstallFailed(_) => -32020,
            Error::NotActive(_) => -32021,
            Error::InvalidState { .. } => -32022,
            Error::ReplayFailed(_) => -32023,
            Error::QuotaExceeded { .. } => -32024,
            Error::Database(_) | Error::MigrationFailed(_) | Error::UnknownCache(_) | Error::CorruptEntry(_) => -32002,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
