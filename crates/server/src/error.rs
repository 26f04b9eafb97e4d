//! Errors raised by the host adapter itself, before or after a worker
//! handler runs.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// A tool argument could not be turned into a worker event.
    #[error("INVALID_PARAMS: {0}")]
    InvalidParams(String),

    /// A handler result could not be encoded for the host.
    #[error("ENCODE_FAILED: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<HostError> for McpError {
    fn from(err: HostError) -> Self {
        let code = match &err {
            HostError::InvalidParams(_) => -32602,
            HostError::Encode(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
