//! Structured errors raised by the host adapter itself.
//!
//! Orchestrator failures arrive as `swcache_core::Error` and convert directly;
//! these cover tool arguments that never reach the orchestrator.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Invalid tool arguments (e.g., an unparseable URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No connected client has this id.
    #[error("UNKNOWN_CLIENT: {0}")]
    UnknownClient(String),

    /// No displayed notification has this tag.
    #[error("UNKNOWN_NOTIFICATION: {0}")]
    UnknownNotification(String),
}

impl From<HostError> for McpError {
    fn from(err: HostError) -> Self {
        let code = match &err {
            HostError::InvalidInput(_) => -32602,
            HostError::UnknownClient(_) => -32010,
            HostError::UnknownNotification(_) => -32011,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

impl From<HostError> for swcache_core::Error {
    fn from(err: HostError) -> Self {
        swcache_core::Error::Host(err.to_string())
    }
}
