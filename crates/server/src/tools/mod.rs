//! MCP tool implementations.
//!
//! Each tool forwards one host event to the orchestrator, or manipulates the
//! simulated client registry, and returns its result as pretty JSON text.

pub mod clients;
pub mod fetch;
pub mod lifecycle;
pub mod message;
pub mod notify;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use swcache_core::Error;

pub use clients::{ClientConnectParams, ClientDisconnectParams, ClientInboxParams};
pub use fetch::SwFetchParams;
pub use message::SwMessageParams;
pub use notify::{SwNotificationClickParams, SwPushParams};
pub use sync::SwSyncParams;

/// Serialize a tool output as the single text content of a successful result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
