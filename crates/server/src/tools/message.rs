//! sw_message tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use swcache_core::CacheOrchestrator;
use swcache_core::worker::ClientMessage;

use super::json_result;

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message type: SKIP_WAITING, GET_VERSION, CLEAR_CACHE,
    /// PREFETCH_RESOURCES or GET_CACHE_STATUS.
    #[serde(rename = "type")]
    pub kind: String,

    /// Message data, e.g. `{"urls": [...]}` for PREFETCH_RESOURCES.
    #[serde(default)]
    pub data: Value,
}

/// Implementation of the sw_message tool.
///
/// The output is `{"reply": ...}`; `reply` is null for messages that post none.
pub async fn message_impl(worker: &CacheOrchestrator, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let reply = worker.handle_message(ClientMessage::new(params.kind, params.data)).await;
    json_result(&json!({ "reply": reply }))
}
