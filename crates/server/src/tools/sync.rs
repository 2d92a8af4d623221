//! sw_sync tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::CacheOrchestrator;

use super::json_result;

/// Parameters for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    /// Sync tag: `background-sync` or `cache-cleanup`. Others are ignored.
    pub tag: String,
}

/// Implementation of the sw_sync tool.
pub async fn sync_impl(worker: &CacheOrchestrator, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    let outcome = worker.handle_sync(&params.tag).await;
    json_result(&outcome)
}
