//! sw_install and sw_activate tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use swcache_core::CacheOrchestrator;

use super::json_result;

/// Implementation of the sw_install tool.
pub async fn install_impl(worker: &CacheOrchestrator) -> Result<CallToolResult, McpError> {
    let report = worker.install().await?;
    json_result(&report)
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(worker: &CacheOrchestrator) -> Result<CallToolResult, McpError> {
    let report = worker.activate().await?;
    json_result(&report)
}
