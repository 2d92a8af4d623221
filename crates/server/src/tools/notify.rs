//! sw_push and sw_notification_click tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use swcache_core::CacheOrchestrator;

use super::json_result;
use crate::host::LocalHost;

/// Parameters for the sw_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Raw push payload text, normally a JSON object with optional
    /// title, message, icon, badge, tag, data, actions, persistent and silent.
    /// Omit to simulate a push without data.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Parameters for the sw_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// Tag of a currently displayed notification.
    pub tag: String,

    /// The action button that was clicked, if any.
    #[serde(default)]
    pub action: Option<String>,
}

/// Implementation of the sw_push tool.
///
/// The output is `{"shown": ...}`; `shown` is null when the payload was ignored.
pub async fn push_impl(worker: &CacheOrchestrator, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let shown = worker.handle_push(params.payload.as_deref().map(str::as_bytes)).await;
    json_result(&json!({ "shown": shown }))
}

/// Implementation of the sw_notification_click tool.
pub async fn click_impl(
    worker: &CacheOrchestrator, host: &LocalHost, params: SwNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let notification = host.notification(&params.tag).await?;
    let outcome = worker
        .handle_notification_click(&notification, params.action.as_deref())
        .await?;
    json_result(&outcome)
}
