//! client_connect, client_disconnect and client_inbox tool implementations.
//!
//! These simulate page instances so broadcasts have somewhere to land.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use swcache_core::worker::{ClientInfo, ClientKind};

use super::json_result;
use crate::host::LocalHost;

/// Parameters for the client_connect tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientConnectParams {
    /// Client id; reconnecting with the same id replaces the client.
    pub id: String,

    /// URL the client is showing.
    pub url: String,

    /// Client kind (default: window).
    #[serde(default = "default_kind")]
    pub kind: ClientKind,
}

fn default_kind() -> ClientKind {
    ClientKind::Window
}

/// Parameters for the client_disconnect tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientDisconnectParams {
    pub id: String,
}

/// Parameters for the client_inbox tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientInboxParams {
    pub id: String,

    /// Empty the inbox after reading it (default: true).
    #[serde(default = "default_true")]
    pub drain: bool,
}

fn default_true() -> bool {
    true
}

/// Implementation of the client_connect tool.
pub async fn connect_impl(host: &LocalHost, params: ClientConnectParams) -> Result<CallToolResult, McpError> {
    host.connect(ClientInfo { id: params.id, url: params.url, kind: params.kind })
        .await;
    json_result(&json!({ "clients": host.list().await, "focused": host.focused().await }))
}

/// Implementation of the client_disconnect tool.
pub async fn disconnect_impl(host: &LocalHost, params: ClientDisconnectParams) -> Result<CallToolResult, McpError> {
    host.disconnect(&params.id).await?;
    json_result(&json!({ "clients": host.list().await, "focused": host.focused().await }))
}

/// Implementation of the client_inbox tool.
pub async fn inbox_impl(host: &LocalHost, params: ClientInboxParams) -> Result<CallToolResult, McpError> {
    let messages = host.inbox(&params.id, params.drain).await?;
    json_result(&json!({ "id": params.id, "messages": messages }))
}
