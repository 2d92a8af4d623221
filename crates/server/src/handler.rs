//! MCP server handler implementation.
//!
//! This module defines the main server handler that routes tool calls to the
//! orchestrator entry points and the simulated client registry.
use std::sync::Arc;

use crate::host::LocalHost;
use crate::tools::{
    ClientConnectParams, ClientDisconnectParams, ClientInboxParams, SwFetchParams, SwMessageParams,
    SwNotificationClickParams, SwPushParams, SwSyncParams, clients, fetch, lifecycle, message, notify, sync,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swcache_core::CacheOrchestrator;

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    worker: CacheOrchestrator,
    host: Arc<LocalHost>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler.
    pub fn new(worker: CacheOrchestrator, host: Arc<LocalHost>) -> Self {
        Self { worker, host, tool_router: Self::tool_router() }
    }

    #[tool(description = "Install the worker: open this version's cache and pre-cache the critical resources.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        lifecycle::install_impl(&self.worker).await
    }

    #[tool(
        description = "Activate the worker: delete other versions' caches, run eviction, claim clients and broadcast SW_ACTIVATED."
    )]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        lifecycle::activate_impl(&self.worker).await
    }

    /// Intercept a request.
    ///
    /// GET requests are routed to network-first (API), cache-first (assets, images)
    /// or stale-while-revalidate (everything else); other methods pass through.
    #[tool(
        description = "Intercept a request as the service worker would. Returns the route, the response source (network, cache, fallback), status, headers and body."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch::fetch_impl(&self.worker, params.0).await
    }

    #[tool(
        description = "Post a client message: SKIP_WAITING, GET_VERSION, CLEAR_CACHE, PREFETCH_RESOURCES ({urls}) or GET_CACHE_STATUS. Returns the reply, if any."
    )]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message::message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a push event. Shows a notification and broadcasts PUSH_RECEIVED.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        notify::push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Click a displayed notification, optionally on one of its actions. Focuses or opens a window.")]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notify::click_impl(&self.worker, &self.host, params.0).await
    }

    #[tool(description = "Deliver a background sync event: background-sync or cache-cleanup.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync::sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "Connect a simulated page client that receives worker broadcasts.")]
    async fn client_connect(&self, params: Parameters<ClientConnectParams>) -> Result<CallToolResult, McpError> {
        clients::connect_impl(&self.host, params.0).await
    }

    #[tool(description = "Disconnect a simulated page client.")]
    async fn client_disconnect(&self, params: Parameters<ClientDisconnectParams>) -> Result<CallToolResult, McpError> {
        clients::disconnect_impl(&self.host, params.0).await
    }

    #[tool(description = "Read the broadcast messages a simulated client has received.")]
    async fn client_inbox(&self, params: Parameters<ClientInboxParams>) -> Result<CallToolResult, McpError> {
        clients::inbox_impl(&self.host, params.0).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
