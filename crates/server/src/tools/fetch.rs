//! sw_fetch tool implementation.
//!
//! Delivers one intercepted request to the orchestrator and reports which
//! route and source answered it.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::worker::{FetchOutcome, ResponseSource};
use swcache_core::{CacheOrchestrator, Request, RequestMode, RouteClass};

use super::json_result;

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET). Anything else passes through.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode; `navigate` marks a top-level page load.
    #[serde(default)]
    pub mode: RequestMode,

    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// The resolved request URL.
    pub url: String,
    /// False when the request was left to the host untouched.
    pub handled: bool,
    pub route: Option<RouteClass>,
    pub source: Option<ResponseSource>,
    pub status: Option<u16>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Response body decoded as UTF-8 (lossy).
    pub body: Option<String>,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &CacheOrchestrator, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let url = worker.resolve(&params.url)?;
    let mut request = Request::get(url.clone()).with_method(params.method);
    request.mode = params.mode;
    for (name, value) in params.headers {
        request = request.with_header(&name, value);
    }

    let output = match worker.handle_fetch(request).await {
        FetchOutcome::Passthrough => SwFetchOutput {
            url: url.to_string(),
            handled: false,
            route: None,
            source: None,
            status: None,
            headers: BTreeMap::new(),
            body: None,
        },
        FetchOutcome::Respond { route, served } => SwFetchOutput {
            url: url.to_string(),
            handled: true,
            route: Some(route),
            source: Some(served.source),
            status: Some(served.response.status),
            body: Some(served.response.text()),
            headers: served.response.headers,
        },
    };

    json_result(&output)
}
