//! Shared fixtures for tool tests.

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::model::CallToolResult;
use swcache_core::worker::{Collaborators, Network};
use swcache_core::{AppConfig, CacheOrchestrator, Error, MemoryStorage, Request, Response};

use crate::host::LocalHost;

pub(crate) const ORIGIN: &str = "http://localhost:8000/";

/// Answers from a fixed path table; everything else is unreachable.
#[derive(Default)]
pub(crate) struct StaticNetwork {
    routes: HashMap<String, Response>,
}

impl StaticNetwork {
    pub(crate) fn with(mut self, path: &str, body: &str) -> Self {
        let response = Response::new(200)
            .with_header("content-length", body.len().to_string())
            .with_body(body.to_string());
        self.routes.insert(path.to_string(), response);
        self
    }
}

#[async_trait::async_trait]
impl Network for StaticNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.routes
            .get(request.url.path())
            .cloned()
            .ok_or_else(|| Error::Network(format!("{}: unreachable", request.url)))
    }
}

pub(crate) fn worker(network: StaticNetwork) -> (CacheOrchestrator, Arc<LocalHost>) {
    let host = Arc::new(LocalHost::new());
    let config = AppConfig { base_url: ORIGIN.into(), critical_resources: vec!["/".into()], ..Default::default() };
    let collaborators = Collaborators {
        storage: Arc::new(MemoryStorage::new()),
        network: Arc::new(network),
        clients: host.clone(),
        registration: host.clone(),
    };
    (CacheOrchestrator::new(config, collaborators).unwrap(), host)
}

/// Parse the JSON text of a tool result.
pub(crate) fn output(result: &CallToolResult) -> serde_json::Value {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
