//! swcache host entry point.
//!
//! Boots the cache orchestrator against a SQLite store and a real HTTP
//! transport, then serves its event entry points as MCP tools on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use swcache_client::{FetchConfig, HttpNetwork};
use swcache_core::worker::Collaborators;
use swcache_core::{AppConfig, CacheDb, CacheOrchestrator};

use host::LocalHost;

mod error;
mod handler;
mod host;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(cache = %config.cache_name(), db = %config.db_path.display(), "Starting swcache host on stdio transport");

    let storage = CacheDb::open(&config.db_path)
        .await
        .map_err(|e| anyhow!("failed to open cache database {}: {e}", config.db_path.display()))?;
    let network = HttpNetwork::new(FetchConfig::from(&config)).map_err(|e| anyhow!("{e}"))?;
    let host = Arc::new(LocalHost::new());

    let worker = CacheOrchestrator::new(
        config,
        Collaborators {
            storage: Arc::new(storage),
            network: Arc::new(network),
            clients: host.clone(),
            registration: host.clone(),
        },
    )
    .map_err(|e| anyhow!("{e}"))?;
    let cleanup = worker.spawn_periodic_cleanup();

    let handler = handler::SwCacheServer::new(worker.clone(), host);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    cleanup.abort();
    worker.settle().await;

    Ok(())
}
