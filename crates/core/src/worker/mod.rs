//! Service worker cache orchestration.
//!
//! [`CacheOrchestrator`] exposes one async entry point per event the hosting
//! runtime can deliver:
//!
//! | event              | entry point                    |
//! |--------------------|--------------------------------|
//! | install            | [`CacheOrchestrator::install`] |
//! | activate           | [`CacheOrchestrator::activate`] |
//! | fetch              | [`CacheOrchestrator::handle_fetch`] |
//! | message            | [`CacheOrchestrator::handle_message`] |
//! | push               | [`CacheOrchestrator::handle_push`] |
//! | notificationclick  | [`CacheOrchestrator::handle_notification_click`] |
//! | sync               | [`CacheOrchestrator::handle_sync`] |
//!
//! Every handler degrades locally: network and storage failures are logged and
//! turned into cached, synthesized, or empty results rather than propagated
//! into the host's event loop.

pub mod eviction;
pub mod fallback;
pub mod host;
pub mod lifecycle;
pub mod messages;
pub mod push;
pub mod strategy;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use url::Url;

use crate::Error;
use crate::cache::{CacheEntry, CacheStorage};
use crate::config::AppConfig;
use crate::http::{Request, Response};
use crate::routes::RouteTable;

pub use eviction::{CacheStatusSnapshot, EvictionPlan, EvictionReport, Victim, plan_eviction};
pub use host::{BroadcastMessage, ClientFilter, ClientInfo, ClientKind, Clients, Network, Registration};
pub use lifecycle::{ActivateReport, InstallReport, WorkerState};
pub use messages::{ClientCommand, ClientMessage, MessageReply, PrefetchReport};
pub use push::{ClickOutcome, Notification, NotificationAction, PushPayload};
pub use strategy::{FetchOutcome, ResponseSource, Served};
pub use sync::{SyncOutcome, SyncTag};

/// Host-provided collaborators.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn CacheStorage>,
    pub network: Arc<dyn Network>,
    pub clients: Arc<dyn Clients>,
    pub registration: Arc<dyn Registration>,
}

/// The cache orchestrator.
///
/// Cheap to clone: all state is shared, so a clone can be moved into detached
/// background work.
#[derive(Clone)]
pub struct CacheOrchestrator {
    config: Arc<AppConfig>,
    cache_name: Arc<str>,
    base_url: Arc<Url>,
    routes: Arc<RouteTable>,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    clients: Arc<dyn Clients>,
    registration: Arc<dyn Registration>,
    state: Arc<AtomicU8>,
    background: Arc<Mutex<JoinSet<()>>>,
}

impl CacheOrchestrator {
    /// Build an orchestrator for the configured version.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if `base_url` does not parse and
    /// `Error::InvalidInput` if a route pattern does not compile.
    pub fn new(config: AppConfig, collaborators: Collaborators) -> Result<Self, Error> {
        let base_url = Url::parse(&config.base_url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        let routes =
            RouteTable::from_config(&config).map_err(|e| Error::InvalidInput(format!("invalid route pattern: {e}")))?;

        Ok(Self {
            cache_name: config.cache_name().into(),
            config: Arc::new(config),
            base_url: Arc::new(base_url),
            routes: Arc::new(routes),
            storage: collaborators.storage,
            network: collaborators.network,
            clients: collaborators.clients,
            registration: collaborators.registration,
            state: Arc::new(AtomicU8::new(WorkerState::Parsed as u8)),
            background: Arc::new(Mutex::new(JoinSet::new())),
        })
    }

    /// Name of the store this version reads and writes.
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: WorkerState) {
        let previous = WorkerState::from_u8(self.state.swap(state as u8, Ordering::AcqRel));
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "worker state changed");
        }
    }

    /// Resolve a path or absolute URL against the worker's origin.
    pub fn resolve(&self, resource: &str) -> Result<Url, Error> {
        self.base_url
            .join(resource)
            .map_err(|e| Error::InvalidUrl(format!("{resource}: {e}")))
    }

    /// Wait until every detached background task has finished.
    ///
    /// Hosts call this before tearing the process down.
    pub async fn settle(&self) {
        loop {
            let mut pending = std::mem::take(&mut *self.background.lock().await);
            if pending.is_empty() {
                return;
            }
            while let Some(result) = pending.join_next().await {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "background task aborted");
                }
            }
        }
    }

    /// Start the recurring eviction pass.
    ///
    /// The first pass runs one interval from now; dropping the handle does not
    /// stop the task, aborting it does.
    pub fn spawn_periodic_cleanup(&self) -> JoinHandle<()> {
        let this = self.clone();
        let period = self.config.cleanup_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                this.cleanup().await;
            }
        })
    }

    async fn spawn_background<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.background.lock().await;
        while set.try_join_next().is_some() {}
        set.spawn(task);
    }

    /// Look up the current store. Read failures count as a miss.
    async fn lookup(&self, request: &Request) -> Option<CacheEntry> {
        let key = crate::cache::compute_request_key(&request.method, &request.url);
        match self.storage.get(&self.cache_name, &key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache read failed");
                None
            }
        }
    }

    /// Write a response into the current store. Failures are logged, not returned;
    /// the result says whether the entry was written.
    async fn store(&self, request: &Request, response: &Response) -> bool {
        let entry = CacheEntry::new(request, response.clone());
        match self.storage.put(&self.cache_name, &entry).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache write failed");
                false
            }
        }
    }

    /// Post a message to every connected client. Delivery failures are logged only.
    async fn broadcast(&self, message: BroadcastMessage) {
        let clients = match self.clients.match_all(ClientFilter::All).await {
            Ok(clients) => clients,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate clients");
                return;
            }
        };

        for client in &clients {
            if let Err(e) = self.clients.post_message(&client.id, &message).await {
                tracing::warn!(client = %client.id, error = %e, "could not notify client");
            }
        }
    }
}
