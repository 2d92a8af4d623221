//! Install and activate.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use super::{BroadcastMessage, CacheOrchestrator, EvictionReport};
use crate::Error;
use crate::cache::CacheEntry;
use crate::http::Request;

/// Lifecycle state of the running version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum WorkerState {
    Parsed = 0,
    Installing = 1,
    Installed = 2,
    Activating = 3,
    Activated = 4,
}

impl WorkerState {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => WorkerState::Installing,
            2 => WorkerState::Installed,
            3 => WorkerState::Activating,
            4 => WorkerState::Activated,
            _ => WorkerState::Parsed,
        }
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Parsed => write!(f, "parsed"),
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Activated => write!(f, "activated"),
        }
    }
}

/// Outcome of pre-caching the critical resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub cache: String,
    pub cached: Vec<String>,
    pub failed: Vec<String>,
}

/// Outcome of taking control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivateReport {
    pub version: String,
    /// Stores from other versions that were deleted.
    pub deleted: Vec<String>,
    pub eviction: EvictionReport,
}

impl CacheOrchestrator {
    /// Open this version's store and pre-cache the critical resources.
    ///
    /// Each resource is fetched independently; one failing resource never fails
    /// the install. Only an unusable store does.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.set_state(WorkerState::Installing);
        tracing::info!(cache = %self.cache_name, "service worker installing");

        if let Err(e) = self.storage.open(&self.cache_name).await {
            tracing::error!(cache = %self.cache_name, error = %e, "installation failed: cannot open cache");
            self.set_state(WorkerState::Parsed);
            return Err(e);
        }

        let resources = &self.config.critical_resources;
        let results = join_all(resources.iter().map(|resource| self.add(resource))).await;

        let mut report = InstallReport { cache: self.cache_name.to_string(), ..Default::default() };
        for (resource, result) in resources.iter().zip(results) {
            match result {
                Ok(()) => report.cached.push(resource.clone()),
                Err(e) => {
                    tracing::warn!(resource = %resource, error = %e, "failed to cache critical resource");
                    report.failed.push(resource.clone());
                }
            }
        }

        tracing::info!(cached = report.cached.len(), failed = report.failed.len(), "critical resources cached");
        self.set_state(WorkerState::Installed);

        if let Err(e) = self.registration.skip_waiting().await {
            tracing::warn!(error = %e, "skip waiting rejected; activation will wait for old clients");
        }

        Ok(report)
    }

    /// Fetch a resource and store it, failing on any non-2xx status.
    pub(crate) async fn add(&self, resource: &str) -> Result<(), Error> {
        let request = Request::get(self.resolve(resource)?);
        let response = self.network.fetch(&request).await?;
        if !response.is_ok() {
            return Err(Error::HttpError(format!("{} returned status {}", request.url, response.status)));
        }
        self.storage
            .put(&self.cache_name, &CacheEntry::new(&request, response))
            .await
    }

    /// Take control: purge other versions' stores, evict, claim clients, announce.
    ///
    /// Calling it again without a version change deletes nothing.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.set_state(WorkerState::Activating);
        tracing::info!(cache = %self.cache_name, "service worker activating");

        let names = self.storage.keys().await?;
        let stale: Vec<String> = names.into_iter().filter(|n| *n != *self.cache_name).collect();
        let results = join_all(stale.iter().map(|name| self.storage.delete(name))).await;

        let mut deleted = Vec::new();
        let mut first_error = None;
        for (name, result) in stale.into_iter().zip(results) {
            match result {
                Ok(true) => {
                    tracing::info!(cache = %name, "deleted old cache");
                    deleted.push(name);
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(cache = %name, error = %e, "failed to delete old cache");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        self.storage.open(&self.cache_name).await?;
        let eviction = self.cleanup().await;

        if let Err(e) = self.clients.claim().await {
            tracing::warn!(error = %e, "could not claim clients");
        }

        self.set_state(WorkerState::Activated);
        tracing::info!(version = %self.config.version, "service worker activated");

        self.broadcast(BroadcastMessage::SwActivated { version: self.config.version.clone() })
            .await;

        Ok(ActivateReport { version: self.config.version.clone(), deleted, eviction })
    }
}
