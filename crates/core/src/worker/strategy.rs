//! Fetch interception and the three caching strategies.

use serde::{Deserialize, Serialize};

use super::{BroadcastMessage, CacheOrchestrator};
use crate::Error;
use crate::http::{Request, Response};
use crate::routes::{RouteClass, Strategy};

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    Fallback,
}

/// A response chosen for an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
}

impl Served {
    fn network(response: Response) -> Self {
        Self { response, source: ResponseSource::Network }
    }

    fn cache(response: Response) -> Self {
        Self { response, source: ResponseSource::Cache }
    }

    fn fallback(response: Response) -> Self {
        Self { response, source: ResponseSource::Fallback }
    }
}

/// Result of intercepting a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not ours to handle; the host sends the request as if no worker existed.
    Passthrough,
    Respond { route: RouteClass, served: Served },
}

impl CacheOrchestrator {
    /// Handle one intercepted request.
    ///
    /// Non-HTTP schemes and non-GET methods pass through untouched. Every other
    /// request gets exactly one response: any strategy error is turned into the
    /// fallback response.
    pub async fn handle_fetch(&self, request: Request) -> FetchOutcome {
        if !request.is_http() || !request.is_get() {
            tracing::trace!(method = %request.method, url = %request.url, "passing request through");
            return FetchOutcome::Passthrough;
        }

        let route = self.routes.classify(&request.url);
        let strategy = route.strategy();
        tracing::debug!(url = %request.url, ?route, %strategy, "handling fetch");

        let result = match strategy {
            Strategy::NetworkFirst => self.network_first(&request).await,
            Strategy::CacheFirst => self.cache_first(&request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(&request).await,
        };

        let served = match result {
            Ok(served) => served,
            Err(e) => {
                tracing::error!(url = %request.url, %strategy, error = %e, "fetch strategy failed");
                Served::fallback(self.fallback_response(&request).await)
            }
        };
        FetchOutcome::Respond { route, served }
    }

    /// Network within the configured deadline; the cache only when the network fails.
    pub async fn network_first(&self, request: &Request) -> Result<Served, Error> {
        let deadline = self.config.network_timeout();
        let fetched = match tokio::time::timeout(deadline, self.network.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::FetchTimeout(format!("{} exceeded {}ms", request.url, deadline.as_millis()))),
        };

        match fetched {
            Ok(response) => {
                if response.is_ok() && self.store(request, &response).await {
                    self.broadcast(BroadcastMessage::CacheUpdated { url: request.url.to_string(), background: false })
                        .await;
                }
                Ok(Served::network(response))
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "network failed, trying cache");
                match self.lookup(request).await {
                    Some(entry) => {
                        self.broadcast(BroadcastMessage::OfflineFallback { url: request.url.to_string() })
                            .await;
                        Ok(Served::cache(entry.response))
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// A fresh cache entry without touching the network; otherwise refetch.
    ///
    /// An expired entry still beats no response when the network fails.
    pub async fn cache_first(&self, request: &Request) -> Result<Served, Error> {
        let cached = self.lookup(request).await;
        if let Some(entry) = &cached
            && !entry.is_expired(self.config.cache_expiry(), chrono::Utc::now())
        {
            return Ok(Served::cache(entry.response.clone()));
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store(request, &response).await;
                }
                Ok(Served::network(response))
            }
            Err(e) => match cached {
                Some(entry) => {
                    tracing::warn!(url = %request.url, error = %e, "network failed, serving expired entry");
                    self.broadcast(BroadcastMessage::OfflineFallback { url: request.url.to_string() })
                        .await;
                    Ok(Served::cache(entry.response))
                }
                None => Err(e),
            },
        }
    }

    /// The cached entry right away, refreshed in the background.
    ///
    /// With nothing cached the caller waits for the network instead.
    pub async fn stale_while_revalidate(&self, request: &Request) -> Result<Served, Error> {
        match self.lookup(request).await {
            Some(entry) => {
                let this = self.clone();
                let request = request.clone();
                self.spawn_background(async move {
                    if let Err(e) = this.revalidate(&request).await {
                        tracing::warn!(url = %request.url, error = %e, "background network update failed");
                    }
                })
                .await;
                Ok(Served::cache(entry.response))
            }
            None => self.revalidate(request).await.map(Served::network),
        }
    }

    async fn revalidate(&self, request: &Request) -> Result<Response, Error> {
        let response = self.network.fetch(request).await?;
        if response.is_ok() && self.store(request, &response).await {
            self.broadcast(BroadcastMessage::CacheUpdated { url: request.url.to_string(), background: true })
                .await;
        }
        Ok(response)
    }
}
