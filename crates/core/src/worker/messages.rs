//! Client message channel.
//!
//! Pages post `{type, data}` objects. Recognized types:
//!
//! - `SKIP_WAITING`: activate without waiting for old clients, no reply
//! - `GET_VERSION`: replies `{version}`
//! - `CLEAR_CACHE`: deletes every store, this version's included; replies `{success}`
//! - `PREFETCH_RESOURCES`: fetches and stores `data.urls`; replies with a per-URL report
//! - `GET_CACHE_STATUS`: replies with a [`CacheStatusSnapshot`]
//!
//! Anything else is logged and dropped. A failing handler replies `{error}`.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CacheOrchestrator, CacheStatusSnapshot};
use crate::Error;

/// A message posted by a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl ClientMessage {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self { kind: kind.into(), data }
    }
}

/// A recognized client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    SkipWaiting,
    GetVersion,
    ClearCache,
    PrefetchResources(Vec<String>),
    GetCacheStatus,
    Unknown(String),
}

#[derive(Deserialize)]
struct PrefetchData {
    #[serde(default)]
    urls: Vec<String>,
}

impl ClientCommand {
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` when a known type carries unusable data.
    pub fn parse(message: &ClientMessage) -> Result<Self, Error> {
        Ok(match message.kind.as_str() {
            "SKIP_WAITING" => ClientCommand::SkipWaiting,
            "GET_VERSION" => ClientCommand::GetVersion,
            "CLEAR_CACHE" => ClientCommand::ClearCache,
            "PREFETCH_RESOURCES" => {
                let urls = match &message.data {
                    Value::Null => Vec::new(),
                    data => {
                        serde_json::from_value::<PrefetchData>(data.clone())
                            .map_err(|e| Error::InvalidInput(format!("PREFETCH_RESOURCES data: {e}")))?
                            .urls
                    }
                };
                ClientCommand::PrefetchResources(urls)
            }
            "GET_CACHE_STATUS" => ClientCommand::GetCacheStatus,
            other => ClientCommand::Unknown(other.to_string()),
        })
    }
}

/// Outcome of a prefetch batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PrefetchReport {
    pub requested: usize,
    pub cached: Vec<String>,
    pub failed: Vec<String>,
}

/// Reply posted back on the caller's reply channel.
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum MessageReply {
    Version { version: String },
    Cleared { success: bool },
    Status(CacheStatusSnapshot),
    Prefetched(PrefetchReport),
    Failed { error: String },
}

impl MessageReply {
    fn failed(error: &Error) -> Self {
        MessageReply::Failed { error: error.to_string() }
    }
}

impl CacheOrchestrator {
    /// Handle a client message, returning the reply to post, if any.
    pub async fn handle_message(&self, message: ClientMessage) -> Option<MessageReply> {
        let command = match ClientCommand::parse(&message) {
            Ok(command) => command,
            Err(e) => {
                tracing::error!(kind = %message.kind, error = %e, "message handling failed");
                return Some(MessageReply::failed(&e));
            }
        };

        match command {
            ClientCommand::SkipWaiting => match self.registration.skip_waiting().await {
                Ok(()) => None,
                Err(e) => {
                    tracing::error!(error = %e, "skip waiting failed");
                    Some(MessageReply::failed(&e))
                }
            },
            ClientCommand::GetVersion => Some(MessageReply::Version { version: self.config.version.clone() }),
            ClientCommand::ClearCache => match self.clear_all_caches().await {
                Ok(_) => Some(MessageReply::Cleared { success: true }),
                Err(e) => {
                    tracing::error!(error = %e, "clearing caches failed");
                    Some(MessageReply::failed(&e))
                }
            },
            ClientCommand::PrefetchResources(urls) => Some(MessageReply::Prefetched(self.prefetch(&urls).await)),
            ClientCommand::GetCacheStatus => match self.cache_status().await {
                Ok(status) => Some(MessageReply::Status(status)),
                Err(e) => {
                    tracing::error!(error = %e, "failed to get cache status");
                    Some(MessageReply::failed(&e))
                }
            },
            ClientCommand::Unknown(kind) => {
                tracing::warn!(kind = %kind, "unknown message type");
                None
            }
        }
    }

    /// Delete every store, this version's included. Returns how many were deleted.
    pub async fn clear_all_caches(&self) -> Result<usize, Error> {
        let mut deleted = 0;
        for name in self.storage.keys().await? {
            if self.storage.delete(&name).await? {
                deleted += 1;
            }
        }
        tracing::info!(deleted, "all caches cleared");
        Ok(deleted)
    }

    /// Fetch and store each URL independently; one failure never stops the batch.
    pub async fn prefetch(&self, urls: &[String]) -> PrefetchReport {
        let mut report = PrefetchReport { requested: urls.len(), ..Default::default() };
        if let Err(e) = self.storage.open(&self.cache_name).await {
            tracing::error!(cache = %self.cache_name, error = %e, "prefetch failed: cannot open cache");
            report.failed = urls.to_vec();
            return report;
        }

        let results = join_all(urls.iter().map(|url| self.add(url))).await;
        for (url, result) in urls.iter().zip(results) {
            match result {
                Ok(()) => report.cached.push(url.clone()),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "failed to prefetch");
                    report.failed.push(url.clone());
                }
            }
        }

        tracing::info!(requested = report.requested, cached = report.cached.len(), "prefetched resources");
        report
    }
}
