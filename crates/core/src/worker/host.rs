//! Capabilities the hosting runtime lends to the orchestrator.
//!
//! The orchestrator never reaches for ambient globals: the network, the set of
//! connected pages, and the worker registration are all injected through these
//! traits so a browser adapter, a stdio host, or a test double can stand in.

use serde::{Deserialize, Serialize};

use super::push::Notification;
use crate::Error;
use crate::http::{Request, Response};

/// Outbound transport for requests the orchestrator decides to send.
///
/// Any HTTP status is a successful fetch; `Err` means the transport failed
/// (unreachable, reset, timed out).
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Kind of a connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ClientKind {
    Window,
    Worker,
    SharedWorker,
}

/// Which clients a `match_all` call should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientFilter {
    All,
    Window,
}

impl ClientFilter {
    pub fn accepts(self, kind: ClientKind) -> bool {
        match self {
            ClientFilter::All => true,
            ClientFilter::Window => kind == ClientKind::Window,
        }
    }
}

/// A page instance the host reports as connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ClientInfo {
    pub id: String,
    pub url: String,
    pub kind: ClientKind,
}

/// Messages broadcast to every connected client, serialized as `{type, payload}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BroadcastMessage {
    /// A fresh network response was written to the cache.
    CacheUpdated {
        url: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        background: bool,
    },
    /// The network failed and a cached copy was served instead.
    OfflineFallback { url: String },
    /// This version took control.
    SwActivated { version: String },
    /// Raw payload of a push event, for in-page handling.
    PushReceived(serde_json::Value),
    /// Pending background work finished.
    SyncBackground { status: String },
}

/// Connected page instances, owned by the host.
#[async_trait::async_trait]
pub trait Clients: Send + Sync {
    async fn match_all(&self, filter: ClientFilter) -> Result<Vec<ClientInfo>, Error>;

    async fn post_message(&self, client_id: &str, message: &BroadcastMessage) -> Result<(), Error>;

    /// Take control of every open client without waiting for a navigation.
    async fn claim(&self) -> Result<(), Error>;

    async fn focus(&self, client_id: &str) -> Result<(), Error>;

    async fn open_window(&self, url: &str) -> Result<(), Error>;
}

/// The worker's own registration.
#[async_trait::async_trait]
pub trait Registration: Send + Sync {
    /// Activate as soon as installation finishes instead of waiting for old clients.
    async fn skip_waiting(&self) -> Result<(), Error>;

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error>;

    async fn close_notification(&self, tag: &str) -> Result<(), Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_broadcast_wire_format() {
        let msg = BroadcastMessage::CacheUpdated { url: "https://a/x".into(), background: false };
        assert_eq!(serde_json::to_value(&msg).unwrap(), json!({"type": "CACHE_UPDATED", "payload": {"url": "https://a/x"}}));

        let msg = BroadcastMessage::CacheUpdated { url: "https://a/x".into(), background: true };
        assert_eq!(serde_json::to_value(&msg).unwrap()["payload"]["background"], true);

        let msg = BroadcastMessage::SwActivated { version: "3.0.0".into() };
        assert_eq!(serde_json::to_value(&msg).unwrap(), json!({"type": "SW_ACTIVATED", "payload": {"version": "3.0.0"}}));

        let msg = BroadcastMessage::PushReceived(json!({"title": "Hi"}));
        assert_eq!(serde_json::to_value(&msg).unwrap(), json!({"type": "PUSH_RECEIVED", "payload": {"title": "Hi"}}));
    }

    #[test]
    fn test_client_filter() {
        assert!(ClientFilter::All.accepts(ClientKind::Worker));
        assert!(ClientFilter::Window.accepts(ClientKind::Window));
        assert!(!ClientFilter::Window.accepts(ClientKind::SharedWorker));
    }
}
