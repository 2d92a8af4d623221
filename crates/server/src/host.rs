//! In-process stand-in for the browser's client and registration APIs.
//!
//! Pages are simulated by tool calls: `client_connect` registers one, every
//! broadcast lands in its inbox, and `client_inbox` reads it back. Windows
//! opened by a notification click become new clients.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::RwLock;

use swcache_core::Error;
use swcache_core::worker::{BroadcastMessage, ClientFilter, ClientInfo, ClientKind, Clients, Notification, Registration};

use crate::error::HostError;

#[derive(Debug)]
struct Connected {
    info: ClientInfo,
    inbox: Vec<BroadcastMessage>,
    focused: bool,
}

#[derive(Debug, Default)]
pub struct LocalHost {
    clients: RwLock<Vec<Connected>>,
    notifications: RwLock<HashMap<String, Notification>>,
    opened: AtomicUsize,
    claimed: AtomicBool,
    skip_waiting: AtomicBool,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client, replacing any previous one with the same id.
    pub async fn connect(&self, info: ClientInfo) {
        let mut clients = self.clients.write().await;
        clients.retain(|c| c.info.id != info.id);
        tracing::debug!(client = %info.id, url = %info.url, "client connected");
        clients.push(Connected { info, inbox: Vec::new(), focused: false });
    }

    pub async fn disconnect(&self, id: &str) -> Result<(), HostError> {
        let mut clients = self.clients.write().await;
        let before = clients.len();
        clients.retain(|c| c.info.id != id);
        if clients.len() == before {
            return Err(HostError::UnknownClient(id.to_string()));
        }
        tracing::debug!(client = id, "client disconnected");
        Ok(())
    }

    /// Messages delivered to a client, oldest first. Draining empties the inbox.
    pub async fn inbox(&self, id: &str, drain: bool) -> Result<Vec<BroadcastMessage>, HostError> {
        let mut clients = self.clients.write().await;
        let client = clients
            .iter_mut()
            .find(|c| c.info.id == id)
            .ok_or_else(|| HostError::UnknownClient(id.to_string()))?;
        Ok(if drain { std::mem::take(&mut client.inbox) } else { client.inbox.clone() })
    }

    pub async fn list(&self) -> Vec<ClientInfo> {
        self.clients.read().await.iter().map(|c| c.info.clone()).collect()
    }

    pub async fn focused(&self) -> Option<String> {
        self.clients
            .read()
            .await
            .iter()
            .find(|c| c.focused)
            .map(|c| c.info.id.clone())
    }

    /// A displayed notification, by tag.
    pub async fn notification(&self, tag: &str) -> Result<Notification, HostError> {
        self.notifications
            .read()
            .await
            .get(tag)
            .cloned()
            .ok_or_else(|| HostError::UnknownNotification(tag.to_string()))
    }

    #[cfg(test)]
    pub fn claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::Acquire)
    }
}

#[async_trait::async_trait]
impl Clients for LocalHost {
    async fn match_all(&self, filter: ClientFilter) -> Result<Vec<ClientInfo>, Error> {
        let clients = self.clients.read().await;
        Ok(clients
            .iter()
            .filter(|c| filter.accepts(c.info.kind))
            .map(|c| c.info.clone())
            .collect())
    }

    async fn post_message(&self, client_id: &str, message: &BroadcastMessage) -> Result<(), Error> {
        let mut clients = self.clients.write().await;
        let client = clients
            .iter_mut()
            .find(|c| c.info.id == client_id)
            .ok_or_else(|| HostError::UnknownClient(client_id.to_string()))?;
        client.inbox.push(message.clone());
        Ok(())
    }

    async fn claim(&self) -> Result<(), Error> {
        self.claimed.store(true, Ordering::Release);
        Ok(())
    }

    async fn focus(&self, client_id: &str) -> Result<(), Error> {
        let mut clients = self.clients.write().await;
        if !clients.iter().any(|c| c.info.id == client_id) {
            return Err(HostError::UnknownClient(client_id.to_string()).into());
        }
        for client in clients.iter_mut() {
            client.focused = client.info.id == client_id;
        }
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<(), Error> {
        let n = self.opened.fetch_add(1, Ordering::AcqRel) + 1;
        let info = ClientInfo { id: format!("window-{n}"), url: url.to_string(), kind: ClientKind::Window };
        tracing::info!(client = %info.id, url, "opened window");

        let mut clients = self.clients.write().await;
        for client in clients.iter_mut() {
            client.focused = false;
        }
        clients.push(Connected { info, inbox: Vec::new(), focused: true });
        Ok(())
    }
}

#[async_trait::async_trait]
impl Registration for LocalHost {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.skip_waiting.store(true, Ordering::Release);
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(tag = %notification.tag, title = %notification.title, "showing notification");
        self.notifications
            .write()
            .await
            .insert(notification.tag.clone(), notification.clone());
        Ok(())
    }

    async fn close_notification(&self, tag: &str) -> Result<(), Error> {
        self.notifications.write().await.remove(tag);
        Ok(())
    }
}
