//! Test doubles for the host collaborators.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use url::Url;

use super::host::{BroadcastMessage, ClientFilter, ClientInfo, ClientKind, Clients, Network, Registration};
use super::push::Notification;
use super::{CacheOrchestrator, Collaborators};
use crate::Error;
use crate::cache::{CacheEntry, CacheStorage, EntryMeta, MemoryStorage};
use crate::config::AppConfig;
use crate::http::{Request, Response};

/// Captures JSON log lines emitted on the current thread while the guard lives.
#[derive(Clone, Default)]
pub(crate) struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub(crate) fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::fmt().with_writer(capture.clone()).json().finish();
        (capture, tracing::subscriber::set_default(subscriber))
    }

    pub(crate) fn contains(&self, needle: &str) -> bool {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).contains(needle)
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

pub(crate) const ORIGIN: &str = "https://ggenius.example/";

pub(crate) fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub(crate) fn ok(body: &str) -> Response {
    Response::new(200)
        .with_header("content-length", body.len().to_string())
        .with_body(body.to_string())
}

/// An entry of `size` declared bytes captured at `at`.
pub(crate) fn entry_at(path: &str, size: usize, at: DateTime<Utc>) -> CacheEntry {
    let response = Response::new(200)
        .with_header("content-length", size.to_string())
        .with_body(vec![b'x'; size]);
    CacheEntry::captured_at(&Request::get(url(path)), response, at)
}

#[derive(Clone)]
enum Script {
    Respond(Response),
    Fail,
    Hang,
}

/// Network double answering from a per-URL script. Unscripted URLs fail.
#[derive(Default)]
pub(crate) struct ScriptedNetwork {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedNetwork {
    fn set(&self, path: &str, script: Script) {
        self.scripts.lock().unwrap().insert(url(path).to_string(), script);
    }

    pub(crate) fn respond(&self, path: &str, response: Response) {
        self.set(path, Script::Respond(response));
    }

    pub(crate) fn fail(&self, path: &str) {
        self.set(path, Script::Fail);
    }

    pub(crate) fn hang(&self, path: &str) {
        self.set(path, Script::Hang);
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().unwrap().get(url(path).as_str()).copied().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let key = request.url.to_string();
        *self.calls.lock().unwrap().entry(key.clone()).or_default() += 1;
        let script = self.scripts.lock().unwrap().get(&key).cloned();
        match script {
            Some(Script::Respond(response)) => Ok(response),
            Some(Script::Hang) => std::future::pending().await,
            Some(Script::Fail) | None => Err(Error::Network(format!("{key}: connection refused"))),
        }
    }
}

#[derive(Default)]
struct HostLog {
    clients: Vec<ClientInfo>,
    messages: Vec<(String, BroadcastMessage)>,
    focused: Vec<String>,
    opened: Vec<String>,
    shown: Vec<Notification>,
    closed: Vec<String>,
    claims: usize,
    skip_waiting: usize,
}

/// Clients and registration double that records every call.
#[derive(Default)]
pub(crate) struct RecordingHost {
    log: Mutex<HostLog>,
}

impl RecordingHost {
    pub(crate) fn connect(&self, id: &str, url: &str) {
        self.connect_as(id, url, ClientKind::Window);
    }

    pub(crate) fn connect_as(&self, id: &str, url: &str, kind: ClientKind) {
        self.log.lock().unwrap().clients.push(ClientInfo { id: id.into(), url: url.into(), kind });
    }

    pub(crate) fn messages_for(&self, id: &str) -> Vec<BroadcastMessage> {
        let log = self.log.lock().unwrap();
        log.messages.iter().filter(|(to, _)| to == id).map(|(_, m)| m.clone()).collect()
    }

    pub(crate) fn focused(&self) -> Vec<String> {
        self.log.lock().unwrap().focused.clone()
    }

    pub(crate) fn opened(&self) -> Vec<String> {
        self.log.lock().unwrap().opened.clone()
    }

    pub(crate) fn shown(&self) -> Vec<Notification> {
        self.log.lock().unwrap().shown.clone()
    }

    pub(crate) fn closed(&self) -> Vec<String> {
        self.log.lock().unwrap().closed.clone()
    }

    pub(crate) fn claim_calls(&self) -> usize {
        self.log.lock().unwrap().claims
    }

    pub(crate) fn skip_waiting_calls(&self) -> usize {
        self.log.lock().unwrap().skip_waiting
    }
}

#[async_trait::async_trait]
impl Clients for RecordingHost {
    async fn match_all(&self, filter: ClientFilter) -> Result<Vec<ClientInfo>, Error> {
        let log = self.log.lock().unwrap();
        Ok(log.clients.iter().filter(|c| filter.accepts(c.kind)).cloned().collect())
    }

    async fn post_message(&self, client_id: &str, message: &BroadcastMessage) -> Result<(), Error> {
        self.log.lock().unwrap().messages.push((client_id.into(), message.clone()));
        Ok(())
    }

    async fn claim(&self) -> Result<(), Error> {
        self.log.lock().unwrap().claims += 1;
        Ok(())
    }

    async fn focus(&self, client_id: &str) -> Result<(), Error> {
        self.log.lock().unwrap().focused.push(client_id.into());
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<(), Error> {
        self.log.lock().unwrap().opened.push(url.into());
        Ok(())
    }
}

#[async_trait::async_trait]
impl Registration for RecordingHost {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.log.lock().unwrap().skip_waiting += 1;
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.log.lock().unwrap().shown.push(notification.clone());
        Ok(())
    }

    async fn close_notification(&self, tag: &str) -> Result<(), Error> {
        self.log.lock().unwrap().closed.push(tag.into());
        Ok(())
    }
}

/// Storage whose writes always fail; reads pass through.
pub(crate) struct ReadOnlyStorage(pub(crate) MemoryStorage);

#[async_trait::async_trait]
impl CacheStorage for ReadOnlyStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.0.open(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.0.keys().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.0.delete(name).await
    }

    async fn get(&self, name: &str, key: &str) -> Result<Option<CacheEntry>, Error> {
        self.0.get(name, key).await
    }

    async fn put(&self, _name: &str, _entry: &CacheEntry) -> Result<(), Error> {
        Err(Error::CorruptEntry("quota exceeded".into()))
    }

    async fn remove(&self, name: &str, key: &str) -> Result<bool, Error> {
        self.0.remove(name, key).await
    }

    async fn list(&self, name: &str) -> Result<Vec<EntryMeta>, Error> {
        self.0.list(name).await
    }
}

/// An orchestrator wired to in-memory doubles, served from [`ORIGIN`].
pub(crate) struct Harness {
    pub(crate) worker: CacheOrchestrator,
    pub(crate) storage: Arc<MemoryStorage>,
    pub(crate) network: Arc<ScriptedNetwork>,
    pub(crate) host: Arc<RecordingHost>,
}

impl Harness {
    pub(crate) fn new(config: AppConfig) -> Self {
        Self::with_storage(config, Arc::new(MemoryStorage::new()), None)
    }

    /// Writes fail, reads see `storage`.
    pub(crate) fn read_only(config: AppConfig) -> Self {
        let storage = Arc::new(MemoryStorage::new());
        let wrapped: Arc<dyn CacheStorage> = Arc::new(ReadOnlyStorage((*storage).clone()));
        Self::with_storage(config, storage, Some(wrapped))
    }

    pub(crate) fn with_storage(mut config: AppConfig, storage: Arc<MemoryStorage>, wrapped: Option<Arc<dyn CacheStorage>>) -> Self {
        config.base_url = ORIGIN.into();
        let network = Arc::new(ScriptedNetwork::default());
        let host = Arc::new(RecordingHost::default());
        let collaborators = Collaborators {
            storage: wrapped.unwrap_or_else(|| storage.clone() as Arc<dyn CacheStorage>),
            network: network.clone(),
            clients: host.clone(),
            registration: host.clone(),
        };
        let worker = CacheOrchestrator::new(config, collaborators).unwrap();
        Self { worker, storage, network, host }
    }

    pub(crate) async fn put(&self, entry: CacheEntry) {
        self.storage.put(self.worker.cache_name(), &entry).await.unwrap();
    }

    pub(crate) async fn cached(&self, path: &str) -> Option<CacheEntry> {
        let key = crate::cache::compute_request_key("GET", &url(path));
        self.storage.get(self.worker.cache_name(), &key).await.unwrap()
    }
}
