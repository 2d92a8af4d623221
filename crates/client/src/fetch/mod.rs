//! HTTP transport for intercepted requests.
//!
//! - Any status is returned as a response; only transport failures are errors
//! - Max redirects: 5
//! - Max body bytes: 10MB (configurable), enforced while the body streams in
//! - Transport timeout: 20s (configurable), reported as `FETCH_TIMEOUT`
//! - Decoded bodies keep a `content-length` so cached entries stay sized

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use reqwest::{Client, Method, header};

use swcache_core::worker::Network;
use swcache_core::{AppConfig, Error, Request, Response};

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "swcache/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Self::default()
        }
    }
}

/// reqwest-backed [`Network`].
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new transport with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn too_large(&self, len: u64) -> Error {
        Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

fn transport_error(url: &url::Url, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::FetchTimeout(format!("{url}: {e}"))
    } else {
        Error::Network(format!("{url}: {e}"))
    }
}

#[async_trait::async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let mut response = builder.send().await.map_err(|e| transport_error(&request.url, e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len));
        }

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let mut headers = collect_headers(response.headers());

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| transport_error(&request.url, e))? {
            let len = body.len() + chunk.len();
            if len > self.config.max_bytes {
                return Err(self.too_large(len as u64));
            }
            body.extend_from_slice(&chunk);
        }

        // Decompression drops the wire length; record the decoded size instead.
        headers
            .entry("content-length".to_string())
            .or_insert_with(|| body.len().to_string());

        tracing::debug!(
            url = %request.url,
            final_url = %final_url,
            status,
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched"
        );

        Ok(Response { status, headers, body: body.into() })
    }
}

/// Flatten a header map, joining repeated headers with `, `.
fn collect_headers(map: &header::HeaderMap) -> BTreeMap<String, String> {
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in map {
        let Ok(value) = value.to_str() else { continue };
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use url::Url;

    /// `body { color: red; }`, gzipped.
    const GZIPPED_CSS: &[u8] = &[
        0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x03, 0x4b, 0xca, 0x4f, 0xa9, 0x54, 0xa8, 0x56, 0x48,
        0xce, 0xcf, 0xc9, 0x2f, 0xb2, 0x52, 0x28, 0x4a, 0x4d, 0xb1, 0x56, 0xa8, 0x05, 0x00, 0x81, 0xaf, 0xd4, 0x8f,
        0x14, 0x00, 0x00, 0x00,
    ];

    /// Serve one canned HTTP response on a loopback port.
    async fn serve_parts(head: &'static str, body: &'static [u8]) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.ok();
        });
        Url::parse(&format!("http://{addr}/asset.css")).unwrap()
    }

    async fn serve_once(raw: &'static str) -> Url {
        serve_parts(raw, &[]).await
    }

    fn network(config: FetchConfig) -> HttpNetwork {
        HttpNetwork::new(config).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "swcache/0.1");
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app() {
        let app = AppConfig { user_agent: "ggenius-sw/3".into(), timeout_ms: 1500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "ggenius-sw/3");
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_collect_headers_joins_repeats() {
        let mut map = header::HeaderMap::new();
        map.append("vary", "accept".parse().unwrap());
        map.append("vary", "origin".parse().unwrap());
        map.insert("content-length", "3".parse().unwrap());

        let headers = collect_headers(&map);
        assert_eq!(headers["vary"], "accept, origin");
        assert_eq!(headers["content-length"], "3");
    }

    #[tokio::test]
    async fn test_error_status_is_a_response() {
        let url = serve_once("HTTP/1.1 404 Not Found\r\ncontent-length: 3\r\nconnection: close\r\n\r\nnop").await;

        let response = network(FetchConfig::default()).fetch(&Request::get(url)).await.unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.content_length(), Some(3));
        assert_eq!(&response.body[..], b"nop");
    }

    #[tokio::test]
    async fn test_declared_size_over_limit() {
        let url = serve_once("HTTP/1.1 200 OK\r\ncontent-length: 64\r\nconnection: close\r\n\r\n").await;
        let config = FetchConfig { max_bytes: 16, ..Default::default() };

        let err = network(config).fetch(&Request::get(url)).await.unwrap_err();
        assert!(matches!(err, Error::FetchTooLarge(_)));
    }

    #[tokio::test]
    async fn test_gzip_body_keeps_declared_size() {
        let url = serve_parts(
            "HTTP/1.1 200 OK\r\ncontent-type: text/css\r\ncontent-encoding: gzip\r\ncontent-length: 40\r\nconnection: close\r\n\r\n",
            GZIPPED_CSS,
        )
        .await;

        let response = network(FetchConfig::default()).fetch(&Request::get(url)).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.text(), "body { color: red; }");
        assert_eq!(response.content_length(), Some(20));
    }

    #[tokio::test]
    async fn test_undeclared_body_over_limit() {
        let url = serve_parts(
            "HTTP/1.1 200 OK\r\nconnection: close\r\n\r\n",
            b"0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef",
        )
        .await;
        let config = FetchConfig { max_bytes: 16, ..Default::default() };

        let err = network(config).fetch(&Request::get(url)).await.unwrap_err();
        assert!(matches!(err, Error::FetchTooLarge(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{addr}/")).unwrap();
        let err = network(FetchConfig::default()).fetch(&Request::get(url)).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn test_stalled_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let config = FetchConfig { timeout: Duration::from_millis(200), ..Default::default() };
        let url = Url::parse(&format!("http://{addr}/")).unwrap();
        let err = network(config).fetch(&Request::get(url)).await.unwrap_err();
        assert!(matches!(err, Error::FetchTimeout(_)));
    }
}
