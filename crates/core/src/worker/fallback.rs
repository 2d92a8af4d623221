//! Responses synthesized when neither the network nor the cache can answer.

use chrono::{SecondsFormat, Utc};
use serde_json::json;

use super::CacheOrchestrator;
use crate::http::{Request, Response};

impl CacheOrchestrator {
    /// Build the last-resort response for a request.
    ///
    /// Navigations get the cached offline page, or a built-in one if that was
    /// never cached. Everything else gets a JSON 503.
    pub async fn fallback_response(&self, request: &Request) -> Response {
        if request.is_navigation() {
            if let Ok(url) = self.resolve(&self.config.offline_page)
                && let Some(entry) = self.lookup(&Request::get(url)).await
            {
                return entry.response;
            }
            return Response::html(200, offline_page(&self.config.version));
        }

        Response::json(
            503,
            &json!({
                "error": "Network unavailable",
                "message": "This request failed and no cached version is available",
                "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            }),
        )
    }
}

fn offline_page(version: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en" data-theme="dark">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>GGenius - Offline</title>
<style>
* {{ margin: 0; padding: 0; box-sizing: border-box; }}
body {{
  font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
  background: linear-gradient(135deg, #0f0f23 0%, #1a1a3e 100%);
  color: white; min-height: 100vh;
  display: flex; align-items: center; justify-content: center;
  text-align: center; padding: 2rem;
}}
.container {{ max-width: 600px; }}
h1 {{ font-size: 2.5rem; margin-bottom: 1rem; color: #7c4dff; }}
p {{ font-size: 1.1rem; margin-bottom: 2rem; opacity: 0.8; }}
.btn {{
  background: linear-gradient(135deg, #7c4dff, #2196f3);
  color: white; padding: 1rem 2rem; border: none;
  border-radius: 8px; font-size: 1rem; cursor: pointer;
}}
.status {{ margin-top: 2rem; font-size: 0.9rem; opacity: 0.6; }}
</style>
</head>
<body>
<div class="container">
<h1>GGenius is offline</h1>
<p>There is no internet connection, but pages you already visited keep working.</p>
<button class="btn" onclick="window.location.reload()">Try again</button>
<div class="status">Service worker v{version} active</div>
</div>
<script>
window.addEventListener('online', () => {{
  setTimeout(() => window.location.reload(), 1000);
}});
</script>
</body>
</html>
"#,
        version = escape_html(version)
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::worker::testing::{Harness, ok, url};

    #[tokio::test]
    async fn test_navigation_gets_builtin_offline_page() {
        let h = Harness::new(AppConfig::default());
        let resp = h.worker.fallback_response(&Request::navigate(url("/guides"))).await;

        assert_eq!(resp.status, 200);
        assert!(resp.header("content-type").unwrap().starts_with("text/html"));
        let html = resp.text();
        assert!(html.contains("v3.0.0"));
        assert!(html.contains("addEventListener('online'"));
        assert!(html.contains("Try again"));
    }

    #[tokio::test]
    async fn test_navigation_prefers_cached_offline_page() {
        let h = Harness::new(AppConfig::default());
        h.worker.store(&Request::get(url("/offline.html")), &ok("<p>cached offline</p>")).await;

        let resp = h.worker.fallback_response(&Request::navigate(url("/guides"))).await;
        assert_eq!(resp.text(), "<p>cached offline</p>");
    }

    #[tokio::test]
    async fn test_other_requests_get_json_503() {
        let h = Harness::new(AppConfig::default());
        let resp = h.worker.fallback_response(&Request::get(url("/api/cards"))).await;

        assert_eq!(resp.status, 503);
        let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(body["error"], "Network unavailable");
        assert_eq!(body["message"], "This request failed and no cached version is available");
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_version_is_escaped() {
        let html = offline_page("<script>1</script>");
        assert!(html.contains("v&lt;script&gt;1&lt;/script&gt;"));
    }
}
