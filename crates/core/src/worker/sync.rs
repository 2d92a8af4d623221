//! Background sync.

use serde::{Deserialize, Serialize};

use super::{BroadcastMessage, CacheOrchestrator, EvictionReport};

/// A sync registration tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTag {
    /// `background-sync`: flush pending work and tell clients.
    BackgroundSync,
    /// `cache-cleanup`: run an eviction pass now.
    CacheCleanup,
    Other(String),
}

impl From<&str> for SyncTag {
    fn from(tag: &str) -> Self {
        match tag {
            "background-sync" => SyncTag::BackgroundSync,
            "cache-cleanup" => SyncTag::CacheCleanup,
            other => SyncTag::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum SyncOutcome {
    Completed,
    Cleaned(EvictionReport),
    Ignored { tag: String },
}

impl CacheOrchestrator {
    pub async fn handle_sync(&self, tag: &str) -> SyncOutcome {
        tracing::info!(tag, "background sync");
        match SyncTag::from(tag) {
            SyncTag::BackgroundSync => {
                self.broadcast(BroadcastMessage::SyncBackground { status: "completed".into() })
                    .await;
                tracing::info!("background sync completed");
                SyncOutcome::Completed
            }
            SyncTag::CacheCleanup => SyncOutcome::Cleaned(self.cleanup().await),
            SyncTag::Other(tag) => {
                tracing::warn!(tag = %tag, "unknown sync tag");
                SyncOutcome::Ignored { tag }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::worker::testing::{Harness, entry_at};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_background_sync_notifies_clients() {
        let h = Harness::new(AppConfig::default());
        h.host.connect("tab-1", "https://ggenius.example/");

        assert_eq!(h.worker.handle_sync("background-sync").await, SyncOutcome::Completed);
        assert_eq!(
            h.host.messages_for("tab-1"),
            vec![BroadcastMessage::SyncBackground { status: "completed".into() }]
        );
    }

    #[tokio::test]
    async fn test_cleanup_tag_evicts() {
        let h = Harness::new(AppConfig { max_cache_bytes: 100, ..Default::default() });
        h.put(entry_at("/old", 60, Utc::now() - Duration::hours(2))).await;
        h.put(entry_at("/new", 60, Utc::now())).await;

        let SyncOutcome::Cleaned(report) = h.worker.handle_sync("cache-cleanup").await else {
            panic!("expected a cleanup");
        };
        assert_eq!(report.removed_entries, 1);
        assert!(h.cached("/old").await.is_none());
        assert!(h.cached("/new").await.is_some());
    }

    #[tokio::test]
    async fn test_unknown_tag_is_ignored() {
        let h = Harness::new(AppConfig::default());
        h.host.connect("tab-1", "https://ggenius.example/");

        assert_eq!(h.worker.handle_sync("upload-photos").await, SyncOutcome::Ignored { tag: "upload-photos".into() });
        assert!(h.host.messages_for("tab-1").is_empty());
    }

    #[test]
    fn test_outcome_wire_format() {
        let json = serde_json::to_value(SyncOutcome::Completed).unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "completed"}));
    }
}
