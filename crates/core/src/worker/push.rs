//! Push notifications and notification clicks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{BroadcastMessage, CacheOrchestrator, ClientFilter, ClientInfo};
use crate::Error;

/// Inbound push payload. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PushPayload {
    pub title: Option<String>,
    #[serde(alias = "body")]
    pub message: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub tag: Option<String>,
    pub data: Option<Value>,
    pub actions: Option<Vec<NotificationAction>>,
    /// Keep the notification on screen until the user acts on it.
    pub persistent: Option<bool>,
    pub silent: Option<bool>,
}

/// A button declared on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A notification as handed to the host for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub actions: Vec<NotificationAction>,
    #[serde(default)]
    pub require_interaction: bool,
    #[serde(default)]
    pub silent: bool,
}

/// What a notification click did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ClickOutcome {
    Focused { client_id: String, url: String },
    Opened { url: String },
}

impl CacheOrchestrator {
    /// Show a notification for a push payload and rebroadcast the raw payload.
    ///
    /// An absent or unparseable payload is a no-op.
    pub async fn handle_push(&self, payload: Option<&[u8]>) -> Option<Notification> {
        let Some(bytes) = payload else {
            tracing::debug!("push event without payload");
            return None;
        };

        let (raw, parsed) = match serde_json::from_slice::<Value>(bytes)
            .and_then(|raw| serde_json::from_value::<PushPayload>(raw.clone()).map(|p| (raw, p)))
        {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed push payload");
                return None;
            }
        };

        let notification = self.notification_from(parsed);
        tracing::info!(tag = %notification.tag, "push notification received");

        if let Err(e) = self.registration.show_notification(&notification).await {
            tracing::error!(tag = %notification.tag, error = %e, "push notification failed");
        }
        self.broadcast(BroadcastMessage::PushReceived(raw)).await;

        Some(notification)
    }

    fn notification_from(&self, payload: PushPayload) -> Notification {
        let defaults = &self.config.notification;
        Notification {
            title: payload.title.unwrap_or_else(|| defaults.title.clone()),
            body: payload.message.unwrap_or_else(|| defaults.body.clone()),
            icon: payload.icon.unwrap_or_else(|| defaults.icon.clone()),
            badge: payload.badge.unwrap_or_else(|| defaults.badge.clone()),
            tag: payload.tag.unwrap_or_else(|| defaults.tag.clone()),
            data: payload.data.unwrap_or_else(|| Value::Object(Default::default())),
            actions: payload.actions.unwrap_or_default(),
            require_interaction: payload.persistent.unwrap_or(false),
            silent: payload.silent.unwrap_or(false),
        }
    }

    /// Close the notification and bring the user to its target.
    ///
    /// The target is the clicked action's URL, else `data.url`. Without one the
    /// first open window is focused, or the site root opened.
    pub async fn handle_notification_click(
        &self,
        notification: &Notification,
        action: Option<&str>,
    ) -> Result<ClickOutcome, Error> {
        tracing::info!(tag = %notification.tag, action = action.unwrap_or(""), "notification clicked");

        if let Err(e) = self.registration.close_notification(&notification.tag).await {
            tracing::warn!(tag = %notification.tag, error = %e, "could not close notification");
        }

        let windows = self.clients.match_all(ClientFilter::Window).await?;

        if let Some(url) = click_target(notification, action) {
            return self.open_url(&url, &windows).await;
        }

        if let Some(client) = windows.first() {
            self.clients.focus(&client.id).await?;
            return Ok(ClickOutcome::Focused { client_id: client.id.clone(), url: client.url.clone() });
        }

        self.clients.open_window("/").await?;
        Ok(ClickOutcome::Opened { url: "/".into() })
    }

    /// Focus a window already showing `url`, otherwise open a new one.
    async fn open_url(&self, url: &str, windows: &[ClientInfo]) -> Result<ClickOutcome, Error> {
        if let Some(client) = windows.iter().find(|c| c.url.contains(url)) {
            self.clients.focus(&client.id).await?;
            return Ok(ClickOutcome::Focused { client_id: client.id.clone(), url: client.url.clone() });
        }
        self.clients.open_window(url).await?;
        Ok(ClickOutcome::Opened { url: url.to_string() })
    }
}

fn click_target(notification: &Notification, action: Option<&str>) -> Option<String> {
    if let Some(action) = action.filter(|a| !a.is_empty()) {
        let declared = notification
            .actions
            .iter()
            .find(|a| a.action == action)
            .and_then(|a| a.url.clone());
        let from_data = || {
            notification.data.get("actions")?.as_array()?.iter().find_map(|a| {
                (a.get("action")?.as_str()? == action)
                    .then(|| a.get("url")?.as_str().map(String::from))
                    .flatten()
            })
        };
        if let Some(url) = declared.or_else(from_data) {
            return Some(url);
        }
    }
    notification.data.get("url")?.as_str().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::worker::ClientKind;
    use crate::worker::testing::Harness;
    use serde_json::json;

    fn notification(data: Value) -> Notification {
        Notification {
            title: "GGenius".into(),
            body: "b".into(),
            icon: "i".into(),
            badge: "b".into(),
            tag: "ggenius-notification".into(),
            data,
            actions: vec![],
            require_interaction: false,
            silent: false,
        }
    }

    #[tokio::test]
    async fn test_push_shows_notification_and_rebroadcasts() {
        let h = Harness::new(AppConfig::default());
        h.host.connect("tab-1", "https://ggenius.example/");

        let shown = h.worker.handle_push(Some(br#"{"title":"Hi","message":"Test"}"#.as_slice())).await.unwrap();

        assert_eq!(shown.title, "Hi");
        assert_eq!(shown.body, "Test");
        assert_eq!(shown.tag, "ggenius-notification");
        assert_eq!(shown.icon, "/static/images/icons/icon-192x192.png");
        assert_eq!(h.host.shown(), vec![shown]);
        assert_eq!(
            h.host.messages_for("tab-1"),
            vec![BroadcastMessage::PushReceived(json!({"title": "Hi", "message": "Test"}))]
        );
    }

    #[tokio::test]
    async fn test_push_defaults_every_field() {
        let h = Harness::new(AppConfig::default());
        let shown = h.worker.handle_push(Some(b"{}".as_slice())).await.unwrap();

        assert_eq!(shown.title, "GGenius");
        assert_eq!(shown.body, "GGenius notification");
        assert_eq!(shown.badge, "/static/images/icons/badge-72x72.png");
        assert_eq!(shown.data, json!({}));
        assert!(shown.actions.is_empty());
        assert!(!shown.require_interaction);
        assert!(!shown.silent);
    }

    #[tokio::test]
    async fn test_push_maps_flags_and_actions() {
        let h = Harness::new(AppConfig::default());
        let payload = json!({
            "tag": "match",
            "persistent": true,
            "silent": true,
            "actions": [{"action": "open", "title": "Open", "url": "/match/1"}],
            "data": {"url": "/matches"}
        });
        let shown = h.worker.handle_push(Some(payload.to_string().as_bytes())).await.unwrap();

        assert_eq!(shown.tag, "match");
        assert!(shown.require_interaction);
        assert!(shown.silent);
        assert_eq!(shown.actions[0].url.as_deref(), Some("/match/1"));

        let wire = serde_json::to_value(&shown).unwrap();
        assert_eq!(wire["requireInteraction"], true);
    }

    #[tokio::test]
    async fn test_push_without_or_with_bad_payload_is_noop() {
        let h = Harness::new(AppConfig::default());
        h.host.connect("tab-1", "https://ggenius.example/");

        assert!(h.worker.handle_push(None).await.is_none());
        assert!(h.worker.handle_push(Some(b"not json".as_slice())).await.is_none());
        assert!(h.worker.handle_push(Some(b"[1, 2]".as_slice())).await.is_none());

        assert!(h.host.shown().is_empty());
        assert!(h.host.messages_for("tab-1").is_empty());
    }

    #[tokio::test]
    async fn test_click_opens_data_url() {
        let h = Harness::new(AppConfig::default());
        h.host.connect("tab-1", "https://ggenius.example/cards");

        let outcome = h
            .worker
            .handle_notification_click(&notification(json!({"url": "/guides"})), None)
            .await
            .unwrap();

        assert_eq!(outcome, ClickOutcome::Opened { url: "/guides".into() });
        assert_eq!(h.host.opened(), vec!["/guides"]);
        assert_eq!(h.host.closed(), vec!["ggenius-notification"]);
    }

    #[tokio::test]
    async fn test_click_focuses_window_already_on_target() {
        let h = Harness::new(AppConfig::default());
        h.host.connect("tab-1", "https://ggenius.example/cards");
        h.host.connect("tab-2", "https://ggenius.example/guides?page=2");

        let outcome = h
            .worker
            .handle_notification_click(&notification(json!({"url": "/guides"})), None)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ClickOutcome::Focused { client_id: "tab-2".into(), url: "https://ggenius.example/guides?page=2".into() }
        );
        assert_eq!(h.host.focused(), vec!["tab-2"]);
        assert!(h.host.opened().is_empty());
    }

    #[tokio::test]
    async fn test_click_action_url_wins() {
        let h = Harness::new(AppConfig::default());
        let data = json!({
            "url": "/guides",
            "actions": [{"action": "reply", "url": "/inbox"}]
        });

        let outcome = h
            .worker
            .handle_notification_click(&notification(data.clone()), Some("reply"))
            .await
            .unwrap();
        assert_eq!(outcome, ClickOutcome::Opened { url: "/inbox".into() });

        let outcome = h
            .worker
            .handle_notification_click(&notification(data), Some("dismiss"))
            .await
            .unwrap();
        assert_eq!(outcome, ClickOutcome::Opened { url: "/guides".into() });
    }

    #[tokio::test]
    async fn test_click_without_target_focuses_or_opens_root() {
        let h = Harness::new(AppConfig::default());
        let outcome = h.worker.handle_notification_click(&notification(json!({})), None).await.unwrap();
        assert_eq!(outcome, ClickOutcome::Opened { url: "/".into() });

        h.host.connect_as("worker-1", "https://ggenius.example/", ClientKind::Worker);
        h.host.connect("tab-1", "https://ggenius.example/cards");
        let outcome = h.worker.handle_notification_click(&notification(json!({})), None).await.unwrap();
        assert_eq!(
            outcome,
            ClickOutcome::Focused { client_id: "tab-1".into(), url: "https://ggenius.example/cards".into() }
        );
    }
}
