//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Prefix of the cache store name. The full name is `{prefix}-v{version}`.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version string of the running worker code.
    ///
    /// Changing it makes the next activation purge every older store.
    #[serde(default = "default_version")]
    pub version: String,

    /// Origin the worker is registered under; relative paths resolve against it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path to SQLite cache database.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Byte ceiling for the current store before eviction kicks in.
    #[serde(default = "default_max_cache_bytes")]
    pub max_cache_bytes: u64,

    /// Age after which a cache-first entry is considered expired, in seconds.
    #[serde(default = "default_cache_expiry_secs")]
    pub cache_expiry_secs: u64,

    /// Fraction of the ceiling eviction shrinks the store down to.
    #[serde(default = "default_eviction_target_ratio")]
    pub eviction_target_ratio: f64,

    /// Count the body length of entries that carry no content-length header.
    ///
    /// Off by default: such entries weigh zero bytes in size accounting.
    #[serde(default)]
    pub count_undeclared_bytes: bool,

    /// Deadline for the network-first primary fetch, in milliseconds.
    #[serde(default = "default_network_timeout_ms")]
    pub network_timeout_ms: u64,

    /// Interval of the recurring eviction pass, in seconds.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Resources pre-cached at install.
    #[serde(default = "default_critical_resources")]
    pub critical_resources: Vec<String>,

    /// Path regexes routed network-first.
    #[serde(default = "default_api_patterns")]
    pub api_patterns: Vec<String>,

    /// Path regexes routed cache-first as static assets.
    #[serde(default = "default_asset_patterns")]
    pub asset_patterns: Vec<String>,

    /// Path regexes routed cache-first as images.
    #[serde(default = "default_image_patterns")]
    pub image_patterns: Vec<String>,

    /// Cached page served to navigations when everything else fails.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Transport timeout for every HTTP request in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Defaults applied to push notifications that omit a field.
    #[serde(default)]
    pub notification: NotificationDefaults,
}

/// Fallback values for push notification fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationDefaults {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            title: "GGenius".into(),
            body: "GGenius notification".into(),
            icon: "/static/images/icons/icon-192x192.png".into(),
            badge: "/static/images/icons/badge-72x72.png".into(),
            tag: "ggenius-notification".into(),
        }
    }
}

fn default_cache_prefix() -> String {
    "ggenius".into()
}

fn default_version() -> String {
    "3.0.0".into()
}

fn default_base_url() -> String {
    "http://localhost:8000/".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_max_cache_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_cache_expiry_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_eviction_target_ratio() -> f64 {
    0.8
}

fn default_network_timeout_ms() -> u64 {
    5_000
}

fn default_cleanup_interval_secs() -> u64 {
    60 * 60
}

fn default_critical_resources() -> Vec<String> {
    [
        "/",
        "/static/css/style.css",
        "/static/css/mobile-navigation.css",
        "/static/css/notifications.css",
        "/static/js/enhancements.js",
        "/static/js/ai-cards-hub.js",
        "/static/js/workers/ai-processor.js",
        "/static/js/workers/image-processor.js",
        "/static/js/workers/data-analyzer.js",
        "/manifest.json",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_api_patterns() -> Vec<String> {
    vec![r"/api/".into(), r"/ws/".into()]
}

fn default_asset_patterns() -> Vec<String> {
    vec![r"\.(?:css|js|png|jpg|jpeg|gif|webp|avif|svg|woff|woff2|ttf|eot)$".into(), r"/static/".into()]
}

fn default_image_patterns() -> Vec<String> {
    vec![r"/images/".into()]
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_prefix: default_cache_prefix(),
            version: default_version(),
            base_url: default_base_url(),
            db_path: default_db_path(),
            max_cache_bytes: default_max_cache_bytes(),
            cache_expiry_secs: default_cache_expiry_secs(),
            eviction_target_ratio: default_eviction_target_ratio(),
            count_undeclared_bytes: false,
            network_timeout_ms: default_network_timeout_ms(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            critical_resources: default_critical_resources(),
            api_patterns: default_api_patterns(),
            asset_patterns: default_asset_patterns(),
            image_patterns: default_image_patterns(),
            offline_page: default_offline_page(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            notification: NotificationDefaults::default(),
        }
    }
}

impl AppConfig {
    /// Name of the cache store owned by this version.
    pub fn cache_name(&self) -> String {
        format!("{}-v{}", self.cache_prefix, self.version)
    }

    /// Transport timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }

    pub fn cache_expiry(&self) -> Duration {
        Duration::from_secs(self.cache_expiry_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
