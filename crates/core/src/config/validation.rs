//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_prefix` or `version` is empty
    /// - `base_url` is not an absolute http(s) URL
    /// - `max_cache_bytes` or `max_bytes` is 0
    /// - `eviction_target_ratio` is outside (0, 1]
    /// - `network_timeout_ms` or `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `cleanup_interval_secs` is 0
    /// - any route pattern fails to compile
    ///
    /// Returns `ConfigError::Missing` if `user_agent` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_prefix.is_empty() {
            return Err(ConfigError::Invalid { field: "cache_prefix".into(), reason: "must not be empty".into() });
        }
        if self.version.is_empty() {
            return Err(ConfigError::Invalid { field: "version".into(), reason: "must not be empty".into() });
        }

        match url::Url::parse(&self.base_url) {
            Ok(base) if matches!(base.scheme(), "http" | "https") => {}
            Ok(base) => {
                return Err(ConfigError::Invalid {
                    field: "base_url".into(),
                    reason: format!("unsupported scheme: {}", base.scheme()),
                });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "base_url".into(), reason: e.to_string() }),
        }

        if self.max_cache_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_cache_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }

        if !(self.eviction_target_ratio > 0.0 && self.eviction_target_ratio <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "eviction_target_ratio".into(),
                reason: "must be within (0, 1]".into(),
            });
        }

        for (field, value) in [("network_timeout_ms", self.network_timeout_ms), ("timeout_ms", self.timeout_ms)] {
            if value < 100 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be at least 100ms".into() });
            }
            if value > 300_000 {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        if self.cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "cleanup_interval_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        for (field, patterns) in [
            ("api_patterns", &self.api_patterns),
            ("asset_patterns", &self.asset_patterns),
            ("image_patterns", &self.image_patterns),
        ] {
            if let Err(e) = regex::RegexSet::new(patterns) {
                return Err(ConfigError::Invalid { field: field.into(), reason: e.to_string() });
            }
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Missing {
                field: "user_agent".into(),
                hint: "Set SWCACHE_USER_AGENT environment variable".into(),
            });
        }

        if self.critical_resources.is_empty() {
            tracing::warn!("critical_resources is empty; install will cache nothing for offline use");
        }

        Ok(())
    }
}
