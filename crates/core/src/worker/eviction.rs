//! Size-bounded eviction and cache status.
//!
//! Eviction sums each entry's accounted size, and once the total exceeds the
//! ceiling it removes whole entries oldest-first until the remainder drops to
//! the target ratio of the ceiling (80% by default). Stopping below the
//! ceiling keeps the next pass from firing again straight away.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::CacheOrchestrator;
use crate::Error;
use crate::cache::EntryMeta;

const MIB: f64 = 1024.0 * 1024.0;

/// An entry chosen for removal, with the bytes it accounts for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Victim {
    pub key: String,
    pub bytes: u64,
}

/// Entries chosen for removal by [`plan_eviction`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionPlan {
    pub total_bytes: u64,
    /// Oldest first.
    pub victims: Vec<Victim>,
    pub removed_bytes: u64,
}

impl EvictionPlan {
    pub fn keys(&self) -> Vec<&str> {
        self.victims.iter().map(|v| v.key.as_str()).collect()
    }
}

/// Decide which entries to evict.
///
/// Entries are ordered by capture time, ties broken by key so the plan is
/// deterministic. No entry is chosen while the total is within `max_bytes`.
pub fn plan_eviction(entries: &[EntryMeta], max_bytes: u64, target_ratio: f64, count_undeclared: bool) -> EvictionPlan {
    let total_bytes: u64 = entries.iter().map(|e| e.accounted_size(count_undeclared)).sum();
    if total_bytes <= max_bytes {
        return EvictionPlan { total_bytes, ..Default::default() };
    }

    let target = (max_bytes as f64 * target_ratio).floor() as u64;
    let mut ordered: Vec<&EntryMeta> = entries.iter().collect();
    ordered.sort_by(|a, b| a.cached_at.cmp(&b.cached_at).then_with(|| a.key.cmp(&b.key)));

    let mut plan = EvictionPlan { total_bytes, ..Default::default() };
    for entry in ordered {
        if total_bytes - plan.removed_bytes <= target {
            break;
        }
        let bytes = entry.accounted_size(count_undeclared);
        plan.removed_bytes += bytes;
        plan.victims.push(Victim { key: entry.key.clone(), bytes });
    }
    plan
}

/// Result of one eviction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EvictionReport {
    pub total_bytes: u64,
    pub removed_entries: usize,
    pub removed_bytes: u64,
}

impl EvictionReport {
    pub fn remaining_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.removed_bytes)
    }
}

/// Point-in-time view of the current store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatusSnapshot {
    pub version: String,
    pub entries: usize,
    pub size: u64,
    pub expired: usize,
    pub max_size: u64,
    pub utilization_percent: f64,
}

impl CacheOrchestrator {
    /// Run one eviction pass over the current store.
    ///
    /// Never fails: listing errors abort the pass, removal errors skip the entry.
    pub async fn cleanup(&self) -> EvictionReport {
        let entries = match self.storage.list(&self.cache_name).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(cache = %self.cache_name, error = %e, "cache cleanup failed");
                return EvictionReport::default();
            }
        };

        let plan = plan_eviction(
            &entries,
            self.config.max_cache_bytes,
            self.config.eviction_target_ratio,
            self.config.count_undeclared_bytes,
        );
        tracing::info!(
            cache = %self.cache_name,
            entries = entries.len(),
            size_mb = format!("{:.2}", plan.total_bytes as f64 / MIB),
            "cache size"
        );

        if plan.victims.is_empty() {
            return EvictionReport { total_bytes: plan.total_bytes, ..Default::default() };
        }

        let mut report = EvictionReport { total_bytes: plan.total_bytes, ..Default::default() };
        for victim in &plan.victims {
            match self.storage.remove(&self.cache_name, &victim.key).await {
                Ok(true) => {
                    report.removed_entries += 1;
                    report.removed_bytes += victim.bytes;
                }
                Ok(false) => tracing::debug!(key = %victim.key, "entry already gone"),
                Err(e) => tracing::warn!(key = %victim.key, error = %e, "failed to evict cache entry"),
            }
        }

        tracing::info!(
            removed = report.removed_entries,
            removed_mb = format!("{:.2}", report.removed_bytes as f64 / MIB),
            "evicted cache entries"
        );
        report
    }

    /// Aggregate entry count, size and expiry over the current store.
    pub async fn cache_status(&self) -> Result<CacheStatusSnapshot, Error> {
        let entries = self.storage.list(&self.cache_name).await?;
        let now = Utc::now();
        let expiry = self.config.cache_expiry();
        let count_undeclared = self.config.count_undeclared_bytes;

        let size: u64 = entries.iter().map(|e| e.accounted_size(count_undeclared)).sum();
        let expired = entries.iter().filter(|e| e.is_expired(expiry, now)).count();
        let max_size = self.config.max_cache_bytes;

        Ok(CacheStatusSnapshot {
            version: self.config.version.clone(),
            entries: entries.len(),
            size,
            expired,
            max_size,
            utilization_percent: size as f64 / max_size as f64 * 100.0,
        })
    }
}
