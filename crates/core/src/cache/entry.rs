//! Cached response snapshots and their accounting metadata.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key::{compute_request_key, normalize_url};
use crate::http::{Request, Response};

/// A stored response snapshot.
///
/// Entries are never mutated in place: refreshing a resource writes a new
/// entry under the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub method: String,
    pub url: String,
    pub response: Response,
    /// Capture timestamp: the response `date` header, or the write time when absent.
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Snapshot a response for a request, stamping it now unless the response
    /// carries its own `date` header.
    pub fn new(request: &Request, response: Response) -> Self {
        let cached_at = response.date().unwrap_or_else(Utc::now);
        Self::captured_at(request, response, cached_at)
    }

    pub fn captured_at(request: &Request, response: Response, cached_at: DateTime<Utc>) -> Self {
        Self {
            key: compute_request_key(&request.method, &request.url),
            method: request.method.to_ascii_uppercase(),
            url: normalize_url(&request.url).to_string(),
            response,
            cached_at,
        }
    }

    pub fn declared_size(&self) -> Option<u64> {
        self.response.content_length()
    }

    pub fn is_expired(&self, expiry: Duration, now: DateTime<Utc>) -> bool {
        is_older_than(self.cached_at, expiry, now)
    }

    pub fn meta(&self) -> EntryMeta {
        EntryMeta {
            key: self.key.clone(),
            url: self.url.clone(),
            cached_at: self.cached_at,
            declared_size: self.declared_size(),
            body_len: self.response.body.len() as u64,
        }
    }
}

/// Per-entry metadata used for size accounting and status reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    pub key: String,
    pub url: String,
    pub cached_at: DateTime<Utc>,
    /// The entry's `content-length` header, if it had one.
    pub declared_size: Option<u64>,
    pub body_len: u64,
}

impl EntryMeta {
    /// Bytes this entry counts for against the ceiling.
    ///
    /// Entries without a declared size weigh zero unless `count_undeclared` is set,
    /// in which case their stored body length is used.
    pub fn accounted_size(&self, count_undeclared: bool) -> u64 {
        match self.declared_size {
            Some(size) => size,
            None if count_undeclared => self.body_len,
            None => 0,
        }
    }

    pub fn is_expired(&self, expiry: Duration, now: DateTime<Utc>) -> bool {
        is_older_than(self.cached_at, expiry, now)
    }
}

/// Entries stamped in the future are never expired.
fn is_older_than(cached_at: DateTime<Utc>, expiry: Duration, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(cached_at)
        .to_std()
        .map(|age| age > expiry)
        .unwrap_or(false)
}
