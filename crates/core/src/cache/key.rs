//! Request normalization and cache key generation.

use sha2::{Digest, Sha256};
use url::Url;

/// Normalize a request URL so equivalent requests share one cache slot.
///
/// Normalization steps:
/// 1. Lowercase the host
/// 2. Remove fragment (#...)
/// 3. Keep query string intact (do not reorder)
pub fn normalize_url(url: &Url) -> Url {
    let mut normalized = url.clone();

    if let Some(host) = url.host_str() {
        let lower = host.to_lowercase();
        if lower != host && normalized.set_host(Some(&lower)).is_err() {
            tracing::debug!(url = %url, "could not lowercase host");
        }
    }

    normalized.set_fragment(None);
    normalized
}

/// Compute the storage key for a request.
///
/// The key is the SHA-256 of the uppercased method and the normalized URL, so
/// two requests differing only by fragment or host case map to the same entry.
pub fn compute_request_key(method: &str, url: &Url) -> String {
    let normalized = normalize_url(url);
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(normalized.as_str().as_bytes());
    hex::encode(hasher.finalize())
}
