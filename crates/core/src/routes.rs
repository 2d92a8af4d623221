//! Route classification.
//!
//! Maps a request path to one of four route classes by testing ordered
//! pattern groups: API first, then static assets, then images. Anything
//! unmatched is page content.

use regex::RegexSet;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::AppConfig;

/// Route class of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteClass {
    Api,
    Assets,
    Content,
    Images,
}

/// Caching policy applied to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    NetworkFirst,
    CacheFirst,
    StaleWhileRevalidate,
}

impl RouteClass {
    pub fn strategy(self) -> Strategy {
        match self {
            RouteClass::Api => Strategy::NetworkFirst,
            RouteClass::Assets | RouteClass::Images => Strategy::CacheFirst,
            RouteClass::Content => Strategy::StaleWhileRevalidate,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::NetworkFirst => write!(f, "networkFirst"),
            Strategy::CacheFirst => write!(f, "cacheFirst"),
            Strategy::StaleWhileRevalidate => write!(f, "staleWhileRevalidate"),
        }
    }
}

/// Compiled pattern groups.
#[derive(Debug, Clone)]
pub struct RouteTable {
    api: RegexSet,
    assets: RegexSet,
    images: RegexSet,
}

impl RouteTable {
    pub fn new<S: AsRef<str>>(api: &[S], assets: &[S], images: &[S]) -> Result<Self, regex::Error> {
        Ok(Self {
            api: RegexSet::new(api.iter().map(AsRef::as_ref))?,
            assets: RegexSet::new(assets.iter().map(AsRef::as_ref))?,
            images: RegexSet::new(images.iter().map(AsRef::as_ref))?,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, regex::Error> {
        Self::new(&config.api_patterns, &config.asset_patterns, &config.image_patterns)
    }

    /// Classify a URL by its path alone; host and query are ignored.
    pub fn classify(&self, url: &Url) -> RouteClass {
        let path = url.path();
        if self.api.is_match(path) {
            RouteClass::Api
        } else if self.assets.is_match(path) {
            RouteClass::Assets
        } else if self.images.is_match(path) {
            RouteClass::Images
        } else {
            RouteClass::Content
        }
    }
}
