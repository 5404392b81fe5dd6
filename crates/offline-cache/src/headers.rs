//! Cache debugging headers.

use std::fmt;

use offline_core::{Generation, Request, Response};
use serde::{Deserialize, Serialize};

/// Header names for cache debugging.
pub mod header_names {
    /// Where the response came from (HIT, MISS, NETWORK, FALLBACK, BYPASS).
    pub const X_CACHE_STATUS: &str = "X-Cache-Status";
    /// Generation that served or stored the response.
    pub const X_CACHE_GENERATION: &str = "X-Cache-Generation";
    /// Route rule that selected the strategy.
    pub const X_CACHE_RULE: &str = "X-Cache-Rule";
    /// Request header that opts a single request into debug headers.
    pub const X_DEBUG_CACHE: &str = "X-Debug-Cache";
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from the store.
    Hit,
    /// Store missed; served from the network.
    Miss,
    /// Network-first strategy served a network response.
    Network,
    /// Network failed; served a cached copy or the offline document.
    Fallback,
    /// Not intercepted; the store was not consulted.
    Bypass,
}

impl CacheStatus {
    /// Whether the response body came out of the store.
    pub fn from_cache(&self) -> bool {
        matches!(self, Self::Hit | Self::Fallback)
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Miss => write!(f, "MISS"),
            Self::Network => write!(f, "NETWORK"),
            Self::Fallback => write!(f, "FALLBACK"),
            Self::Bypass => write!(f, "BYPASS"),
        }
    }
}

/// Cache explain headers for debugging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheExplainHeaders {
    /// Where the response came from.
    pub status: Option<CacheStatus>,
    /// Generation in effect.
    pub generation: Option<String>,
    /// Matched route rule.
    pub rule: Option<String>,
}

impl CacheExplainHeaders {
    /// Create empty explain headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set cache status.
    pub fn with_status(mut self, status: CacheStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set generation.
    pub fn with_generation(mut self, generation: &Generation) -> Self {
        self.generation = Some(generation.to_string());
        self
    }

    /// Set route rule.
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Convert to HTTP headers.
    pub fn to_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();

        if let Some(status) = &self.status {
            headers.push((header_names::X_CACHE_STATUS.to_string(), status.to_string()));
        }

        if let Some(generation) = &self.generation {
            headers.push((header_names::X_CACHE_GENERATION.to_string(), generation.clone()));
        }

        if let Some(rule) = &self.rule {
            headers.push((header_names::X_CACHE_RULE.to_string(), rule.clone()));
        }

        headers
    }

    /// Attach the headers to a response.
    pub fn apply(&self, response: Response) -> Response {
        self.to_headers()
            .into_iter()
            .fold(response, |response, (name, value)| response.with_header(name, value))
    }

    /// Convert to JSON for debugging output.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Whether the request opted into debug headers with `X-Debug-Cache: 1`.
pub fn should_include_debug_headers(request: &Request) -> bool {
    request.header(header_names::X_DEBUG_CACHE) == Some("1")
}
