//! Fallback strategies for network failures.

use offline_core::Request;
use offline_router::StrategyTag;

/// What to do when a strategy's network attempt fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackStrategy {
    /// Hand the failure to the caller.
    Propagate,

    /// Serve the stored copy of the same request, if any.
    CachedCopy,

    /// Serve the stored root document, if any.
    RootDocument,
}

impl FallbackStrategy {
    /// Fallback used by a strategy for a given request.
    ///
    /// Only network-first falls back to its own cached copy. The default
    /// strategy serves the root document to requests that accept HTML.
    pub fn for_request(strategy: StrategyTag, request: &Request) -> Self {
        match strategy {
            StrategyTag::NetworkFirst => Self::CachedCopy,
            StrategyTag::CacheThenNetwork if request.accepts_html() => Self::RootDocument,
            StrategyTag::CacheThenNetwork
            | StrategyTag::Bypass
            | StrategyTag::CanonicalCopy
            | StrategyTag::CacheFirst => Self::Propagate,
        }
    }
}

impl Default for FallbackStrategy {
    fn default() -> Self {
        Self::Propagate
    }
}
