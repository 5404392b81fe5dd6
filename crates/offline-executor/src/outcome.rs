//! Strategy results.

use offline_cache::CacheStatus;
use offline_core::Response;

/// A response together with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Response handed back to the caller.
    pub response: Response,
    /// Where the response came from.
    pub status: CacheStatus,
}

impl Outcome {
    /// Served from the store.
    pub fn hit(response: Response) -> Self {
        Self { response, status: CacheStatus::Hit }
    }

    /// Store missed; served from the network.
    pub fn miss(response: Response) -> Self {
        Self { response, status: CacheStatus::Miss }
    }

    /// Served from the network by a network-first strategy.
    pub fn network(response: Response) -> Self {
        Self { response, status: CacheStatus::Network }
    }

    /// Network failed; served from the store.
    pub fn fallback(response: Response) -> Self {
        Self { response, status: CacheStatus::Fallback }
    }

    /// Passed through untouched.
    pub fn bypass(response: Response) -> Self {
        Self { response, status: CacheStatus::Bypass }
    }

    /// Whether the body came out of the store.
    pub fn from_cache(&self) -> bool {
        self.status.from_cache()
    }

    /// Discard the source.
    pub fn into_response(self) -> Response {
        self.response
    }
}
