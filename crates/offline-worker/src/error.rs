//! Worker error types.

use offline_cache::CacheError;
use offline_core::{ConfigError, WorkerState};
use offline_fetch::FetchError;
use offline_router::RouteError;
use thiserror::Error;

use crate::messaging::MessageError;

/// Errors surfaced by the worker lifecycle and event dispatch.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Configuration did not validate.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Route table could not be built.
    #[error("Invalid routing: {0}")]
    Route(#[from] RouteError),

    /// Cache storage failed during install or activation.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// A seed URL could not be fetched.
    #[error("Seed fetch failed for {url}: {source}")]
    SeedFetch {
        url: String,
        #[source]
        source: FetchError,
    },

    /// A seed URL answered with a non-ok status.
    #[error("Seed fetch for {url} returned status {status}")]
    SeedStatus { url: String, status: u16 },

    /// Lifecycle step attempted from the wrong state.
    #[error("Cannot move worker from {from} to {to}")]
    InvalidTransition { from: WorkerState, to: WorkerState },

    /// Intercepted fetch failed with no fallback.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Client message could not be decoded or delivered.
    #[error("Message error: {0}")]
    Message(#[from] MessageError),
}

impl WorkerError {
    /// Whether this error failed an install and left the worker redundant.
    pub fn is_seed_failure(&self) -> bool {
        matches!(self, Self::SeedFetch { .. } | Self::SeedStatus { .. })
    }
}
