//! Transport timeouts.

use std::time::Duration;

use async_trait::async_trait;
use offline_core::{Request, Response};

use crate::client::{FetchError, Fetcher};

/// Timeout configuration for one network attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Total time allowed for the attempt.
    pub total: Duration,
}

impl TimeoutConfig {
    /// Create from a total timeout.
    pub fn from_total(total: Duration) -> Self {
        Self { total }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            total: Duration::from_secs(10),
        }
    }
}

/// Wraps a fetcher so a stalled attempt fails with `FetchError::Timeout`.
pub struct TimeoutFetcher<F> {
    inner: F,
    config: TimeoutConfig,
}

impl<F: Fetcher> TimeoutFetcher<F> {
    /// Wrap a fetcher.
    pub fn new(inner: F, config: TimeoutConfig) -> Self {
        Self { inner, config }
    }

    /// The active timeout.
    pub fn config(&self) -> TimeoutConfig {
        self.config
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for TimeoutFetcher<F> {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        tokio::time::timeout(self.config.total, self.inner.fetch(request))
            .await
            .map_err(|_| FetchError::Timeout(self.config.total))?
    }
}
