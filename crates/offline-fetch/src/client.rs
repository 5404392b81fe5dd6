//! The network collaborator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use offline_core::{Request, Response};

/// Error type for fetch operations.
///
/// An HTTP error status is not a fetch error: the fetch resolved and the
/// response is handed back as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    Offline(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("request error: {0}")]
    Request(String),
}

/// Performs a single network attempt for a request.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a request. Resolves with any HTTP status; fails only when no
    /// response could be obtained.
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        (**self).fetch(request).await
    }
}
