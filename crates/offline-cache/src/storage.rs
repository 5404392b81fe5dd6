//! Cache storage traits.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use offline_core::{Generation, RequestIdentity, Response};

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache operation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// Only `GET` requests can be stored.
    #[error("request method {0} cannot be cached")]
    MethodNotCacheable(String),

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("cache lock poisoned: {0}")]
    LockPoisoned(String),

    /// Backend storage error.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Handle to one generation's store.
pub type Store = Arc<dyn CacheStore>;

/// A single generation of identity → response entries.
///
/// Per-key operations are atomic; concurrent writes to the same key resolve
/// last-write-wins. Once the generation is deleted, reads through a
/// surviving handle return `None` and writes are dropped.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Generation this store belongs to.
    fn generation(&self) -> &Generation;

    /// Exact-identity lookup.
    async fn get(&self, identity: &RequestIdentity) -> CacheResult<Option<Response>>;

    /// Store a response, overwriting any entry for the identity.
    async fn put(&self, identity: &RequestIdentity, response: &Response) -> CacheResult<()>;

    /// Remove one entry. Returns whether it existed.
    async fn delete(&self, identity: &RequestIdentity) -> CacheResult<bool>;

    /// All identities currently stored, sorted.
    async fn keys(&self) -> CacheResult<Vec<RequestIdentity>>;

    /// Number of stored entries.
    async fn len(&self) -> CacheResult<usize> {
        Ok(self.keys().await?.len())
    }
}

/// Set of named generations.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Return the store for a generation, creating it if absent.
    async fn open(&self, generation: &Generation) -> CacheResult<Store>;

    /// Whether a generation exists.
    async fn has(&self, generation: &Generation) -> CacheResult<bool>;

    /// All existing generations.
    async fn list_generations(&self) -> CacheResult<BTreeSet<Generation>>;

    /// Delete a generation and all its entries. Returns whether it existed.
    async fn delete_generation(&self, generation: &Generation) -> CacheResult<bool>;
}
