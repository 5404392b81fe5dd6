//! Generation-scoped response cache for the offline engine.
//!
//! This crate provides:
//! - `CacheStorage` / `CacheStore` - Named generations of identity → response stores
//! - `InMemoryStorage` - Process-local storage backend
//! - `WritePolicy` - Which responses a given caller may store
//! - `CacheExplainHeaders` - Debug headers describing where a response came from
//!
//! # Example
//!
//! ```ignore
//! use offline_cache::{CacheStorage, InMemoryStorage};
//! use offline_core::{Generation, Request, RequestUrl, Response};
//!
//! let storage = InMemoryStorage::new();
//! let store = storage.open(&Generation::from("fitness-cache-v3")).await?;
//!
//! let request = Request::get(RequestUrl::parse("https://fittrack.app/manifest.json")?);
//! store.put(&request.identity(), &Response::ok("{}")).await?;
//! assert!(store.get(&request.identity()).await?.is_some());
//! ```

mod headers;
mod memory;
mod policy;
mod storage;

pub use headers::*;
pub use memory::*;
pub use policy::*;
pub use storage::*;
