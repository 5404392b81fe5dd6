//! Core types for the offline cache and request-routing engine.
//!
//! This crate provides the fundamental types shared by every engine crate:
//! - `Request` / `RequestIdentity` - Intercepted requests and their cache key
//! - `Response` / `ResponseKind` - Response snapshots and origin classification
//! - `Generation` - Versioned cache store identifiers
//! - `EngineConfig` - Routing, seeding and fetch configuration
//! - `WorkerState` - Install/activate lifecycle

mod config;
mod context;
mod generation;
mod lifecycle;
mod request;
mod response;
mod url;

pub use config::*;
pub use context::*;
pub use generation::*;
pub use lifecycle::*;
pub use request::*;
pub use response::*;
pub use self::url::*;

pub use http::Method;
