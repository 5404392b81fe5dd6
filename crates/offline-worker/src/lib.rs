//! The offline engine as a single service worker.
//!
//! This crate wires the other engine crates together:
//! - `ServiceWorker` - Install, activate, intercept fetches, relay messages
//! - `WorkerEvent` / `EventResult` - Event dispatch into the worker
//! - `ClientRegistry` / `ClientHandle` - Pub/sub channel to open views
//! - `WorkerError` - Errors surfaced by lifecycle and dispatch

mod error;
mod event;
mod lifecycle;
mod messaging;
mod worker;

pub use error::*;
pub use event::*;
pub use lifecycle::*;
pub use messaging::*;
pub use worker::*;

// Re-export for convenience
pub use offline_cache::{CacheStatus, CacheStorage, InMemoryStorage};
pub use offline_core::{EngineConfig, Generation, Request, RequestUrl, Response, WorkerState};
pub use offline_executor::Outcome;
pub use offline_fetch::{FetchError, Fetcher, ScriptedNetwork};
pub use offline_observability::{EngineMetrics, MetricsSnapshot};
