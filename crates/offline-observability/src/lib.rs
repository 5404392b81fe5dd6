//! Observability for the offline engine.
//!
//! This crate provides:
//! - `StructuredLogger` - Request-scoped structured logs emitted as `tracing` events
//! - `EngineMetrics` - Counters for cache hits, network use and fallbacks

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;

// Re-export for convenience
pub use offline_core::{LogFormat, RequestId};
