//! Network access for the offline engine.
//!
//! This crate provides:
//! - `Fetcher` - The network collaborator every strategy talks to
//! - `FetchError` - Network failures, the only trigger for fallback logic
//! - `TimeoutFetcher` / `TimeoutConfig` - Transport timeouts surfaced as failures
//! - `ScriptedNetwork` - Deterministic network for tests and simulation

mod client;
mod scripted;
mod timeout;

pub use client::*;
pub use scripted::*;
pub use timeout::*;
