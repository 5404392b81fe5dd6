//! Cache strategy execution.
//!
//! This crate turns a routing decision into a response:
//! - `StrategyExecutor` - Runs bypass, canonical-copy, cache-first,
//!   network-first and cache-then-network against a store and a fetcher
//! - `Outcome` - A response plus where it came from
//! - `FallbackStrategy` - What a strategy does when the network fails

mod executor;
mod fallback;
mod outcome;

pub use executor::*;
pub use fallback::*;
pub use outcome::*;
