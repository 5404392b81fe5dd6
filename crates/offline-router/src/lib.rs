//! Ordered request routing rules for the offline engine.
//!
//! Every intercepted request is matched against a fixed, ordered rule
//! table; the first matching rule picks the handling strategy.
//!
//! # Example
//!
//! ```ignore
//! use offline_core::{EngineConfig, Request, RequestUrl};
//! use offline_router::{RouteTable, StrategyTag};
//!
//! let table = RouteTable::from_config(&EngineConfig::default())?;
//! let request = Request::get(RequestUrl::parse("https://fittrack.app/icons/icon-192x192.png")?);
//! assert_eq!(table.route(&request).strategy, StrategyTag::CacheFirst);
//! ```

mod hosts;
mod rules;

pub use hosts::*;
pub use rules::*;
