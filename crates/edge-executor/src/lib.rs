//! Resource classification and caching strategies.
//!
//! This crate decides, per intercepted request, where the answer comes from:
//! - `Classifier` - Maps a request to a `Classification`
//! - `Strategy` - The fixed algorithm for each classification
//! - `StrategyExecutor` - Runs the strategy against the cache and the network
//! - `Resolution` - The response, its source and any pending cache write

mod classify;
mod executor;
mod strategy;

pub use classify::*;
pub use executor::*;
pub use strategy::*;
