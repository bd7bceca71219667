//! Observability infrastructure for the edge request-interception engine.
//!
//! This crate provides:
//! - `init_tracing` - `tracing` subscriber setup (JSON or human output)
//! - `InterceptMetrics` - Counters for response sources and cache writes

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;
