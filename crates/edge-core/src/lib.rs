//! Core types for the edge request-interception engine.
//!
//! This crate provides the fundamental types shared by every layer:
//! - `EngineConfig` - Deployment version, origin, manifest and allow-lists
//! - `Request` / `Response` - The intercepted request and its answer
//! - `ResponseSource` - Provenance of an intercepted response
//! - `RequestId` - Unique request identifier for tracing
//! - `WorkerState` - Install/activate lifecycle states

mod config;
mod context;
mod lifecycle;
mod response;

pub use config::*;
pub use context::*;
pub use lifecycle::*;
pub use response::*;
