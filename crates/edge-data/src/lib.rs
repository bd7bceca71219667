//! Network access for the edge request-interception engine.
//!
//! This crate provides:
//! - `Network` - The fetch capability strategies call through to
//! - `FetchError` - Transport-level failures (offline, DNS, timeout)
//! - `HttpNetwork` - `reqwest`-backed implementation
//! - `StubNetwork` - Scripted in-process network for tests and demos

mod client;
mod stub;

pub use client::*;
pub use stub::*;
