//! Worker lifecycle for the edge request-interception engine.
//!
//! This crate provides:
//! - `Worker` - One deployed version: install, activate, supersede
//! - `Registration` - Active/waiting slots, deployments and the fetch entry point
//! - `ClientHub` - Connected clients, claim and update broadcast
//! - `NotificationChannel` - Push display and click handling
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use edge_cache::MemoryCacheStorage;
//! use edge_data::HttpNetwork;
//! use edge_worker::Registration;
//!
//! let registration = Registration::new(
//!     Arc::new(MemoryCacheStorage::new()),
//!     Arc::new(HttpNetwork::new()),
//! );
//! registration.deploy(config).await?;
//! let handled = registration.handle_fetch(&request).await;
//! ```

mod clients;
mod notify;
mod registration;
mod worker;

pub use clients::*;
pub use notify::*;
pub use registration::*;
pub use worker::*;
