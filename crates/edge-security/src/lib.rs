//! Host allow-lists for the edge request-interception engine.
//!
//! This crate provides:
//! - `TrustedHosts` - Exact and wildcard host matching for external media hosts
//!
//! # Example
//!
//! ```ignore
//! use edge_security::TrustedHosts;
//!
//! let trusted = TrustedHosts::new()
//!     .allow_host("images.unsplash.com")
//!     .allow_pattern("*.cloudinary.com");
//!
//! assert!(trusted.is_trusted_host("res.cloudinary.com"));
//! ```

mod allowlist;

pub use allowlist::*;
