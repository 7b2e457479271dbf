//! # pkglens-core
//!
//! Core types shared across all pkglens crates.
//!
//! This crate provides:
//! - `Error`, the unified error type, and the `Result` alias
//! - `ResourceKind`, `CacheKey` and `TtlPolicy`, the leaves of the caching layer
//! - `Resource` markers pairing each kind with its typed value
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `error`: Error types and result aliases
//! - `types`: Keys, kinds, TTLs and the cached value types
//! - `resource`: Typed resource markers

pub mod error;
pub mod resource;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use resource::Resource;
pub use types::{CacheKey, ResourceKind, TtlPolicy};
