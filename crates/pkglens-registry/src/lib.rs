//! Upstream metadata clients for pkglens
//!
//! This crate talks to the npm registry, the npm download counts API,
//! bundlephobia, npms.io, the OSV vulnerability database and GitHub, and
//! exposes every lookup through the cache-aside [`PackageLens`] facade.

pub mod api;
pub mod client;
pub mod lens;
pub mod warm;

// Re-export main types
pub use client::{OriginClient, OriginConfig};
pub use lens::PackageLens;
pub use warm::{warm, WarmOptions, WarmReport};
