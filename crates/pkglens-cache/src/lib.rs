//! Cache-aside access layer for pkglens
//!
//! This crate answers "serve from cache, else fetch and populate" for every
//! resource kind, collapsing concurrent identical lookups into one origin call
//! and degrading to the origin whenever the backing store is unavailable.

pub mod backend;
pub mod codec;
pub mod dedup;
pub mod service;
pub mod stats;
pub mod store;

// Re-export main types
pub use backend::{CacheBackend, MemoryBackend, RedisBackend};
pub use dedup::{Deduplicator, Role};
pub use service::CacheService;
pub use stats::CacheStats;
pub use store::CacheStore;
