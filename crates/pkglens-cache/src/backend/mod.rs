//! Backing key-value stores.
//!
//! A backend moves opaque bytes and reports every transport failure as
//! `Error::CacheUnavailable`. Turning those failures into cache misses is the
//! job of [`CacheStore`](crate::store::CacheStore), not of the backend.

use async_trait::async_trait;
use pkglens_core::Result;

mod memory;
mod redis;

pub use self::memory::{MemoryBackend, MemoryStats};
pub use self::redis::RedisBackend;

/// A network or in-process key-value store with native TTL expiry
#[async_trait]
pub trait CacheBackend: Send + Sync + std::fmt::Debug {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    /// Read the bytes stored under `key`, `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write `value` under `key` expiring after `ttl_secs`, in one operation
    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<()>;

    /// Remove `key` if present
    async fn delete(&self, key: &str) -> Result<()>;
}
