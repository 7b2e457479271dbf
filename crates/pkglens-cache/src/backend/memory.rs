//! In-process backend with TTL expiry, used when no Redis URL is configured.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use pkglens_core::Result;

use super::CacheBackend;

/// Stored bytes with their expiry window
#[derive(Debug, Clone)]
struct MemoryEntry {
    data: Vec<u8>,
    stored_at: Instant,
    ttl: Duration,
}

impl MemoryEntry {
    fn is_fresh(&self) -> bool {
        self.stored_at.elapsed() < self.ttl
    }
}

/// Process-local key-value store
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, MemoryEntry>,
}

/// Entry counts of a [`MemoryBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub total_entries: usize,
    pub fresh_entries: usize,
    pub expired_entries: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` with an arbitrary TTL
    pub fn insert_with_ttl(&self, key: impl Into<String>, data: Vec<u8>, ttl: Duration) {
        let entry = MemoryEntry {
            data,
            stored_at: Instant::now(),
            ttl,
        };
        self.entries.insert(key.into(), entry);
    }

    /// Drop expired entries, returning how many were removed
    pub fn cleanup(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            if entry.is_fresh() {
                true
            } else {
                removed += 1;
                false
            }
        });
        removed
    }

    pub fn stats(&self) -> MemoryStats {
        let fresh_entries = self.entries.iter().filter(|e| e.is_fresh()).count();
        let total_entries = self.entries.len();

        MemoryStats {
            total_entries,
            fresh_entries,
            expired_entries: total_entries - fresh_entries,
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.entries.get(key) {
            Some(entry) if entry.is_fresh() => return Ok(Some(entry.data.clone())),
            Some(_) => {},
            None => return Ok(None),
        }

        // Expire lazily, unless the key was rewritten meanwhile
        self.entries.remove_if(key, |_, entry| !entry.is_fresh());
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<()> {
        self.insert_with_ttl(key, value, Duration::from_secs(ttl_secs));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
