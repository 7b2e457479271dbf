//! Cache store adapter.
//!
//! Typed get/set on top of a [`CacheBackend`]. Caching is an optimization,
//! never a correctness dependency: every failure here is logged and turned into
//! a miss (reads) or a no-op (writes), so nothing propagates to the caller.

use std::sync::Arc;

use pkglens_core::{CacheKey, Resource};
use tracing::{debug, warn};

use crate::backend::CacheBackend;
use crate::codec::{self, Entry};

/// Never-failing typed view of a backing store
#[derive(Debug, Clone)]
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Look up `key`, `None` on absence, store failure or undecodable bytes
    pub async fn get<R: Resource>(&self, key: &CacheKey) -> Option<Entry<R::Value>> {
        let bytes = match self.backend.get(key.as_str()).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read for {} failed, treating as miss: {}", key, e);
                return None;
            },
        };

        match codec::decode::<R>(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Discarding malformed cache entry {}: {}", key, e);
                None
            },
        }
    }

    /// Write `value` under `key` with expiry `ttl_secs`; failures are swallowed
    pub async fn set<R: Resource>(&self, key: &CacheKey, value: Option<&R::Value>, ttl_secs: u64) {
        let bytes = match codec::encode::<R>(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Not caching {}: {}", key, e);
                return;
            },
        };

        match self.backend.set_ex(key.as_str(), bytes, ttl_secs).await {
            Ok(()) => debug!("Cached {} for {}s", key, ttl_secs),
            Err(e) => warn!("Cache write for {} failed, skipping: {}", key, e),
        }
    }

    /// Remove `key`; failures are swallowed
    pub async fn delete(&self, key: &CacheKey) {
        if let Err(e) = self.backend.delete(key.as_str()).await {
            warn!("Cache delete for {} failed: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use pkglens_core::resource::{Readme, Score};
    use pkglens_core::types;

    fn readme() -> types::Readme {
        types::Readme {
            content: "# react".to_string(),
            filename: Some("README.md".to_string()),
        }
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = CacheStore::new(Arc::new(MemoryBackend::new()));
        let key = CacheKey::build(Readme::KIND, &["react"]).unwrap();

        assert!(store.get::<Readme>(&key).await.is_none());
        store.set::<Readme>(&key, Some(&readme()), 7200).await;
        assert_eq!(store.get::<Readme>(&key).await, Some(Entry::Present(readme())));

        store.delete(&key).await;
        assert!(store.get::<Readme>(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_entry_is_a_miss() {
        let backend = Arc::new(MemoryBackend::new());
        let store = CacheStore::new(backend.clone());
        let key = CacheKey::build(Score::KIND, &["react"]).unwrap();

        backend.set_ex(key.as_str(), b"not bincode".to_vec(), 60).await.unwrap();
        assert!(store.get::<Score>(&key).await.is_none());
    }
}
