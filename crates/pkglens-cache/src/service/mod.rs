//! Cache-aside resolver.
//!
//! [`CacheService`] is the one entry point used by every resource accessor:
//! serve from the backing store, otherwise fetch from the origin and populate
//! the store with the resource's TTL. Concurrent lookups of the same key within
//! this process share a single store read and origin fetch.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use pkglens_core::{CacheKey, Error, Resource, Result, TtlPolicy};
use tracing::{debug, error};

use crate::backend::{CacheBackend, MemoryBackend};
use crate::dedup::{Deduplicator, Role};
use crate::stats::{CacheStats, Counter, Counters};
use crate::store::CacheStore;

/// Type-erased resolved value, always an `Option<R::Value>` for the `R` whose
/// namespace the key belongs to
type Resolved = Arc<dyn Any + Send + Sync>;

/// Owned caching component, constructed once at startup and shared by handle
#[derive(Debug, Clone)]
pub struct CacheService {
    store: CacheStore,
    ttl: Arc<TtlPolicy>,
    in_flight: Deduplicator<Resolved>,
    counters: Arc<Counters>,
}

impl CacheService {
    /// Create a service over `backend` using `ttl` for every write
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: TtlPolicy) -> Self {
        Self {
            store: CacheStore::new(backend),
            ttl: Arc::new(ttl),
            in_flight: Deduplicator::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Create a service backed by process memory
    pub fn in_memory(ttl: TtlPolicy) -> Self {
        Self::new(Arc::new(MemoryBackend::new()), ttl)
    }

    /// Name of the backing store, e.g. "redis"
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Keys with a lookup currently outstanding
    pub fn in_flight(&self) -> usize {
        self.in_flight.in_flight()
    }

    /// Resolve resource `R` identified by `params`.
    ///
    /// Returns the cached value when present. Otherwise calls `fetch` once
    /// (shared with concurrent callers for the same key), caches and returns
    /// its value. `Ok(None)` means the origin reported the resource as
    /// nonexistent; that outcome is cached too. Any other origin failure is
    /// returned and not cached. Store failures never surface here.
    pub async fn resolve<R, F, Fut>(&self, params: &[&str], fetch: F) -> Result<Option<R::Value>>
    where
        R: Resource,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<R::Value>> + Send + 'static,
    {
        if let Some(value) = R::short_circuit(params) {
            self.counters.incr(Counter::ShortCircuited);
            return Ok(Some(value));
        }

        let key = CacheKey::build(R::KIND, params)?;
        let work = Self::lookup::<R, F, Fut>(
            self.store.clone(),
            Arc::clone(&self.counters),
            key.clone(),
            self.ttl.ttl_secs(R::KIND),
            fetch,
        );

        let (pending, role) = self.in_flight.dedup(key.clone(), work);
        if role == Role::Follower {
            self.counters.incr(Counter::Coalesced);
            debug!("Coalesced lookup for {}", key);
        }

        let resolved = pending.await?;
        match resolved.downcast::<Option<R::Value>>() {
            Ok(value) => Ok(Option::clone(&value)),
            Err(_) => Err(Error::Codec {
                message: format!("in-flight lookup for {key} resolved to another type"),
            }),
        }
    }

    /// Drop the cached entry of resource `R` identified by `params`
    pub async fn invalidate<R: Resource>(&self, params: &[&str]) -> Result<()> {
        let key = CacheKey::build(R::KIND, params)?;
        self.store.delete(&key).await;
        debug!("Invalidated {}", key);
        Ok(())
    }

    // The deduplicated unit of work: store read, origin fetch, store write.
    async fn lookup<R, F, Fut>(
        store: CacheStore,
        counters: Arc<Counters>,
        key: CacheKey,
        ttl_secs: u64,
        fetch: F,
    ) -> Result<Resolved>
    where
        R: Resource,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<R::Value>> + Send + 'static,
    {
        if let Some(entry) = store.get::<R>(&key).await {
            counters.incr(Counter::Hit);
            debug!("Cache hit for {}", key);
            let resolved: Resolved = Arc::new(entry.into_option());
            return Ok(resolved);
        }

        counters.incr(Counter::Miss);
        debug!("Cache miss for {}, fetching from origin", key);

        let value = match fetch().await {
            Ok(value) => Some(value),
            Err(e) if e.is_not_found() => {
                counters.incr(Counter::NotFound);
                debug!("Origin has no {}, caching as absent", key);
                None
            },
            Err(e) => {
                counters.incr(Counter::OriginError);
                error!("Origin lookup for {} failed: {}", key, e);
                return Err(e);
            },
        };

        store.set::<R>(&key, value.as_ref(), ttl_secs).await;
        let resolved: Resolved = Arc::new(value);
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests;
