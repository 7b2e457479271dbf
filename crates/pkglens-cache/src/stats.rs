//! Lookup counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub(crate) struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    not_found: AtomicU64,
    origin_errors: AtomicU64,
    short_circuited: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Counter {
    Hit,
    Miss,
    Coalesced,
    NotFound,
    OriginError,
    ShortCircuited,
}

impl Counters {
    pub fn incr(&self, counter: Counter) {
        let slot = match counter {
            Counter::Hit => &self.hits,
            Counter::Miss => &self.misses,
            Counter::Coalesced => &self.coalesced,
            Counter::NotFound => &self.not_found,
            Counter::OriginError => &self.origin_errors,
            Counter::ShortCircuited => &self.short_circuited,
        };
        slot.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            origin_errors: self.origin_errors.load(Ordering::Relaxed),
            short_circuited: self.short_circuited.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time lookup statistics of a [`CacheService`](crate::CacheService)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the backing store
    pub hits: u64,
    /// Lookups that went to the origin
    pub misses: u64,
    /// Callers that joined a lookup already in flight
    pub coalesced: u64,
    /// Origin lookups that resolved to "does not exist"
    pub not_found: u64,
    /// Origin lookups that failed
    pub origin_errors: u64,
    /// Requests answered without any lookup
    pub short_circuited: u64,
}

impl CacheStats {
    /// Share of store lookups that were hits
    pub fn hit_ratio(&self) -> Option<f64> {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            None
        } else {
            Some(self.hits as f64 / lookups as f64)
        }
    }
}
