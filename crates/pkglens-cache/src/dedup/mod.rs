//! In-flight request deduplication.
//!
//! At most one unit of work runs per [`CacheKey`] at any instant within a
//! process. Callers arriving while it runs receive a handle to the same shared
//! outcome instead of starting their own.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::channel::oneshot;
use futures::future::{BoxFuture, FutureExt, Shared, TryFutureExt};
use parking_lot::Mutex;
use pkglens_core::{CacheKey, Error, Result};
use tracing::trace;

type Pending<T> = Shared<oneshot::Receiver<Result<T>>>;
type PendingMap<T> = Arc<Mutex<HashMap<CacheKey, Pending<T>>>>;

/// How a caller was attached to the work for its key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// This caller started the work
    Leader,
    /// This caller joined work that was already in flight
    Follower,
}

/// Map from cache key to the single outstanding work for that key
pub struct Deduplicator<T> {
    in_flight: PendingMap<T>,
}

impl<T> std::fmt::Debug for Deduplicator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deduplicator")
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}

impl<T> Clone for Deduplicator<T> {
    fn clone(&self) -> Self {
        Self {
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<T> Default for Deduplicator<T> {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> Deduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with work currently outstanding
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Run `work` for `key`, or join the work already running for it.
    ///
    /// The work is spawned onto the runtime, so it settles even if every caller
    /// stops waiting. Its map entry is released when it settles on any path,
    /// including a panic.
    ///
    /// NOTE: This is not `async` so that registration happens eagerly, before
    /// the returned future is first polled.
    pub fn dedup<F>(&self, key: CacheKey, work: F) -> (BoxFuture<'static, Result<T>>, Role)
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (pending, role) = {
            let mut in_flight = self.in_flight.lock();
            if let Some(pending) = in_flight.get(&key) {
                trace!("Joining in-flight lookup for {}", key);
                (pending.clone(), Role::Follower)
            } else {
                let pending = self.spawn(key.clone(), work);
                in_flight.insert(key, pending.clone());
                (pending, Role::Leader)
            }
        };

        let future = pending.unwrap_or_else(|_canceled| {
            Err(Error::OriginUnavailable {
                message: "lookup was aborted before it settled".to_string(),
                source: None,
            })
        });

        (future.boxed(), role)
    }

    // Must be called with the map locked, so the entry is inserted before the
    // spawned work can try to remove it.
    fn spawn<F>(&self, key: CacheKey, work: F) -> Pending<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();

        let in_flight = Arc::clone(&self.in_flight);
        let release = CallOnDrop::new(move || {
            in_flight.lock().remove(&key);
        });

        tokio::spawn(async move {
            let result = work.await;
            // Evict before publishing: a caller either gets this result or
            // starts fresh work, never a settled-but-registered entry.
            drop(release);
            sender.send(result).ok();
        });

        receiver.shared()
    }
}

/// Runs a closure when dropped
struct CallOnDrop {
    f: Option<Box<dyn FnOnce() + Send>>,
}

impl CallOnDrop {
    fn new<F: FnOnce() + Send + 'static>(f: F) -> Self {
        Self {
            f: Some(Box::new(f)),
        }
    }
}

impl Drop for CallOnDrop {
    fn drop(&mut self) {
        if let Some(f) = self.f.take() {
            f();
        }
    }
}
