//! Unit tests for the cache-aside resolver

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use pkglens_core::resource::{BundleSize, Downloads, Manifest, Search};
use pkglens_core::types::{self, PackageManifest, SearchHit, SearchResults};

use crate::backend::RedisBackend;
use crate::codec;

/// Memory backend that records every write
#[derive(Debug, Default)]
struct RecordingBackend {
    inner: MemoryBackend,
    writes: Mutex<Vec<(String, u64)>>,
}

impl RecordingBackend {
    fn writes(&self) -> Vec<(String, u64)> {
        self.writes.lock().clone()
    }
}

#[async_trait]
impl CacheBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<()> {
        self.writes.lock().push((key.to_string(), ttl_secs));
        self.inner.set_ex(key, value, ttl_secs).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }
}

/// Backend whose every operation fails
#[derive(Debug, Default)]
struct FailingBackend;

#[async_trait]
impl CacheBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Err(Error::CacheUnavailable {
            message: "connection refused".to_string(),
            source: None,
        })
    }

    async fn set_ex(&self, _key: &str, _value: Vec<u8>, _ttl_secs: u64) -> Result<()> {
        Err(Error::CacheUnavailable {
            message: "connection refused".to_string(),
            source: None,
        })
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(Error::CacheUnavailable {
            message: "connection refused".to_string(),
            source: None,
        })
    }
}

fn recording_service() -> (CacheService, Arc<RecordingBackend>) {
    let backend = Arc::new(RecordingBackend::default());
    let service = CacheService::new(backend.clone(), TtlPolicy::default());
    (service, backend)
}

fn manifest(name: &str) -> PackageManifest {
    let mut manifest = PackageManifest::new(name);
    manifest.latest_version = Some("18.3.1".to_string());
    manifest
}

fn downloads(name: &str) -> types::WeeklyDownloads {
    types::WeeklyDownloads {
        package: name.to_string(),
        downloads: 1234,
        start: "2026-10-08".to_string(),
        end: "2026-10-14".to_string(),
    }
}

fn bundle_size() -> types::BundleSize {
    types::BundleSize {
        version: Some("18.3.1".to_string()),
        size: 6400,
        gzip: 2500,
        dependency_count: 1,
        has_side_effects: false,
    }
}

fn search_results() -> SearchResults {
    SearchResults {
        total: 1,
        hits: vec![SearchHit {
            name: "react".to_string(),
            version: "18.3.1".to_string(),
            description: None,
            score: 0.98,
        }],
    }
}

/// Origin fetch that counts invocations and takes a little while
fn origin<T>(
    calls: &Arc<AtomicUsize>,
    result: Result<T>,
) -> impl FnOnce() -> futures::future::BoxFuture<'static, Result<T>> + Send + 'static
where
    T: Send + 'static,
{
    let calls = Arc::clone(calls);
    move || {
        Box::pin(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            result
        })
    }
}

#[tokio::test]
async fn test_cache_hit_short_circuits_origin() {
    let (service, backend) = recording_service();
    let calls = Arc::new(AtomicUsize::new(0));

    let bytes = codec::encode::<Manifest>(Some(&manifest("react"))).unwrap();
    backend.inner.set_ex("package:manifest:react", bytes, 60).await.unwrap();

    let value = service
        .resolve::<Manifest, _, _>(&["react"], origin(&calls, Ok(manifest("other"))))
        .await
        .unwrap();

    assert_eq!(value, Some(manifest("react")));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(backend.writes().is_empty());
    assert_eq!(service.stats().hits, 1);
}

#[tokio::test]
async fn test_miss_then_populate() {
    let (service, backend) = recording_service();
    let calls = Arc::new(AtomicUsize::new(0));

    let value = service
        .resolve::<Manifest, _, _>(&["react"], origin(&calls, Ok(manifest("react"))))
        .await
        .unwrap();

    assert_eq!(value, Some(manifest("react")));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        backend.writes(),
        vec![("package:manifest:react".to_string(), 3600)]
    );

    let cached = backend.inner.get("package:manifest:react").await.unwrap().unwrap();
    let entry = codec::decode::<Manifest>(&cached).unwrap();
    assert_eq!(entry.into_option(), Some(manifest("react")));
}

#[tokio::test]
async fn test_concurrent_lookups_are_deduplicated() {
    let (service, backend) = recording_service();
    let calls = Arc::new(AtomicUsize::new(0));

    let lookups = (0..8).map(|_| {
        service.resolve::<Downloads, _, _>(&["react"], origin(&calls, Ok(downloads("react"))))
    });
    let results = join_all(lookups).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for result in results {
        assert_eq!(result.unwrap(), Some(downloads("react")));
    }
    assert_eq!(backend.writes().len(), 1);
    assert_eq!(service.stats().coalesced, 7);
    assert_eq!(service.in_flight(), 0);
}

#[tokio::test]
async fn test_concurrent_failure_is_shared() {
    let (service, backend) = recording_service();
    let calls = Arc::new(AtomicUsize::new(0));
    let failure = || -> Result<PackageManifest> {
        Err(Error::OriginUnavailable {
            message: "registry returned 502".to_string(),
            source: None,
        })
    };

    let lookups = (0..4).map(|_| {
        service.resolve::<Manifest, _, _>(&["react"], origin(&calls, failure()))
    });
    let results = join_all(lookups).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(results
        .iter()
        .all(|r| matches!(r, Err(Error::OriginUnavailable { .. }))));
    assert!(backend.writes().is_empty());
    assert_eq!(service.in_flight(), 0);
}

#[tokio::test]
async fn test_not_found_is_cached_as_null() {
    let (service, backend) = recording_service();
    let calls = Arc::new(AtomicUsize::new(0));
    let not_found: Result<PackageManifest> = Err(Error::NotFound {
        resource: "no-such-package".to_string(),
    });

    let first = service
        .resolve::<Manifest, _, _>(&["no-such-package"], origin(&calls, not_found))
        .await
        .unwrap();
    assert_eq!(first, None);
    assert_eq!(
        backend.writes(),
        vec![("package:manifest:no-such-package".to_string(), 3600)]
    );

    let second = service
        .resolve::<Manifest, _, _>(&["no-such-package"], origin(&calls, Ok(manifest("x"))))
        .await
        .unwrap();
    assert_eq!(second, None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.stats().not_found, 1);
}

#[tokio::test]
async fn test_origin_failure_is_not_cached() {
    let (service, backend) = recording_service();
    let calls = Arc::new(AtomicUsize::new(0));
    let failure: Result<PackageManifest> = Err(Error::OriginUnavailable {
        message: "timeout".to_string(),
        source: None,
    });

    let first = service
        .resolve::<Manifest, _, _>(&["react"], origin(&calls, failure))
        .await;
    assert!(matches!(first, Err(Error::OriginUnavailable { .. })));
    assert!(backend.writes().is_empty());

    let second = service
        .resolve::<Manifest, _, _>(&["react"], origin(&calls, Ok(manifest("react"))))
        .await
        .unwrap();
    assert_eq!(second, Some(manifest("react")));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(service.stats().origin_errors, 1);
}

#[tokio::test]
async fn test_unavailable_cache_falls_through_to_origin() {
    let service = CacheService::new(Arc::new(FailingBackend), TtlPolicy::default());
    let calls = Arc::new(AtomicUsize::new(0));

    let first = service
        .resolve::<Manifest, _, _>(&["react"], origin(&calls, Ok(manifest("react"))))
        .await
        .unwrap();
    let second = service
        .resolve::<Manifest, _, _>(&["react"], origin(&calls, Ok(manifest("react"))))
        .await
        .unwrap();

    assert_eq!(first, Some(manifest("react")));
    assert_eq!(second, Some(manifest("react")));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(service.invalidate::<Manifest>(&["react"]).await.is_ok());
}

#[tokio::test]
async fn test_ttl_differs_by_kind() {
    let (service, backend) = recording_service();
    let calls = Arc::new(AtomicUsize::new(0));

    service
        .resolve::<BundleSize, _, _>(&["react"], origin(&calls, Ok(bundle_size())))
        .await
        .unwrap();
    service
        .resolve::<Downloads, _, _>(&["react"], origin(&calls, Ok(downloads("react"))))
        .await
        .unwrap();

    assert_eq!(
        backend.writes(),
        vec![
            ("bundle:size:react".to_string(), 86400),
            ("downloads:week:react".to_string(), 1800),
        ]
    );
}

#[tokio::test]
async fn test_ttl_overrides_are_applied() {
    let backend = Arc::new(RecordingBackend::default());
    let ttl = TtlPolicy::with_overrides([(Downloads::KIND, 300)]).unwrap();
    let service = CacheService::new(backend.clone(), ttl);
    let calls = Arc::new(AtomicUsize::new(0));

    service
        .resolve::<Downloads, _, _>(&["react"], origin(&calls, Ok(downloads("react"))))
        .await
        .unwrap();

    assert_eq!(backend.writes(), vec![("downloads:week:react".to_string(), 300)]);
}

#[tokio::test]
async fn test_search_scenario() {
    let (service, backend) = recording_service();
    let calls = Arc::new(AtomicUsize::new(0));

    let first = service
        .resolve::<Search, _, _>(&["react"], origin(&calls, Ok(search_results())))
        .await
        .unwrap();
    assert_eq!(first, Some(search_results()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.writes(), vec![("search:react".to_string(), 1800)]);

    let second = service
        .resolve::<Search, _, _>(&["REACT"], origin(&calls, Ok(SearchResults::empty())))
        .await
        .unwrap();
    assert_eq!(second, Some(search_results()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_short_query_skips_cache_and_origin() {
    let (service, backend) = recording_service();
    let calls = Arc::new(AtomicUsize::new(0));

    let value = service
        .resolve::<Search, _, _>(&["r"], origin(&calls, Ok(search_results())))
        .await
        .unwrap();

    assert_eq!(value, Some(SearchResults::empty()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(backend.writes().is_empty());
    assert_eq!(service.stats().short_circuited, 1);
}

#[tokio::test]
async fn test_empty_param_is_invalid_input() {
    let (service, backend) = recording_service();
    let calls = Arc::new(AtomicUsize::new(0));

    let result = service
        .resolve::<Manifest, _, _>(&[""], origin(&calls, Ok(manifest("react"))))
        .await;

    assert!(matches!(result, Err(Error::InvalidInput { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(backend.writes().is_empty());
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let (service, _backend) = recording_service();
    let calls = Arc::new(AtomicUsize::new(0));

    service
        .resolve::<Manifest, _, _>(&["react"], origin(&calls, Ok(manifest("react"))))
        .await
        .unwrap();
    service.invalidate::<Manifest>(&["react"]).await.unwrap();
    service
        .resolve::<Manifest, _, _>(&["react"], origin(&calls, Ok(manifest("react"))))
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// Address of a TCP server that accepts connections and never answers
async fn silent_server() -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

#[tokio::test]
async fn test_hung_store_does_not_serialize_concurrent_lookups() {
    let timeout = Duration::from_millis(200);
    let addr = silent_server().await;
    let backend = RedisBackend::open(&format!("redis://{addr}/"), timeout).unwrap();
    let service = CacheService::new(Arc::new(backend), TtlPolicy::default());
    let calls = Arc::new(AtomicUsize::new(0));

    let names: Vec<String> = (0..8).map(|i| format!("package-{i}")).collect();
    let started = std::time::Instant::now();
    let service = &service;
    let results = join_all(names.iter().map(|name| {
        let fetch = origin(&calls, Ok(manifest(name)));
        async move { service.resolve::<Manifest, _, _>(&[name.as_str()], fetch).await }
    }))
    .await;
    let elapsed = started.elapsed();

    for (name, result) in names.iter().zip(results) {
        assert_eq!(result.unwrap(), Some(manifest(name)));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 8);
    // One bounded read and one bounded write at most, not one per caller
    assert!(elapsed < timeout * 4, "lookups took {elapsed:?}");
}
