use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pkglens_cache::codec;
use pkglens_core::resource::Manifest;
use pkglens_core::types::{PackageManifest, Repository};
use pkglens_core::{CacheKey, ResourceKind};

fn sample_manifest() -> PackageManifest {
    let mut dist_tags = BTreeMap::new();
    dist_tags.insert("latest".to_string(), "18.3.1".to_string());
    dist_tags.insert("next".to_string(), "19.0.0-rc.1".to_string());

    PackageManifest {
        name: "react".to_string(),
        description: Some("React is a JavaScript library for building user interfaces.".to_string()),
        latest_version: Some("18.3.1".to_string()),
        dist_tags,
        license: Some("MIT".to_string()),
        homepage: Some("https://react.dev/".to_string()),
        repository: Some(Repository {
            url: "git+https://github.com/facebook/react.git".to_string(),
            directory: Some("packages/react".to_string()),
        }),
        keywords: vec!["react".to_string()],
        maintainers: vec!["fb".to_string(), "react-bot".to_string()],
        modified: Some("2026-10-01T00:00:00.000Z".to_string()),
    }
}

fn bench_keys(c: &mut Criterion) {
    c.bench_function("build_key_manifest", |b| {
        b.iter(|| CacheKey::build(ResourceKind::Manifest, black_box(&["@types/node"])))
    });
    c.bench_function("build_key_search", |b| {
        b.iter(|| CacheKey::build(ResourceKind::Search, black_box(&["  React  State Management "])))
    });
}

fn bench_codec(c: &mut Criterion) {
    let manifest = sample_manifest();
    let bytes = codec::encode::<Manifest>(Some(&manifest)).unwrap();

    c.bench_function("encode_manifest", |b| {
        b.iter(|| codec::encode::<Manifest>(black_box(Some(&manifest))))
    });
    c.bench_function("decode_manifest", |b| {
        b.iter(|| codec::decode::<Manifest>(black_box(&bytes)))
    });
}

criterion_group!(benches, bench_keys, bench_codec);
criterion_main!(benches);
