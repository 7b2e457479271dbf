//! Cache warming.
//!
//! Pre-populates the cache for popular and explicitly listed packages so that
//! the first interactive lookups are hits. Warming is triggered explicitly and
//! never runs in the background.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use pkglens_core::resource::{Downloads, Manifest, Score};
use pkglens_core::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::lens::PackageLens;

/// Default number of packages warmed at once
pub const DEFAULT_WARM_CONCURRENCY: usize = 8;

/// What to warm
#[derive(Debug, Clone)]
pub struct WarmOptions {
    /// Packages to warm in addition to the top list
    pub packages: Vec<String>,
    /// Size of the most-popular list to warm, zero to skip it
    pub top_packages: usize,
    /// Maximum packages warmed concurrently
    pub concurrency: usize,
    /// Drop existing entries first so every value is refetched
    pub refresh: bool,
}

impl Default for WarmOptions {
    fn default() -> Self {
        Self {
            packages: Vec::new(),
            top_packages: 0,
            concurrency: DEFAULT_WARM_CONCURRENCY,
            refresh: false,
        }
    }
}

/// Outcome of a warming run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarmReport {
    /// Packages whose manifest, downloads and score are now cached
    pub warmed: Vec<String>,
    /// Packages (or the top list) that could not be warmed, with the reason
    pub failed: Vec<(String, String)>,
}

impl WarmReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Warm the cache for `options.packages` plus the top `options.top_packages`.
///
/// A package that fails is recorded in the report; the run carries on.
pub async fn warm(lens: &PackageLens, options: &WarmOptions) -> WarmReport {
    let mut report = WarmReport::default();
    let mut names = options.packages.clone();

    if options.top_packages > 0 {
        match lens.top_packages(options.top_packages).await {
            Ok(Some(top)) => names.extend(top.names().map(str::to_string)),
            Ok(None) => warn!("Top packages list is unavailable upstream"),
            Err(e) => {
                warn!("Failed to fetch top packages: {}", e);
                report.failed.push(("top packages".to_string(), e.to_string()));
            },
        }
    }

    // Keep the first occurrence of each name
    let mut seen = HashSet::new();
    names.retain(|name| seen.insert(name.clone()));

    info!("Warming cache for {} packages", names.len());

    let concurrency = options.concurrency.max(1);
    let results: Vec<(String, Result<()>)> = stream::iter(names)
        .map(|name| async move {
            let result = warm_package(lens, &name, options.refresh).await;
            (name, result)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    for (name, result) in results {
        match result {
            Ok(()) => report.warmed.push(name),
            Err(e) => {
                warn!("Failed to warm {}: {}", name, e);
                report.failed.push((name, e.to_string()));
            },
        }
    }

    report.warmed.sort();
    report
}

async fn warm_package(lens: &PackageLens, name: &str, refresh: bool) -> Result<()> {
    if refresh {
        lens.invalidate::<Manifest>(&[name]).await?;
        lens.invalidate::<Downloads>(&[name]).await?;
        lens.invalidate::<Score>(&[name]).await?;
    }

    tokio::try_join!(
        lens.manifest(name),
        lens.weekly_downloads(name),
        lens.score(name),
    )?;
    Ok(())
}
