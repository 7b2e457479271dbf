//! Popularity and quality figures gathered from the statistics services.

use serde::{Deserialize, Serialize};

/// Download count over the last week
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyDownloads {
    pub package: String,
    pub downloads: u64,
    pub start: String,
    pub end: String,
}

/// Bundle size as measured by the bundle analysis service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSize {
    pub version: Option<String>,
    /// Minified size in bytes
    pub size: u64,
    /// Minified and gzipped size in bytes
    pub gzip: u64,
    pub dependency_count: u32,
    pub has_side_effects: bool,
}

/// Quality score breakdown, every component in `0.0..=1.0`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageScore {
    pub overall: f64,
    pub quality: f64,
    pub popularity: f64,
    pub maintenance: f64,
}

/// Star and fork counts of a source repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryStars {
    pub owner: String,
    pub repo: String,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
}

impl BundleSize {
    /// Gzip compression ratio, `None` for empty bundles
    pub fn compression_ratio(&self) -> Option<f64> {
        if self.size == 0 {
            None
        } else {
            Some(self.gzip as f64 / self.size as f64)
        }
    }
}
