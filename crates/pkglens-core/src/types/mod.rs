//! Core data types for pkglens.
//!
//! This module provides:
//! - `ResourceKind`, the dimension the cache is partitioned along
//! - `CacheKey` construction and `TtlPolicy` lookup
//! - The typed values stored for each kind of resource

pub mod advisory;
pub mod key;
pub mod kind;
pub mod metrics;
pub mod package;
pub mod search;
pub mod ttl;

// Re-export all public types
pub use advisory::{Advisory, SecurityAdvisories, Severity};
pub use key::{normalize_query, CacheKey};
pub use kind::ResourceKind;
pub use metrics::{BundleSize, PackageScore, RepositoryStars, WeeklyDownloads};
pub use package::{parse_github_repo, PackageManifest, Readme, Release, Repository, VersionHistory};
pub use search::{SearchHit, SearchResults, TopPackages};
pub use ttl::TtlPolicy;
