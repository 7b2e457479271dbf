//! Resource kinds partition the cache by key namespace and freshness window.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The category of cached upstream data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Manifest,
    Readme,
    Downloads,
    BundleSize,
    Score,
    Versions,
    Security,
    GithubStars,
    Search,
    TopPackages,
}

impl ResourceKind {
    /// Every kind, in tag order
    pub const ALL: [ResourceKind; 10] = [
        ResourceKind::Manifest,
        ResourceKind::Readme,
        ResourceKind::Downloads,
        ResourceKind::BundleSize,
        ResourceKind::Score,
        ResourceKind::Versions,
        ResourceKind::Security,
        ResourceKind::GithubStars,
        ResourceKind::Search,
        ResourceKind::TopPackages,
    ];

    /// Key namespace segment
    pub const fn namespace(self) -> &'static str {
        match self {
            ResourceKind::Manifest => "package:manifest",
            ResourceKind::Readme => "package:readme",
            ResourceKind::Downloads => "downloads:week",
            ResourceKind::BundleSize => "bundle:size",
            ResourceKind::Score => "package:score",
            ResourceKind::Versions => "package:versions",
            ResourceKind::Security => "security:advisories",
            ResourceKind::GithubStars => "github:stars",
            ResourceKind::Search => "search",
            ResourceKind::TopPackages => "packages:top",
        }
    }

    /// Default freshness window in seconds.
    ///
    /// Volatile data (download counts, search) expires sooner than
    /// near-static data (bundle size, quality score).
    pub const fn default_ttl_secs(self) -> u64 {
        match self {
            ResourceKind::Manifest => 3600,
            ResourceKind::Readme => 7200,
            ResourceKind::Downloads => 1800,
            ResourceKind::BundleSize => 86400,
            ResourceKind::Score => 86400,
            ResourceKind::Versions => 3600,
            ResourceKind::Security => 43200,
            ResourceKind::GithubStars => 3600,
            ResourceKind::Search => 1800,
            ResourceKind::TopPackages => 3600,
        }
    }

    /// Stable one-byte tag written into every cache entry header
    pub const fn tag(self) -> u8 {
        match self {
            ResourceKind::Manifest => 1,
            ResourceKind::Readme => 2,
            ResourceKind::Downloads => 3,
            ResourceKind::BundleSize => 4,
            ResourceKind::Score => 5,
            ResourceKind::Versions => 6,
            ResourceKind::Security => 7,
            ResourceKind::GithubStars => 8,
            ResourceKind::Search => 9,
            ResourceKind::TopPackages => 10,
        }
    }

    /// Whether identifying parameters are free text that must be normalized
    pub const fn is_free_text(self) -> bool {
        matches!(self, ResourceKind::Search)
    }

    /// Name used in configuration files and environment variables
    pub const fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Manifest => "manifest",
            ResourceKind::Readme => "readme",
            ResourceKind::Downloads => "downloads",
            ResourceKind::BundleSize => "bundle_size",
            ResourceKind::Score => "score",
            ResourceKind::Versions => "versions",
            ResourceKind::Security => "security",
            ResourceKind::GithubStars => "github_stars",
            ResourceKind::Search => "search",
            ResourceKind::TopPackages => "top_packages",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| Error::invalid_input("resource kind", format!("unknown kind '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tags_and_namespaces_are_unique() {
        let tags: HashSet<u8> = ResourceKind::ALL.iter().map(|k| k.tag()).collect();
        let namespaces: HashSet<&str> = ResourceKind::ALL.iter().map(|k| k.namespace()).collect();

        assert_eq!(tags.len(), ResourceKind::ALL.len());
        assert_eq!(namespaces.len(), ResourceKind::ALL.len());
    }

    #[test]
    fn test_from_str_round_trips_config_names() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
        }
        assert_eq!("Bundle-Size".parse::<ResourceKind>().unwrap(), ResourceKind::BundleSize);
        assert!("tarball".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_volatile_data_expires_sooner() {
        assert!(
            ResourceKind::Downloads.default_ttl_secs() < ResourceKind::BundleSize.default_ttl_secs()
        );
        assert!(ResourceKind::Search.default_ttl_secs() < ResourceKind::Score.default_ttl_secs());
    }
}
