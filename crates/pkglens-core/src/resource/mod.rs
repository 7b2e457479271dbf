//! Typed resources.
//!
//! Each cached resource is a zero-sized marker implementing [`Resource`], tying
//! a [`ResourceKind`] to the concrete value type stored under it. The cache
//! codec uses this pairing so a value is only ever decoded as the type it was
//! written as.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::{self, normalize_query, ResourceKind};

/// Shortest normalized search query that reaches the cache or the origin
pub const MIN_SEARCH_QUERY_LEN: usize = 2;

/// A kind of cached upstream data
pub trait Resource: Send + Sync + 'static {
    /// Key namespace and TTL selector
    const KIND: ResourceKind;

    /// The value stored in the cache for this resource
    type Value: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// A neutral value to answer with before touching the cache or origin.
    ///
    /// Returning `Some` skips the lookup entirely.
    fn short_circuit(_params: &[&str]) -> Option<Self::Value> {
        None
    }
}

macro_rules! resource {
    ($(#[$meta:meta])* $name:ident, $kind:ident, $value:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl Resource for $name {
            const KIND: ResourceKind = ResourceKind::$kind;
            type Value = $value;
        }
    };
}

resource!(
    /// Registry manifest, identified by package name
    Manifest, Manifest, types::PackageManifest
);
resource!(
    /// Package readme, identified by package name
    Readme, Readme, types::Readme
);
resource!(
    /// Last-week download count, identified by package name
    Downloads, Downloads, types::WeeklyDownloads
);
resource!(
    /// Bundle size, identified by package name
    BundleSize, BundleSize, types::BundleSize
);
resource!(
    /// Quality score, identified by package name
    Score, Score, types::PackageScore
);
resource!(
    /// Version history, identified by package name
    Versions, Versions, types::VersionHistory
);
resource!(
    /// Security advisories, identified by package name
    Security, Security, types::SecurityAdvisories
);
resource!(
    /// Repository stars, identified by owner and repository name
    GithubStars, GithubStars, types::RepositoryStars
);
resource!(
    /// Most popular packages, identified by list size
    TopPackages, TopPackages, types::TopPackages
);

/// Search results, identified by the query text
#[derive(Debug, Clone, Copy)]
pub struct Search;

impl Resource for Search {
    const KIND: ResourceKind = ResourceKind::Search;
    type Value = types::SearchResults;

    fn short_circuit(params: &[&str]) -> Option<Self::Value> {
        let query = params.first().map(|q| normalize_query(q)).unwrap_or_default();
        if query.chars().count() < MIN_SEARCH_QUERY_LEN {
            Some(types::SearchResults::empty())
        } else {
            None
        }
    }
}
