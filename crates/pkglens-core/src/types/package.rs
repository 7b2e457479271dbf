//! Package manifest, readme and version history values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Summary of a package document from the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    pub description: Option<String>,
    /// Version pointed to by the `latest` dist-tag
    pub latest_version: Option<String>,
    pub dist_tags: BTreeMap<String, String>,
    pub license: Option<String>,
    pub homepage: Option<String>,
    pub repository: Option<Repository>,
    pub keywords: Vec<String>,
    pub maintainers: Vec<String>,
    /// Last modification timestamp as reported by the registry
    pub modified: Option<String>,
}

/// Repository information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub url: String,
    pub directory: Option<String>,
}

/// Readme text of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readme {
    pub content: String,
    pub filename: Option<String>,
}

/// All published versions of a package, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionHistory {
    pub releases: Vec<Release>,
}

/// One published version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub version: String,
    pub published: Option<String>,
    pub deprecated: Option<String>,
}

impl PackageManifest {
    /// Create a manifest with only the name set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            latest_version: None,
            dist_tags: BTreeMap::new(),
            license: None,
            homepage: None,
            repository: None,
            keywords: Vec::new(),
            maintainers: Vec::new(),
            modified: None,
        }
    }

    /// Check if this package has a specific keyword
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k == keyword)
    }

    /// GitHub `(owner, repo)` of the repository, if it is hosted there
    pub fn github_repo(&self) -> Option<(String, String)> {
        self.repository
            .as_ref()
            .and_then(|repo| parse_github_repo(&repo.url))
    }
}

impl VersionHistory {
    /// The newest release, if any
    pub fn latest(&self) -> Option<&Release> {
        self.releases.first()
    }

    /// Whether `version` was ever published
    pub fn contains(&self, version: &str) -> bool {
        self.releases.iter().any(|r| r.version == version)
    }
}

/// Extract `(owner, repo)` from the URL forms npm manifests use for GitHub:
/// `git+https://github.com/o/r.git`, `git@github.com:o/r.git`, `github:o/r`
/// and the bare `o/r` shorthand.
pub fn parse_github_repo(url: &str) -> Option<(String, String)> {
    let url = url.trim();
    let path = if let Some(rest) = url.strip_prefix("github:") {
        rest
    } else if let Some(idx) = url.find("github.com") {
        url[idx + "github.com".len()..].trim_start_matches([':', '/'])
    } else if !url.contains(':') && url.matches('/').count() == 1 {
        url
    } else {
        return None;
    };

    let mut parts = path.split(['/', '#', '?']).filter(|p| !p.is_empty());
    let owner = parts.next()?;
    let repo = parts.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);

    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}
