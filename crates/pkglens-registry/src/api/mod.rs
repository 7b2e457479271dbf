//! Upstream API response types and their conversion into cached values.
//!
//! Only the fields pkglens keeps are modeled. Fields whose shape varies across
//! old and new packages (license, repository, keywords) are read as raw JSON.

use std::collections::{BTreeMap, HashMap};

use pkglens_core::types::{
    Advisory, BundleSize, PackageManifest, PackageScore, Readme, Release, Repository,
    RepositoryStars, SearchHit, SearchResults, SecurityAdvisories, Severity, TopPackages,
    VersionHistory, WeeklyDownloads,
};
use serde::Deserialize;
use serde_json::Value;

/// Package document ("packument") from the npm registry
#[derive(Debug, Clone, Deserialize)]
pub struct PackumentResponse {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub versions: HashMap<String, VersionMetadata>,
    #[serde(default)]
    pub time: HashMap<String, String>,
    pub license: Option<Value>,
    pub homepage: Option<String>,
    pub repository: Option<Value>,
    pub keywords: Option<Value>,
    #[serde(default)]
    pub maintainers: Vec<Maintainer>,
    pub readme: Option<String>,
    #[serde(rename = "readmeFilename")]
    pub readme_filename: Option<String>,
}

/// Metadata for a specific package version
#[derive(Debug, Clone, Deserialize)]
pub struct VersionMetadata {
    pub version: String,
    pub deprecated: Option<Value>,
    pub license: Option<Value>,
    pub repository: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Maintainer {
    pub name: Option<String>,
}

/// `GET /downloads/point/last-week/{name}`
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadsPointResponse {
    pub downloads: u64,
    pub start: String,
    pub end: String,
    pub package: String,
}

/// `GET /api/size?package={name}` on bundlephobia
#[derive(Debug, Clone, Deserialize)]
pub struct BundleSizeResponse {
    pub version: Option<String>,
    pub size: u64,
    pub gzip: u64,
    #[serde(rename = "dependencyCount", default)]
    pub dependency_count: u32,
    #[serde(rename = "hasSideEffects", default)]
    pub has_side_effects: Value,
}

/// `GET /v2/package/{name}` on npms.io
#[derive(Debug, Clone, Deserialize)]
pub struct NpmsPackageResponse {
    pub score: NpmsScore,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NpmsScore {
    #[serde(rename = "final")]
    pub overall: f64,
    pub detail: NpmsScoreDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NpmsScoreDetail {
    pub quality: f64,
    pub popularity: f64,
    pub maintenance: f64,
}

/// `POST /v1/query` on OSV
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OsvQueryResponse {
    #[serde(default)]
    pub vulns: Vec<OsvVulnerability>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsvVulnerability {
    pub id: String,
    pub summary: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub published: Option<String>,
    pub database_specific: Option<Value>,
    #[serde(default)]
    pub affected: Vec<OsvAffected>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsvAffected {
    #[serde(default)]
    pub ranges: Vec<OsvRange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsvRange {
    #[serde(default)]
    pub events: Vec<OsvEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsvEvent {
    pub fixed: Option<String>,
}

/// `GET /repos/{owner}/{repo}` on GitHub
#[derive(Debug, Clone, Deserialize)]
pub struct GithubRepoResponse {
    pub stargazers_count: u64,
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
}

/// `GET /-/v1/search` on the npm registry
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub objects: Vec<SearchObject>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchObject {
    pub package: SearchPackage,
    pub score: Option<SearchScore>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchPackage {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchScore {
    #[serde(rename = "final")]
    pub overall: f64,
}

impl PackumentResponse {
    /// Version pointed to by the `latest` dist-tag
    pub fn latest(&self) -> Option<&VersionMetadata> {
        self.dist_tags.get("latest").and_then(|v| self.versions.get(v))
    }

    pub fn into_manifest(self) -> PackageManifest {
        let latest = self.latest().cloned();
        // Older documents only carry these on the version entries
        let license = self
            .license
            .as_ref()
            .or_else(|| latest.as_ref().and_then(|v| v.license.as_ref()))
            .and_then(license_name);
        let repository = self
            .repository
            .as_ref()
            .or_else(|| latest.as_ref().and_then(|v| v.repository.as_ref()))
            .and_then(repository_of);

        PackageManifest {
            latest_version: self.dist_tags.get("latest").cloned(),
            license,
            repository,
            keywords: self.keywords.as_ref().map(keywords_of).unwrap_or_default(),
            maintainers: self.maintainers.into_iter().filter_map(|m| m.name).collect(),
            modified: self.time.get("modified").cloned(),
            name: self.name,
            description: self.description,
            dist_tags: self.dist_tags,
            homepage: self.homepage,
        }
    }

    /// `None` when the document carries no readme text
    pub fn into_readme(self) -> Option<Readme> {
        let content = self.readme.filter(|r| !r.trim().is_empty())?;
        Some(Readme {
            content,
            filename: self.readme_filename.filter(|f| !f.is_empty()),
        })
    }

    pub fn into_version_history(self) -> VersionHistory {
        let mut releases: Vec<Release> = self
            .versions
            .into_values()
            .map(|meta| Release {
                published: self.time.get(&meta.version).cloned(),
                deprecated: meta.deprecated.as_ref().and_then(deprecation_message),
                version: meta.version,
            })
            .collect();

        // ISO-8601 timestamps order lexicographically; unknown dates go last
        releases.sort_by(|a, b| {
            b.published
                .cmp(&a.published)
                .then_with(|| b.version.cmp(&a.version))
        });
        VersionHistory { releases }
    }
}

impl From<DownloadsPointResponse> for WeeklyDownloads {
    fn from(response: DownloadsPointResponse) -> Self {
        Self {
            package: response.package,
            downloads: response.downloads,
            start: response.start,
            end: response.end,
        }
    }
}

impl From<BundleSizeResponse> for BundleSize {
    fn from(response: BundleSizeResponse) -> Self {
        // `hasSideEffects` is either a flag or the list of files with side effects
        let has_side_effects = match &response.has_side_effects {
            Value::Bool(flag) => *flag,
            Value::Array(files) => !files.is_empty(),
            _ => false,
        };
        Self {
            version: response.version,
            size: response.size,
            gzip: response.gzip,
            dependency_count: response.dependency_count,
            has_side_effects,
        }
    }
}

impl From<NpmsPackageResponse> for PackageScore {
    fn from(response: NpmsPackageResponse) -> Self {
        let score = response.score;
        Self {
            overall: score.overall,
            quality: score.detail.quality,
            popularity: score.detail.popularity,
            maintenance: score.detail.maintenance,
        }
    }
}

impl From<OsvQueryResponse> for SecurityAdvisories {
    fn from(response: OsvQueryResponse) -> Self {
        let advisories = response
            .vulns
            .into_iter()
            .map(|vuln| {
                let severity = vuln
                    .database_specific
                    .as_ref()
                    .and_then(|db| db.get("severity"))
                    .and_then(Value::as_str)
                    .map(Severity::from_label)
                    .unwrap_or(Severity::Unknown);
                let fixed_in = vuln
                    .affected
                    .iter()
                    .flat_map(|a| &a.ranges)
                    .flat_map(|r| &r.events)
                    .filter_map(|e| e.fixed.clone())
                    .collect();

                Advisory {
                    id: vuln.id,
                    summary: vuln.summary,
                    aliases: vuln.aliases,
                    severity,
                    published: vuln.published,
                    fixed_in,
                }
            })
            .collect();

        Self { advisories }
    }
}

impl GithubRepoResponse {
    pub fn into_stars(self, owner: &str, repo: &str) -> RepositoryStars {
        RepositoryStars {
            owner: owner.to_string(),
            repo: repo.to_string(),
            stars: self.stargazers_count,
            forks: self.forks_count,
            open_issues: self.open_issues_count,
        }
    }
}

impl From<SearchObject> for SearchHit {
    fn from(object: SearchObject) -> Self {
        Self {
            name: object.package.name,
            version: object.package.version,
            description: object.package.description,
            score: object.score.map(|s| s.overall).unwrap_or_default(),
        }
    }
}

impl From<SearchResponse> for SearchResults {
    fn from(response: SearchResponse) -> Self {
        Self {
            total: response.total,
            hits: response.objects.into_iter().map(SearchHit::from).collect(),
        }
    }
}

impl From<SearchResponse> for TopPackages {
    fn from(response: SearchResponse) -> Self {
        Self {
            packages: response.objects.into_iter().map(SearchHit::from).collect(),
        }
    }
}

// "MIT", {"type": "MIT"} or [{"type": "MIT"}, ...]
fn license_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => map.get("type").and_then(Value::as_str).map(String::from),
        Value::Array(items) => {
            let names: Vec<String> = items.iter().filter_map(license_name).collect();
            (!names.is_empty()).then(|| names.join(" OR "))
        },
        _ => None,
    }
}

// "github:o/r", "https://..." or {"type": "git", "url": "...", "directory": "..."}
fn repository_of(value: &Value) -> Option<Repository> {
    match value {
        Value::String(url) if !url.is_empty() => Some(Repository {
            url: url.clone(),
            directory: None,
        }),
        Value::Object(map) => Some(Repository {
            url: map.get("url").and_then(Value::as_str)?.to_string(),
            directory: map.get("directory").and_then(Value::as_str).map(String::from),
        }),
        _ => None,
    }
}

// An array of keywords, or a single comma/space separated string
fn keywords_of(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        Value::String(s) => s
            .split([',', ' '])
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

// `deprecated` is a message, or occasionally `false`
fn deprecation_message(value: &Value) -> Option<String> {
    match value {
        Value::String(message) if !message.is_empty() => Some(message.clone()),
        Value::Bool(true) => Some("deprecated".to_string()),
        _ => None,
    }
}
