//! HTTP clients for the upstream metadata services
//!
//! One pooled `reqwest` client serves every origin. Each fetch maps an HTTP
//! 404 to `Error::NotFound` and any other failure to `Error::OriginUnavailable`.
//! Nothing is retried: a failed fetch is reported to the caller as is.

use std::time::Duration;

use pkglens_core::types::{
    BundleSize, PackageManifest, PackageScore, Readme, RepositoryStars, SearchResults,
    SecurityAdvisories, TopPackages, VersionHistory, WeeklyDownloads,
};
use pkglens_core::{Error, Result};
use reqwest::{Client, ClientBuilder, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::{
    BundleSizeResponse, DownloadsPointResponse, GithubRepoResponse, NpmsPackageResponse,
    OsvQueryResponse, PackumentResponse, SearchResponse,
};

/// Number of hits requested per search page
pub const SEARCH_PAGE_SIZE: usize = 20;

/// Base URLs and credentials of the upstream services
#[derive(Debug, Clone)]
pub struct OriginConfig {
    pub registry_url: String,
    pub downloads_url: String,
    pub bundle_url: String,
    pub score_url: String,
    pub osv_url: String,
    pub github_url: String,
    /// Bearer token for the GitHub API
    pub github_token: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            registry_url: "https://registry.npmjs.org".to_string(),
            downloads_url: "https://api.npmjs.org".to_string(),
            bundle_url: "https://bundlephobia.com".to_string(),
            score_url: "https://api.npms.io".to_string(),
            osv_url: "https://api.osv.dev".to_string(),
            github_url: "https://api.github.com".to_string(),
            github_token: None,
            timeout: Duration::from_secs(10),
            user_agent: concat!("pkglens/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl OriginConfig {
    /// Point every origin at `base_url`, for tests against a mock server
    pub fn single_host(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            registry_url: base_url.clone(),
            downloads_url: base_url.clone(),
            bundle_url: base_url.clone(),
            score_url: base_url.clone(),
            osv_url: base_url.clone(),
            github_url: base_url,
            ..Self::default()
        }
    }
}

/// Client for every upstream metadata service
#[derive(Debug, Clone)]
pub struct OriginClient {
    /// Underlying HTTP client with connection pooling
    client: Client,
    config: OriginConfig,
}

impl OriginClient {
    /// Create a client with the default upstream URLs
    pub fn new() -> Result<Self> {
        Self::with_config(OriginConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: OriginConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            // Connection pooling configuration
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.timeout)
            .gzip(true)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::origin("Failed to create HTTP client", e))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OriginConfig {
        &self.config
    }

    /// Registry manifest of `name`
    pub async fn fetch_manifest(&self, name: &str) -> Result<PackageManifest> {
        Ok(self.fetch_packument(name).await?.into_manifest())
    }

    /// Readme of `name`; a package without readme text is `NotFound`
    pub async fn fetch_readme(&self, name: &str) -> Result<Readme> {
        self.fetch_packument(name)
            .await?
            .into_readme()
            .ok_or_else(|| Error::NotFound {
                resource: format!("readme of {name}"),
            })
    }

    /// Every published version of `name`, newest first
    pub async fn fetch_versions(&self, name: &str) -> Result<VersionHistory> {
        Ok(self.fetch_packument(name).await?.into_version_history())
    }

    /// Download count of `name` over the last week
    pub async fn fetch_weekly_downloads(&self, name: &str) -> Result<WeeklyDownloads> {
        let url = format!(
            "{}/downloads/point/last-week/{}",
            self.config.downloads_url,
            encode_package_name(name)
        );
        let response: DownloadsPointResponse = self.get_json(self.client.get(&url), name).await?;
        Ok(response.into())
    }

    /// Bundle size of the latest version of `name`
    pub async fn fetch_bundle_size(&self, name: &str) -> Result<BundleSize> {
        let url = format!("{}/api/size", self.config.bundle_url);
        let request = self.client.get(&url).query(&[("package", name)]);
        let response: BundleSizeResponse = self.get_json(request, name).await?;
        Ok(response.into())
    }

    /// Quality score of `name`
    pub async fn fetch_score(&self, name: &str) -> Result<PackageScore> {
        let url = format!(
            "{}/v2/package/{}",
            self.config.score_url,
            encode_package_name(name)
        );
        let response: NpmsPackageResponse = self.get_json(self.client.get(&url), name).await?;
        Ok(response.into())
    }

    /// Known advisories affecting any version of `name`
    pub async fn fetch_advisories(&self, name: &str) -> Result<SecurityAdvisories> {
        let url = format!("{}/v1/query", self.config.osv_url);
        let body = serde_json::json!({
            "package": { "name": name, "ecosystem": "npm" }
        });
        let response: OsvQueryResponse = self.get_json(self.client.post(&url).json(&body), name).await?;
        Ok(response.into())
    }

    /// Star counts of the GitHub repository `owner/repo`
    pub async fn fetch_github_stars(&self, owner: &str, repo: &str) -> Result<RepositoryStars> {
        check_github_segment("owner", owner)?;
        check_github_segment("repo", repo)?;
        let url = format!("{}/repos/{}/{}", self.config.github_url, owner, repo);
        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.config.github_token {
            request = request.bearer_auth(token);
        }

        let resource = format!("{owner}/{repo}");
        let response: GithubRepoResponse = self.get_json(request, &resource).await?;
        Ok(response.into_stars(owner, repo))
    }

    /// First page of registry search results for `query`
    pub async fn search(&self, query: &str) -> Result<SearchResults> {
        let url = format!("{}/-/v1/search", self.config.registry_url);
        let size = SEARCH_PAGE_SIZE.to_string();
        let request = self
            .client
            .get(&url)
            .query(&[("text", query), ("size", size.as_str())]);
        let response: SearchResponse = self.get_json(request, query).await?;
        Ok(response.into())
    }

    /// The `limit` most popular packages
    pub async fn fetch_top_packages(&self, limit: usize) -> Result<TopPackages> {
        let url = format!("{}/-/v1/search", self.config.registry_url);
        let size = limit.to_string();
        let request = self.client.get(&url).query(&[
            ("text", "not:unstable"),
            ("popularity", "1.0"),
            ("quality", "0.0"),
            ("maintenance", "0.0"),
            ("size", size.as_str()),
        ]);
        let response: SearchResponse = self.get_json(request, "top packages").await?;
        Ok(response.into())
    }

    async fn fetch_packument(&self, name: &str) -> Result<PackumentResponse> {
        let url = format!(
            "{}/{}",
            self.config.registry_url,
            encode_package_name(name)
        );
        let request = self.client.get(&url).header("Accept", "application/json");
        self.get_json(request, name).await
    }

    /// Send `request` and parse a JSON body, mapping 404 to `NotFound`
    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder, resource: &str) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::origin(format!("Request for {resource} failed"), e))?;

        let url = response.url().clone();
        match response.status() {
            status if status.is_success() => {
                debug!("{} {}", status, url);
                response
                    .json::<T>()
                    .await
                    .map_err(|e| Error::origin(format!("Malformed response from {url}"), e))
            },
            StatusCode::NOT_FOUND => Err(Error::NotFound {
                resource: resource.to_string(),
            }),
            status => Err(Error::OriginUnavailable {
                message: format!("{url} returned status {status}"),
                source: None,
            }),
        }
    }
}

/// Encode package name for URL (handle scoped packages)
fn encode_package_name(name: &str) -> String {
    if name.starts_with('@') {
        // Scoped package: @org/pkg → @org%2fpkg
        name.replace('/', "%2f")
    } else {
        name.to_string()
    }
}

/// GitHub owner and repository names only use ASCII letters, digits, `-`, `_`
/// and `.`, so anything else would escape the `/repos/{owner}/{repo}` path
fn check_github_segment(field: &str, segment: &str) -> Result<()> {
    let valid_chars = segment
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if segment.is_empty() || segment == "." || segment == ".." || !valid_chars {
        return Err(Error::invalid_input(
            field,
            format!("'{segment}' is not a valid GitHub name"),
        ));
    }
    Ok(())
}
