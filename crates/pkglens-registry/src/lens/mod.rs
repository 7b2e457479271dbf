//! Cached accessors for every resource kind.
//!
//! [`PackageLens`] pairs the [`CacheService`] with an [`OriginClient`]. Each
//! accessor names its resource marker and hands the resolver a fetch closure
//! owning everything it needs, so a shared fetch can outlive the caller that
//! started it.

use pkglens_cache::{CacheService, CacheStats};
use pkglens_core::resource::{
    BundleSize, Downloads, GithubStars, Manifest, Readme, Score, Search, Security, TopPackages,
    Versions,
};
use pkglens_core::types::{self, PackageManifest, SearchResults};
use pkglens_core::{Resource, Result};
use tracing::debug;

use crate::client::OriginClient;

/// Cache-aside view of upstream package metadata.
///
/// `Ok(None)` from an accessor means the upstream service reported the
/// resource as nonexistent.
#[derive(Debug, Clone)]
pub struct PackageLens {
    cache: CacheService,
    origin: OriginClient,
}

impl PackageLens {
    pub fn new(cache: CacheService, origin: OriginClient) -> Self {
        Self { cache, origin }
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    pub fn origin(&self) -> &OriginClient {
        &self.origin
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub async fn manifest(&self, name: &str) -> Result<Option<PackageManifest>> {
        let origin = self.origin.clone();
        let owned = name.to_string();
        self.cache
            .resolve::<Manifest, _, _>(&[name], move || async move {
                origin.fetch_manifest(&owned).await
            })
            .await
    }

    pub async fn readme(&self, name: &str) -> Result<Option<types::Readme>> {
        let origin = self.origin.clone();
        let owned = name.to_string();
        self.cache
            .resolve::<Readme, _, _>(&[name], move || async move {
                origin.fetch_readme(&owned).await
            })
            .await
    }

    pub async fn weekly_downloads(&self, name: &str) -> Result<Option<types::WeeklyDownloads>> {
        let origin = self.origin.clone();
        let owned = name.to_string();
        self.cache
            .resolve::<Downloads, _, _>(&[name], move || async move {
                origin.fetch_weekly_downloads(&owned).await
            })
            .await
    }

    pub async fn bundle_size(&self, name: &str) -> Result<Option<types::BundleSize>> {
        let origin = self.origin.clone();
        let owned = name.to_string();
        self.cache
            .resolve::<BundleSize, _, _>(&[name], move || async move {
                origin.fetch_bundle_size(&owned).await
            })
            .await
    }

    pub async fn score(&self, name: &str) -> Result<Option<types::PackageScore>> {
        let origin = self.origin.clone();
        let owned = name.to_string();
        self.cache
            .resolve::<Score, _, _>(&[name], move || async move {
                origin.fetch_score(&owned).await
            })
            .await
    }

    pub async fn versions(&self, name: &str) -> Result<Option<types::VersionHistory>> {
        let origin = self.origin.clone();
        let owned = name.to_string();
        self.cache
            .resolve::<Versions, _, _>(&[name], move || async move {
                origin.fetch_versions(&owned).await
            })
            .await
    }

    pub async fn advisories(&self, name: &str) -> Result<Option<types::SecurityAdvisories>> {
        let origin = self.origin.clone();
        let owned = name.to_string();
        self.cache
            .resolve::<Security, _, _>(&[name], move || async move {
                origin.fetch_advisories(&owned).await
            })
            .await
    }

    pub async fn github_stars(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Option<types::RepositoryStars>> {
        let origin = self.origin.clone();
        let (owner_owned, repo_owned) = (owner.to_string(), repo.to_string());
        self.cache
            .resolve::<GithubStars, _, _>(&[owner, repo], move || async move {
                origin.fetch_github_stars(&owner_owned, &repo_owned).await
            })
            .await
    }

    /// Stars of the GitHub repository a manifest points at.
    ///
    /// `Ok(None)` when the manifest names no GitHub repository.
    pub async fn github_stars_for(
        &self,
        manifest: &PackageManifest,
    ) -> Result<Option<types::RepositoryStars>> {
        match manifest.github_repo() {
            Some((owner, repo)) => self.github_stars(&owner, &repo).await,
            None => {
                debug!("{} has no GitHub repository", manifest.name);
                Ok(None)
            },
        }
    }

    /// Search the registry; queries too short to search yield empty results
    pub async fn search(&self, query: &str) -> Result<SearchResults> {
        let origin = self.origin.clone();
        // The origin sees the same normalized text the key is built from
        let normalized = types::normalize_query(query);
        let results = self
            .cache
            .resolve::<Search, _, _>(&[query], move || async move {
                origin.search(&normalized).await
            })
            .await?;
        Ok(results.unwrap_or_else(SearchResults::empty))
    }

    pub async fn top_packages(&self, limit: usize) -> Result<Option<types::TopPackages>> {
        let origin = self.origin.clone();
        let size = limit.to_string();
        self.cache
            .resolve::<TopPackages, _, _>(&[size.as_str()], move || async move {
                origin.fetch_top_packages(limit).await
            })
            .await
    }

    /// Drop the cached entry of resource `R` so the next lookup refetches it
    pub async fn invalidate<R: Resource>(&self, params: &[&str]) -> Result<()> {
        self.cache.invalidate::<R>(params).await
    }
}
