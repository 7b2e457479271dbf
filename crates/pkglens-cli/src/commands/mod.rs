//! Command implementations and dispatch logic.
//!
//! Every lookup command resolves through the shared [`PackageLens`], so the
//! cache-aside rules are the same here as for any other caller.

use std::sync::Arc;

use camino::Utf8Path;
use pkglens_cache::{CacheBackend, CacheService, MemoryBackend, RedisBackend};
use pkglens_config::{ConfigLayering, ConfigLoader, ConfigSource, PkglensToml};
use pkglens_core::resource::{
    BundleSize, Downloads, GithubStars, Manifest, Readme, Score, Search, Security, TopPackages,
    Versions,
};
use pkglens_core::types::parse_github_repo;
use pkglens_core::{Error, ResourceKind, Result};
use pkglens_registry::{warm, OriginClient, OriginConfig, PackageLens, WarmOptions};
use serde::Serialize;
use tracing::info;

use crate::output::OutputHandler;
use crate::Commands;


/// Shared context for all commands
#[derive(Debug)]
pub struct CommandContext {
    pub config: PkglensToml,
    pub source: ConfigSource,
    pub lens: PackageLens,
    pub output: OutputHandler,
}

impl CommandContext {
    /// Load configuration and wire the cache and origin clients
    pub async fn new(config_path: Option<&Utf8Path>) -> Result<Self> {
        let loader = ConfigLoader::from_current_dir()?;
        let (file_config, source) = loader.load(config_path).await?;
        let config =
            ConfigLayering::merge_configs(file_config, &ConfigLayering::collect_env_overrides())?;

        Self::from_config(config, source)
    }

    pub fn from_config(config: PkglensToml, source: ConfigSource) -> Result<Self> {
        let cache = CacheService::new(build_backend(&config)?, config.ttl_policy()?);
        let origin = OriginClient::with_config(origin_config(&config))?;
        info!("Using {} cache, configuration from {}", cache.backend_name(), source);

        Ok(Self {
            config,
            source,
            lens: PackageLens::new(cache, origin),
            output: OutputHandler::new(),
        })
    }
}

/// Redis when a URL is configured, process memory otherwise
pub fn build_backend(config: &PkglensToml) -> Result<Arc<dyn CacheBackend>> {
    match &config.cache.redis_url {
        Some(url) => Ok(Arc::new(RedisBackend::open(url, config.operation_timeout())?)),
        None => Ok(Arc::new(MemoryBackend::new())),
    }
}

pub fn origin_config(config: &PkglensToml) -> OriginConfig {
    let origins = &config.origins;
    OriginConfig {
        registry_url: origins.registry_url.trim_end_matches('/').to_string(),
        downloads_url: origins.downloads_url.trim_end_matches('/').to_string(),
        bundle_url: origins.bundle_url.trim_end_matches('/').to_string(),
        score_url: origins.score_url.trim_end_matches('/').to_string(),
        osv_url: origins.osv_url.trim_end_matches('/').to_string(),
        github_url: origins.github_url.trim_end_matches('/').to_string(),
        github_token: origins.github_token.clone(),
        timeout: config.origin_timeout(),
        user_agent: origins.user_agent.clone(),
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> Result<()> {
    let lens = &ctx.lens;
    match command {
        Commands::Manifest { name } => print_found(ctx, &name, lens.manifest(&name).await?),
        Commands::Readme { name } => print_found(ctx, &name, lens.readme(&name).await?),
        Commands::Downloads { name } => {
            print_found(ctx, &name, lens.weekly_downloads(&name).await?)
        },
        Commands::BundleSize { name } => print_found(ctx, &name, lens.bundle_size(&name).await?),
        Commands::Score { name } => print_found(ctx, &name, lens.score(&name).await?),
        Commands::Versions { name } => print_found(ctx, &name, lens.versions(&name).await?),
        Commands::Advisories { name } => print_found(ctx, &name, lens.advisories(&name).await?),
        Commands::Stars { target } => stars(ctx, &target).await,
        Commands::Search { query } => {
            let query = query.join(" ");
            ctx.output.json(&lens.search(&query).await?)
        },
        Commands::Top { limit } => {
            print_found(ctx, "top packages", lens.top_packages(limit).await?)
        },
        Commands::Warm {
            packages,
            top,
            concurrency,
            refresh,
        } => {
            let options = WarmOptions {
                packages: if packages.is_empty() {
                    ctx.config.warm.packages.clone()
                } else {
                    packages
                },
                top_packages: top.unwrap_or(ctx.config.warm.top_packages),
                concurrency: concurrency.unwrap_or(ctx.config.warm.concurrency),
                refresh,
            };
            warm_cache(ctx, &options).await
        },
        Commands::Invalidate { kind, params } => invalidate(ctx, kind, &params).await,
        Commands::Check => check_config(ctx),
    }
}

/// Print `value`, or fail with `NotFound` when upstream has no such resource
fn print_found<T: Serialize>(ctx: &CommandContext, resource: &str, value: Option<T>) -> Result<()> {
    match value {
        Some(value) => ctx.output.json(&value),
        None => Err(Error::NotFound {
            resource: resource.to_string(),
        }),
    }
}

/// `owner/repo`, a GitHub URL, or a package name whose manifest names a repository
async fn stars(ctx: &CommandContext, target: &str) -> Result<()> {
    let stars = match github_target(target) {
        Some((owner, repo)) => ctx.lens.github_stars(&owner, &repo).await?,
        None => {
            let manifest = ctx.lens.manifest(target).await?.ok_or_else(|| Error::NotFound {
                resource: target.to_string(),
            })?;
            ctx.lens.github_stars_for(&manifest).await?
        },
    };
    print_found(ctx, &format!("GitHub repository of {target}"), stars)
}

fn github_target(target: &str) -> Option<(String, String)> {
    // Scoped package names look like `owner/repo` too
    if target.starts_with('@') {
        return None;
    }
    parse_github_repo(target)
}

async fn warm_cache(ctx: &CommandContext, options: &WarmOptions) -> Result<()> {
    if options.packages.is_empty() && options.top_packages == 0 {
        return Err(Error::invalid_input(
            "warm",
            "name packages to warm or pass --top (or set [warm] in pkglens.toml)",
        ));
    }

    let report = warm(&ctx.lens, options).await;
    ctx.output.json(&report)?;

    if report.is_complete() {
        ctx.output.success(&format!("Warmed {} packages", report.warmed.len()));
    } else {
        ctx.output.warn(&format!(
            "Warmed {} packages, {} failed",
            report.warmed.len(),
            report.failed.len()
        ));
    }
    Ok(())
}

async fn invalidate(ctx: &CommandContext, kind: ResourceKind, params: &[String]) -> Result<()> {
    let params: Vec<&str> = params.iter().map(String::as_str).collect();
    let lens = &ctx.lens;

    match kind {
        ResourceKind::Manifest => lens.invalidate::<Manifest>(&params).await?,
        ResourceKind::Readme => lens.invalidate::<Readme>(&params).await?,
        ResourceKind::Downloads => lens.invalidate::<Downloads>(&params).await?,
        ResourceKind::BundleSize => lens.invalidate::<BundleSize>(&params).await?,
        ResourceKind::Score => lens.invalidate::<Score>(&params).await?,
        ResourceKind::Versions => lens.invalidate::<Versions>(&params).await?,
        ResourceKind::Security => lens.invalidate::<Security>(&params).await?,
        ResourceKind::GithubStars => lens.invalidate::<GithubStars>(&params).await?,
        ResourceKind::Search => lens.invalidate::<Search>(&params).await?,
        ResourceKind::TopPackages => lens.invalidate::<TopPackages>(&params).await?,
    }

    ctx.output
        .success(&format!("Invalidated {} entry for {}", kind, params.join(" ")));
    Ok(())
}

/// Report the effective configuration; loading it already validated it
#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    source: String,
    backend: &'static str,
    ttl_secs: Vec<(ResourceKind, u64)>,
    config: &'a PkglensToml,
}

fn check_config(ctx: &CommandContext) -> Result<()> {
    let cache = ctx.lens.cache();
    let policy = cache.ttl_policy();

    let mut redacted = ctx.config.clone();
    if redacted.origins.github_token.is_some() {
        redacted.origins.github_token = Some("<redacted>".to_string());
    }

    let report = CheckReport {
        source: ctx.source.to_string(),
        backend: cache.backend_name(),
        ttl_secs: ResourceKind::ALL
            .into_iter()
            .map(|kind| (kind, policy.ttl_secs(kind)))
            .collect(),
        config: &redacted,
    };
    ctx.output.json(&report)?;
    ctx.output.success("Configuration is valid");
    Ok(())
}
