//! pkglens.toml parsing and validation

use std::collections::BTreeMap;
use std::time::Duration;

use camino::Utf8Path;
use pkglens_core::{Error, ResourceKind, TtlPolicy};
use serde::{Deserialize, Serialize};

use crate::ConfigResult;

/// Complete pkglens.toml configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PkglensToml {
    /// Backing store settings
    pub cache: CacheSection,

    /// Per-kind TTL overrides in seconds, keyed by kind name
    pub ttl: BTreeMap<String, u64>,

    /// Upstream services
    pub origins: OriginsSection,

    /// Cache warming defaults
    pub warm: WarmSection,
}

/// Backing store section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Redis URL; the in-process memory backend is used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,

    /// Upper bound on a single store operation
    pub operation_timeout_ms: u64,
}

/// Upstream services section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginsSection {
    pub registry_url: String,
    pub downloads_url: String,
    pub bundle_url: String,
    pub score_url: String,
    pub osv_url: String,
    pub github_url: String,

    /// GitHub API token, raises the anonymous rate limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,

    /// Per-request timeout
    pub timeout_secs: u64,

    pub user_agent: String,
}

/// Cache warming section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmSection {
    /// Size of the most-popular list to warm
    pub top_packages: usize,

    /// Packages always warmed
    pub packages: Vec<String>,

    /// Packages warmed concurrently
    pub concurrency: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            redis_url: None,
            operation_timeout_ms: 500,
        }
    }
}

impl Default for OriginsSection {
    fn default() -> Self {
        Self {
            registry_url: "https://registry.npmjs.org".to_string(),
            downloads_url: "https://api.npmjs.org".to_string(),
            bundle_url: "https://bundlephobia.com".to_string(),
            score_url: "https://api.npms.io".to_string(),
            osv_url: "https://api.osv.dev".to_string(),
            github_url: "https://api.github.com".to_string(),
            github_token: None,
            timeout_secs: 10,
            user_agent: concat!("pkglens/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for WarmSection {
    fn default() -> Self {
        Self {
            top_packages: 0,
            packages: Vec::new(),
            concurrency: 8,
        }
    }
}

impl PkglensToml {
    /// TTL table with the configured overrides applied
    pub fn ttl_policy(&self) -> ConfigResult<TtlPolicy> {
        let overrides = self
            .ttl
            .iter()
            .map(|(name, secs)| {
                let kind = name.parse::<ResourceKind>().map_err(|_| Error::ConfigValidation {
                    field: format!("ttl.{name}"),
                    reason: "unknown resource kind".to_string(),
                })?;
                Ok((kind, *secs))
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        TtlPolicy::with_overrides(overrides)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.cache.operation_timeout_ms)
    }

    pub fn origin_timeout(&self) -> Duration {
        Duration::from_secs(self.origins.timeout_secs)
    }
}

/// Parse TOML string to PkglensToml configuration and validate it
pub fn parse_pkglens_toml(content: &str) -> ConfigResult<PkglensToml> {
    let config = read_pkglens_toml(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn read_pkglens_toml(content: &str) -> ConfigResult<PkglensToml> {
    ::toml::from_str(content).map_err(|e| Error::ConfigParse {
        path: crate::CONFIG_FILE_NAME.to_string(),
        message: e.to_string(),
    })
}

/// Serialize PkglensToml to TOML string
pub fn serialize_pkglens_toml(config: &PkglensToml) -> ConfigResult<String> {
    ::toml::to_string_pretty(config).map_err(|e| Error::ConfigParse {
        path: crate::CONFIG_FILE_NAME.to_string(),
        message: format!("TOML serialization error: {e}"),
    })
}

/// Validate configuration values
pub fn validate_config(config: &PkglensToml) -> ConfigResult<()> {
    if config.cache.operation_timeout_ms == 0 {
        return Err(invalid("cache.operation_timeout_ms", "timeout must be greater than zero"));
    }

    if let Some(redis_url) = &config.cache.redis_url {
        validate_url("cache.redis_url", redis_url, &["redis", "rediss", "unix"])?;
    }

    // Unknown kinds and zero TTLs
    config.ttl_policy()?;

    let origins = &config.origins;
    for (field, value) in [
        ("origins.registry_url", &origins.registry_url),
        ("origins.downloads_url", &origins.downloads_url),
        ("origins.bundle_url", &origins.bundle_url),
        ("origins.score_url", &origins.score_url),
        ("origins.osv_url", &origins.osv_url),
        ("origins.github_url", &origins.github_url),
    ] {
        validate_url(field, value, &["http", "https"])?;
    }

    if origins.timeout_secs == 0 {
        return Err(invalid("origins.timeout_secs", "timeout must be greater than zero"));
    }

    if origins.user_agent.trim().is_empty() {
        return Err(invalid("origins.user_agent", "user agent must not be empty"));
    }

    if config.warm.concurrency == 0 {
        return Err(invalid("warm.concurrency", "concurrency must be at least 1"));
    }

    Ok(())
}

/// Load and parse pkglens.toml from file path.
///
/// Only the syntax is checked here. Values are validated after environment
/// overrides are layered on, see `ConfigLayering::merge_configs`.
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<PkglensToml> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::io(format!("Failed to read {path}"), e))?;

    read_pkglens_toml(&content).map_err(|e| match e {
        Error::ConfigParse { message, .. } => Error::ConfigParse {
            path: path.to_string(),
            message,
        },
        other => other,
    })
}

fn validate_url(field: &str, value: &str, schemes: &[&str]) -> ConfigResult<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| invalid(field, format!("'{value}' is not a valid URL: {e}")))?;

    if !schemes.contains(&parsed.scheme()) {
        return Err(invalid(
            field,
            format!("scheme '{}' is not one of {}", parsed.scheme(), schemes.join(", ")),
        ));
    }

    Ok(())
}

fn invalid(field: &str, reason: impl Into<String>) -> Error {
    Error::ConfigValidation {
        field: field.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = parse_pkglens_toml("").unwrap();

        assert_eq!(config, PkglensToml::default());
        assert!(config.cache.redis_url.is_none());
        assert_eq!(config.operation_timeout(), Duration::from_millis(500));
        assert_eq!(config.origins.registry_url, "https://registry.npmjs.org");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[cache]
redis_url = "redis://127.0.0.1:6379"
operation_timeout_ms = 250

[ttl]
readme = 600
bundle_size = 172800

[origins]
registry_url = "https://npm.internal.example.com"
github_token = "ghp_example"
timeout_secs = 5

[warm]
top_packages = 50
packages = ["react", "lodash"]
"#;

        let config = parse_pkglens_toml(toml).unwrap();
        assert_eq!(config.cache.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
        assert_eq!(config.operation_timeout(), Duration::from_millis(250));
        assert_eq!(config.origins.github_token.as_deref(), Some("ghp_example"));
        assert_eq!(config.origin_timeout(), Duration::from_secs(5));
        // Unset origins keep their defaults
        assert_eq!(config.origins.osv_url, "https://api.osv.dev");
        assert_eq!(config.warm.packages, vec!["react", "lodash"]);

        let policy = config.ttl_policy().unwrap();
        assert_eq!(policy.ttl_secs(ResourceKind::Readme), 600);
        assert_eq!(policy.ttl_secs(ResourceKind::BundleSize), 172800);
        assert_eq!(policy.ttl_secs(ResourceKind::Manifest), 3600);
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let result = parse_pkglens_toml("[ttl]\nscore = 0\n");
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }

    #[test]
    fn test_unknown_ttl_kind_rejected() {
        match parse_pkglens_toml("[ttl]\ntarball = 60\n") {
            Err(Error::ConfigValidation { field, .. }) => assert_eq!(field, "ttl.tarball"),
            other => panic!("Expected ConfigValidation, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        assert!(parse_pkglens_toml("[cache]\noperation_timeout_ms = 0\n").is_err());
        assert!(parse_pkglens_toml("[origins]\ntimeout_secs = 0\n").is_err());
    }

    #[test]
    fn test_malformed_urls_rejected() {
        assert!(parse_pkglens_toml("[origins]\nregistry_url = \"not a url\"\n").is_err());
        assert!(parse_pkglens_toml("[origins]\nosv_url = \"ftp://api.osv.dev\"\n").is_err());
        assert!(parse_pkglens_toml("[cache]\nredis_url = \"http://localhost:6379\"\n").is_err());
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        let result = parse_pkglens_toml("[cache\nredis_url = ");
        assert!(matches!(result, Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_serialize_round_trips() {
        let mut config = PkglensToml::default();
        config.ttl.insert("search".to_string(), 900);

        let text = serialize_pkglens_toml(&config).unwrap();
        assert_eq!(parse_pkglens_toml(&text).unwrap(), config);
    }
}
