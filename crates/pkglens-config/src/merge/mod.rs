//! Configuration file discovery and environment overrides

use std::collections::HashMap;
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use pkglens_core::Error;
use tracing::debug;

use crate::toml::{load_from_file, validate_config, PkglensToml};
use crate::{ConfigResult, CONFIG_FILE_NAME};

/// Prefix of every environment variable pkglens reads
pub const ENV_PREFIX: &str = "PKGLENS_";

/// Main configuration loading interface
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

/// Environment layering on top of a loaded file
#[derive(Debug, Default)]
pub struct ConfigLayering;

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// File passed explicitly
    Explicit(Utf8PathBuf),
    /// pkglens.toml in the working directory or one of its parents
    Project(Utf8PathBuf),
    /// Per-user config file
    Global(Utf8PathBuf),
    /// No file found, compiled-in defaults
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit(path)
            | ConfigSource::Project(path)
            | ConfigSource::Global(path) => write!(f, "{path}"),
            ConfigSource::Defaults => f.write_str("built-in defaults"),
        }
    }
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    /// Loader rooted at the process working directory
    pub fn from_current_dir() -> ConfigResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::io("Failed to read current directory", e))?;
        let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| Error::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("Working directory is not valid UTF-8: {e}"),
        })?;
        Ok(Self::new(cwd))
    }

    /// Load the configuration file.
    ///
    /// An explicit path must exist. Otherwise the project file is searched
    /// for, then the per-user file, then defaults are used.
    pub async fn load(&self, explicit: Option<&Utf8Path>) -> ConfigResult<(PkglensToml, ConfigSource)> {
        if let Some(path) = explicit {
            let config = load_from_file(path).await?;
            return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
        }

        if let Some(path) = self.resolve_config_path(CONFIG_FILE_NAME) {
            let config = load_from_file(&path).await?;
            return Ok((config, ConfigSource::Project(path)));
        }

        if let Some(path) = global_config_path().filter(|p| p.exists()) {
            let config = load_from_file(&path).await?;
            return Ok((config, ConfigSource::Global(path)));
        }

        debug!("No {} found, using defaults", CONFIG_FILE_NAME);
        Ok((PkglensToml::default(), ConfigSource::Defaults))
    }

    /// Find configuration file in project (walks up directory tree)
    pub fn resolve_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        let mut current = Some(self.cwd.as_path());

        while let Some(dir) = current {
            let config_path = dir.join(filename);
            if config_path.is_file() {
                return Some(config_path);
            }
            current = dir.parent();
        }

        None
    }
}

/// `<config dir>/pkglens/pkglens.toml`, e.g. `~/.config/pkglens/pkglens.toml`
pub fn global_config_path() -> Option<Utf8PathBuf> {
    let dir = dirs::config_dir()?;
    let dir = Utf8PathBuf::try_from(dir).ok()?;
    Some(dir.join("pkglens").join(CONFIG_FILE_NAME))
}

impl ConfigLayering {
    /// Apply environment overrides to a loaded file and validate the result
    pub fn merge_configs(
        file_config: PkglensToml,
        env_overrides: &HashMap<String, String>,
    ) -> ConfigResult<PkglensToml> {
        let mut merged = file_config;
        Self::apply_env_overrides(&mut merged, env_overrides)?;
        validate_config(&merged)?;
        Ok(merged)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(
        config: &mut PkglensToml,
        overrides: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "PKGLENS_REDIS_URL" => {
                    config.cache.redis_url = Some(value.clone()).filter(|v| !v.is_empty());
                },
                "PKGLENS_GITHUB_TOKEN" => {
                    config.origins.github_token = Some(value.clone()).filter(|v| !v.is_empty());
                },
                "PKGLENS_REGISTRY_URL" => {
                    config.origins.registry_url = value.clone();
                },
                "PKGLENS_OPERATION_TIMEOUT_MS" => {
                    config.cache.operation_timeout_ms = parse_number(key, value)?;
                },
                key if key.starts_with("PKGLENS_TTL_") => {
                    let kind = key.trim_start_matches("PKGLENS_TTL_").to_lowercase();
                    config.ttl.insert(kind, parse_number(key, value)?);
                },
                _ => {
                    // Unknown environment variable, ignore
                },
            }
        }

        Ok(())
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}

fn parse_number(key: &str, value: &str) -> ConfigResult<u64> {
    value.trim().parse().map_err(|e| Error::ConfigValidation {
        field: key.to_string(),
        reason: format!("'{value}' is not a whole number: {e}"),
    })
}
