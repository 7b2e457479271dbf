//! Configuration loading for pkglens
//!
//! This crate parses and validates `pkglens.toml`, finds it by walking up from
//! the working directory, and layers `PKGLENS_*` environment overrides on top.

pub mod merge;
pub mod toml;

// Re-export main types
pub use crate::merge::{ConfigLayering, ConfigLoader, ConfigSource};
pub use crate::toml::{CacheSection, OriginsSection, PkglensToml, WarmSection};

use pkglens_core::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, Error>;

/// File name searched for in the working directory and its parents
pub const CONFIG_FILE_NAME: &str = "pkglens.toml";
