//! Cache key naming scheme.
//!
//! Keys have the shape `<kind-namespace>:<param>[:<param>...]` and are a pure
//! function of the resource kind and its identifying parameters.

use std::fmt;

use super::ResourceKind;
use crate::error::{Error, Result};

/// Deterministic cache key for one resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key for `kind` identified by `params`.
    ///
    /// Fails with `InvalidInput` when no parameter is given or any parameter is
    /// blank. Free-text kinds are normalized first, see [`normalize_query`].
    pub fn build(kind: ResourceKind, params: &[&str]) -> Result<Self> {
        if params.is_empty() {
            return Err(Error::invalid_input(
                kind.as_str(),
                "at least one identifying parameter is required",
            ));
        }

        let mut key = String::from(kind.namespace());
        for param in params {
            let segment = if kind.is_free_text() {
                normalize_query(param)
            } else {
                param.trim().to_string()
            };

            if segment.is_empty() {
                return Err(Error::invalid_input(
                    kind.as_str(),
                    "identifying parameter must not be empty",
                ));
            }

            key.push(':');
            push_escaped(&mut key, &segment);
        }

        Ok(Self(key))
    }

    /// The key as stored in the backing store
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize free-text search input: trim, lowercase and collapse whitespace
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

// Separators inside a parameter would let two different parameter lists
// produce the same key.
fn push_escaped(out: &mut String, segment: &str) {
    for c in segment.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            c => out.push(c),
        }
    }
}
