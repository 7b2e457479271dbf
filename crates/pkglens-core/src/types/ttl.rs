//! Per-resource-kind freshness windows.

use std::collections::BTreeMap;
use std::time::Duration;

use super::ResourceKind;
use crate::error::{Error, Result};

/// Static lookup from resource kind to TTL.
///
/// Built once at startup, either from the compiled-in defaults or from
/// defaults plus configured overrides. Every kind always has exactly one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    overrides: BTreeMap<ResourceKind, u64>,
}

impl TtlPolicy {
    /// Policy using the compiled-in defaults only
    pub fn new() -> Self {
        Self {
            overrides: BTreeMap::new(),
        }
    }

    /// Policy with overrides applied on top of the defaults
    pub fn with_overrides<I>(overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ResourceKind, u64)>,
    {
        let mut policy = Self::new();
        for (kind, secs) in overrides {
            if secs == 0 {
                return Err(Error::ConfigValidation {
                    field: format!("ttl.{kind}"),
                    reason: "TTL must be at least one second".to_string(),
                });
            }
            policy.overrides.insert(kind, secs);
        }
        Ok(policy)
    }

    /// TTL in whole seconds, as passed to `SET key value EX ttl`
    pub fn ttl_secs(&self, kind: ResourceKind) -> u64 {
        self.overrides
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_ttl_secs())
    }

    /// TTL as a duration
    pub fn ttl(&self, kind: ResourceKind) -> Duration {
        Duration::from_secs(self.ttl_secs(kind))
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl_secs(ResourceKind::Manifest), 3600);
        assert_eq!(policy.ttl_secs(ResourceKind::Readme), 7200);
        assert_eq!(policy.ttl_secs(ResourceKind::Downloads), 1800);
        assert_eq!(policy.ttl_secs(ResourceKind::BundleSize), 86400);
        assert_eq!(policy.ttl_secs(ResourceKind::Score), 86400);
        assert_eq!(policy.ttl_secs(ResourceKind::Versions), 3600);
        assert_eq!(policy.ttl_secs(ResourceKind::Security), 43200);
        assert_eq!(policy.ttl_secs(ResourceKind::GithubStars), 3600);
        assert_eq!(policy.ttl_secs(ResourceKind::Search), 1800);
        assert_eq!(policy.ttl_secs(ResourceKind::TopPackages), 3600);
    }

    #[test]
    fn test_override_applies_to_one_kind() {
        let policy = TtlPolicy::with_overrides([(ResourceKind::Downloads, 600)]).unwrap();
        assert_eq!(policy.ttl_secs(ResourceKind::Downloads), 600);
        assert_eq!(policy.ttl(ResourceKind::Downloads), Duration::from_secs(600));
        assert_eq!(policy.ttl_secs(ResourceKind::Manifest), 3600);
    }

    #[test]
    fn test_zero_override_rejected() {
        let result = TtlPolicy::with_overrides([(ResourceKind::Score, 0)]);
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }
}
