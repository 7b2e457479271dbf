//! Security advisories from the vulnerability database.

use serde::{Deserialize, Serialize};

/// Known advisories affecting a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityAdvisories {
    pub advisories: Vec<Advisory>,
}

/// A single advisory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub id: String,
    pub summary: Option<String>,
    pub aliases: Vec<String>,
    pub severity: Severity,
    pub published: Option<String>,
    /// Versions in which the issue is fixed
    pub fixed_in: Vec<String>,
}

/// Severity as reported by the database, `Unknown` when absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Unknown,
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    /// Parse the free-form severity labels used by advisory sources
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Severity::Low,
            "moderate" | "medium" => Severity::Moderate,
            "high" => Severity::High,
            "critical" => Severity::Critical,
            _ => Severity::Unknown,
        }
    }
}

impl SecurityAdvisories {
    /// An empty advisory list
    pub fn none() -> Self {
        Self {
            advisories: Vec::new(),
        }
    }

    /// Highest severity among all advisories
    pub fn max_severity(&self) -> Option<Severity> {
        self.advisories.iter().map(|a| a.severity).max()
    }

    pub fn is_empty(&self) -> bool {
        self.advisories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advisory(id: &str, severity: Severity) -> Advisory {
        Advisory {
            id: id.to_string(),
            summary: None,
            aliases: Vec::new(),
            severity,
            published: None,
            fixed_in: Vec::new(),
        }
    }

    #[test]
    fn test_severity_labels() {
        assert_eq!(Severity::from_label("MEDIUM"), Severity::Moderate);
        assert_eq!(Severity::from_label("critical"), Severity::Critical);
        assert_eq!(Severity::from_label(""), Severity::Unknown);
    }

    #[test]
    fn test_max_severity() {
        let list = SecurityAdvisories {
            advisories: vec![
                advisory("GHSA-1", Severity::Low),
                advisory("GHSA-2", Severity::High),
                advisory("GHSA-3", Severity::Unknown),
            ],
        };
        assert_eq!(list.max_severity(), Some(Severity::High));
        assert_eq!(SecurityAdvisories::none().max_severity(), None);
    }
}
