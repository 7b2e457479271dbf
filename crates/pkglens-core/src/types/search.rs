//! Search results and the top-packages list.

use serde::{Deserialize, Serialize};

/// One page of search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub total: u64,
    pub hits: Vec<SearchHit>,
}

/// A package matched by a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub score: f64,
}

/// Most popular packages, most popular first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPackages {
    pub packages: Vec<SearchHit>,
}

impl SearchResults {
    /// The neutral result returned for queries too short to search
    pub fn empty() -> Self {
        Self {
            total: 0,
            hits: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

impl TopPackages {
    /// Package names in rank order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(|hit| hit.name.as_str())
    }
}
