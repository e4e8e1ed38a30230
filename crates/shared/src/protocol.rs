//! Wire shapes of the npms.io search endpoint.

use serde::{Deserialize, Serialize};

use crate::domain::PackageSummary;

pub const DEFAULT_SEARCH_URL: &str = "https://api.npms.io";
pub const DEFAULT_PAGE_SIZE: u32 = 25;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub total: Option<u64>,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub package: PackageDocument,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDocument {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub links: PackageLinks,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npm: Option<String>,
}

impl From<PackageDocument> for PackageSummary {
    fn from(value: PackageDocument) -> Self {
        Self {
            name: value.name,
            version: value.version,
            description: value.description,
            npm_url: value.links.npm,
        }
    }
}

impl SearchResponse {
    pub fn into_packages(self) -> Vec<PackageSummary> {
        self.results
            .into_iter()
            .map(|result| result.package.into())
            .collect()
    }
}
