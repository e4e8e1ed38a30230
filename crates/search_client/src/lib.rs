//! Client for the npms.io package search endpoint.

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::PackageSummary,
    error::ApiError,
    protocol::{SearchResponse, DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_URL},
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("invalid search url: {0}")]
    Url(#[from] url::ParseError),
}

/// Anything that can answer a package query. Implemented by [`NpmsClient`]
/// and by test doubles.
#[async_trait(?Send)]
pub trait PackageSearch {
    async fn search(&self, query: &str) -> Result<Vec<PackageSummary>, SearchError>;
}

#[derive(Debug, Clone)]
pub struct NpmsClient {
    http: Client,
    base_url: Url,
    page_size: u32,
}

impl NpmsClient {
    pub fn new(base_url: &str) -> Result<Self, SearchError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn npms() -> Result<Self, SearchError> {
        Self::new(DEFAULT_SEARCH_URL)
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/v2/search?from=0&size={page_size}&q={query}`
    pub fn search_url(&self, query: &str) -> Result<Url, SearchError> {
        let mut url = self.base_url.join("v2/search")?;
        url.query_pairs_mut()
            .append_pair("from", "0")
            .append_pair("size", &self.page_size.to_string())
            .append_pair("q", query);
        Ok(url)
    }
}

#[async_trait(?Send)]
impl PackageSearch for NpmsClient {
    async fn search(&self, query: &str) -> Result<Vec<PackageSummary>, SearchError> {
        let url = self.search_url(query)?;
        debug!(%url, "searching packages");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await?;
            warn!(status = status.as_u16(), "package search rejected");
            return Err(ApiError::new(status.as_u16(), message).into());
        }
        let body: SearchResponse = response.json().await?;
        Ok(body.into_packages())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
