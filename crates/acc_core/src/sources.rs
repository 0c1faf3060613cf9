use async_trait::async_trait;
use crate::types::SearchResult;
use crate::Result;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a URL and return the response body as text
    async fn fetch(&self, url: &str) -> Result<String>;
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Whether results are good enough to use without AI ranking.
    /// API-backed providers are; scraped result pages are not.
    fn curated(&self) -> bool {
        true
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}
