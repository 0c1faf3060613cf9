use std::sync::Arc;
use async_trait::async_trait;
use tracing::info;
use url::Url;
use acc_core::{Error, Fetcher, Result, SearchProvider, SearchResult};
use crate::html::extract_links;

pub const RESULTS_PAGE_URL: &str = "https://www.google.com/search";

/// Paths and hosts of the search engine's own pages.
const ENGINE_PAGE_MARKERS: &[&str] = &[
    "/search?",
    "webcache",
    "/preferences",
    "accounts.google",
    "maps.google",
    "policies.google",
];

/// Scrapes a public search results page. Its links are noisy, so it is not
/// curated and the crawler ranks them before use.
pub struct ResultsPageSearch {
    fetcher: Arc<dyn Fetcher>,
    base_url: String,
}

impl ResultsPageSearch {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            base_url: RESULTS_PAGE_URL.to_string(),
        }
    }

    pub fn search_url(&self, query: &str) -> Result<String> {
        Url::parse_with_params(&self.base_url, &[("q", query)])
            .map(String::from)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", self.base_url, e)))
    }
}

/// The target of a `/url?q=<target>` redirect, or the link itself.
fn unwrap_redirect(link: &str) -> String {
    let Ok(url) = Url::parse(link) else {
        return link.to_string();
    };
    let is_redirect = url.host_str().is_some_and(|h| h.contains("google.")) && url.path() == "/url";
    if !is_redirect {
        return link.to_string();
    }
    url.query_pairs()
        .find(|(name, _)| name == "q" || name == "url")
        .map(|(_, target)| target.into_owned())
        .filter(|target| target.starts_with("http://") || target.starts_with("https://"))
        .unwrap_or_else(|| link.to_string())
}

fn is_engine_page(link: &str) -> bool {
    link.contains("google.com") && ENGINE_PAGE_MARKERS.iter().any(|marker| link.contains(marker))
}

#[async_trait]
impl SearchProvider for ResultsPageSearch {
    fn name(&self) -> &str {
        "Results page search"
    }

    fn curated(&self) -> bool {
        false
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let search_url = self.search_url(query)?;
        info!("Fallback searching for: {}", query);
        info!("Search URL: {}", search_url);

        let html = self.fetcher.fetch(&search_url).await?;
        let mut urls: Vec<String> = Vec::new();
        for link in extract_links(&search_url, &html)? {
            let link = unwrap_redirect(&link);
            if is_engine_page(&link) || urls.contains(&link) {
                continue;
            }
            urls.push(link);
        }
        Ok(urls.into_iter().map(SearchResult::new).collect())
    }
}
