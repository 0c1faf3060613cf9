//! Search providers that turn a query into candidate URLs.
//!
//! The Custom Search JSON API is preferred when credentials are configured;
//! scraping a public results page is the fallback.

use std::env;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};
use acc_core::{Fetcher, Result, SearchProvider, SearchResult};

pub mod google_cse;
pub mod results_page;

pub use google_cse::GoogleCustomSearch;
pub use results_page::ResultsPageSearch;

/// Terms that ask for fresh content.
const RECENCY_TERMS: &[&str] = &["latest", "recent", "new", "today", "current"];

#[derive(Clone, Default)]
pub struct SearchConfig {
    pub cse_api_key: Option<String>,
    pub cse_id: Option<String>,
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("cse_api_key", &self.cse_api_key.as_ref().map(|_| "<redacted>"))
            .field("cse_id", &self.cse_id)
            .finish()
    }
}

impl SearchConfig {
    /// Reads `GOOGLE_CSE_API_KEY` and `GOOGLE_CSE_ID`.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            cse_api_key: non_empty("GOOGLE_CSE_API_KEY"),
            cse_id: non_empty("GOOGLE_CSE_ID"),
        }
    }

    pub fn has_custom_search(&self) -> bool {
        self.cse_api_key.is_some() && self.cse_id.is_some()
    }
}

/// Providers in the order they should be tried.
pub fn default_providers(
    config: &SearchConfig,
    fetcher: Arc<dyn Fetcher>,
) -> Result<Vec<Arc<dyn SearchProvider>>> {
    let mut providers: Vec<Arc<dyn SearchProvider>> = Vec::new();
    match (&config.cse_api_key, &config.cse_id) {
        (Some(key), Some(id)) => providers.push(Arc::new(GoogleCustomSearch::new(key, id)?)),
        _ => warn!("GOOGLE_CSE_API_KEY or GOOGLE_CSE_ID not set, using results page search only"),
    }
    providers.push(Arc::new(ResultsPageSearch::new(fetcher)));
    Ok(providers)
}

/// Results of the first provider that found anything.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub provider: String,
    pub curated: bool,
    pub results: Vec<SearchResult>,
}

impl SearchHit {
    pub fn urls(&self) -> Vec<String> {
        self.results.iter().map(|r| r.url.clone()).collect()
    }
}

/// Try each provider in turn. A failing provider is logged and skipped.
pub async fn search_with_fallback(
    providers: &[Arc<dyn SearchProvider>],
    query: &str,
) -> Option<SearchHit> {
    for provider in providers {
        match provider.search(query).await {
            Ok(results) if !results.is_empty() => {
                info!("🔎 {} found {} results for '{}'", provider.name(), results.len(), query);
                return Some(SearchHit {
                    provider: provider.name().to_string(),
                    curated: provider.curated(),
                    results,
                });
            }
            Ok(_) => {
                warn!("{} found no results for '{}'", provider.name(), query);
            }
            Err(e) => {
                warn!("{} failed for '{}': {}", provider.name(), query, e);
            }
        }
    }
    None
}

/// Whether a query asks for recent material. Whole words only, so "newton"
/// does not count as "new".
pub fn mentions_recency(query: &str, current_year: i32) -> bool {
    let this_year = current_year.to_string();
    let last_year = (current_year - 1).to_string();
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| RECENCY_TERMS.contains(&word) || word == this_year || word == last_year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use acc_core::Error;

    struct StaticProvider {
        name: &'static str,
        curated: bool,
        results: Result<Vec<SearchResult>>,
    }

    #[async_trait]
    impl SearchProvider for StaticProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn curated(&self) -> bool {
            self.curated
        }

        async fn search(&self, _query: &str) -> Result<Vec<SearchResult>> {
            match &self.results {
                Ok(results) => Ok(results.clone()),
                Err(e) => Err(Error::Search(e.to_string())),
            }
        }
    }

    #[test]
    fn test_mentions_recency() {
        assert!(mentions_recency("latest rust release", 2025));
        assert!(mentions_recency("Rust updated 2025", 2025));
        assert!(mentions_recency("rust in 2024", 2025));
        assert!(mentions_recency("What's NEW in tokio?", 2025));
        assert!(!mentions_recency("rust in 2019", 2025));
        assert!(!mentions_recency("newton's laws", 2025));
    }

    #[tokio::test]
    async fn test_search_falls_through_failures_and_empty_results() {
        let providers: Vec<Arc<dyn SearchProvider>> = vec![
            Arc::new(StaticProvider {
                name: "broken",
                curated: true,
                results: Err(Error::Search("quota".to_string())),
            }),
            Arc::new(StaticProvider {
                name: "empty",
                curated: true,
                results: Ok(vec![]),
            }),
            Arc::new(StaticProvider {
                name: "scraped",
                curated: false,
                results: Ok(vec![SearchResult::new("https://a.com")]),
            }),
        ];

        let hit = search_with_fallback(&providers, "rust").await.unwrap();
        assert_eq!(hit.provider, "scraped");
        assert!(!hit.curated);
        assert_eq!(hit.urls(), vec!["https://a.com"]);
    }

    #[tokio::test]
    async fn test_search_with_no_results() {
        let providers: Vec<Arc<dyn SearchProvider>> = vec![Arc::new(StaticProvider {
            name: "empty",
            curated: true,
            results: Ok(vec![]),
        })];
        assert_eq!(search_with_fallback(&providers, "rust").await, None);
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let config = SearchConfig {
            cse_api_key: Some("very-secret".to_string()),
            cse_id: Some("engine".to_string()),
        };
        assert!(config.has_custom_search());
        assert!(!format!("{:?}", config).contains("very-secret"));
        assert!(!SearchConfig::default().has_custom_search());
    }
}
