use std::fmt;
use std::time::Duration;
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};
use acc_core::{Error, Result, SearchProvider, SearchResult};
use super::mentions_recency;

pub const CSE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);
const RECENT_WINDOW: &str = "m1";
/// Below this many date-restricted results the search is repeated unrestricted.
const MIN_RECENT_RESULTS: usize = 3;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
    error: Option<CseError>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    link: String,
    title: Option<String>,
    snippet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CseError {
    message: Option<String>,
}

/// Google Programmable Search (Custom Search JSON API).
pub struct GoogleCustomSearch {
    client: Client,
    api_key: String,
    engine_id: String,
    endpoint: String,
    min_interval: Duration,
    limiter: Option<DefaultRateLimiter>,
}

impl fmt::Debug for GoogleCustomSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleCustomSearch")
            .field("api_key", &"<redacted>")
            .field("engine_id", &self.engine_id)
            .field("endpoint", &self.endpoint)
            .field("min_interval", &self.min_interval)
            .finish()
    }
}

impl GoogleCustomSearch {
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            endpoint: CSE_ENDPOINT.to_string(),
            min_interval: MIN_REQUEST_INTERVAL,
            limiter: Quota::with_period(MIN_REQUEST_INTERVAL).map(RateLimiter::direct),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Spacing between API calls. Zero disables it.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self.limiter = Quota::with_period(interval).map(RateLimiter::direct);
        self
    }

    async fn request(&self, query: &str, date_restrict: Option<&str>) -> Result<Vec<SearchResult>> {
        if let Some(limiter) = &self.limiter {
            if limiter.check().is_err() {
                debug!("Rate limiting Search API");
                limiter.until_ready().await;
            }
        }

        let mut params = vec![
            ("key", self.api_key.as_str()),
            ("cx", self.engine_id.as_str()),
            ("q", query),
            ("num", "10"),
            ("sort", "date"),
        ];
        if let Some(window) = date_restrict {
            params.push(("dateRestrict", window));
        }

        let response = self.client.get(&self.endpoint).query(&params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        match parse_response(&body) {
            Err(e) => Err(e),
            Ok(_) if !status.is_success() => Err(Error::HttpStatus {
                url: self.endpoint.clone(),
                status: status.as_u16(),
            }),
            Ok(results) => Ok(results),
        }
    }
}

/// Results of one API response. An API-level error object becomes
/// `Error::Search` carrying its message.
fn parse_response(body: &str) -> Result<Vec<SearchResult>> {
    let response: CseResponse = serde_json::from_str(body)?;
    if let Some(error) = response.error {
        let message = error.message.unwrap_or_else(|| "unknown error".to_string());
        return Err(Error::Search(format!("Google Custom Search API error: {}", message)));
    }

    Ok(response
        .items
        .into_iter()
        .map(|item| {
            if let Some(snippet) = item.snippet.as_deref() {
                debug!("Result: {} - {}", item.title.as_deref().unwrap_or_default(), snippet);
            }
            let mut result = SearchResult::new(item.link);
            if let Some(title) = item.title {
                result = result.with_title(title);
            }
            if let Some(snippet) = item.snippet {
                result = result.with_snippet(snippet);
            }
            result
        })
        .collect())
}

fn merge_unseen(results: &mut Vec<SearchResult>, more: Vec<SearchResult>) {
    for result in more {
        if !results.iter().any(|r| r.url == result.url) {
            results.push(result);
        }
    }
}

#[async_trait]
impl SearchProvider for GoogleCustomSearch {
    fn name(&self) -> &str {
        "Google Custom Search"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let date_restrict = mentions_recency(query, Utc::now().year()).then_some(RECENT_WINDOW);

        info!("Google Custom Search API: Searching for '{}'", query);
        if let Some(window) = date_restrict {
            info!("Date restricted to: {}", window);
        }

        let mut results = self.request(query, date_restrict).await?;
        info!("Google Custom Search API: Found {} results", results.len());

        if date_restrict.is_some() && results.len() < MIN_RECENT_RESULTS {
            info!("Few results with date restriction, trying without restriction");
            match self.request(query, None).await {
                Ok(more) => {
                    merge_unseen(&mut results, more);
                    info!("Additional search: Found {} total results", results.len());
                }
                Err(e) if results.is_empty() => return Err(e),
                Err(e) => warn!("Unrestricted search failed: {}", e),
            }
        }

        Ok(results)
    }
}
