use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fetched page after HTML parsing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageContent {
    pub url: String,
    pub title: String,
    pub text: String,
    pub published_at: Option<String>,
    pub authors: Vec<String>,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: Option<String>,
    pub snippet: Option<String>,
}

impl SearchResult {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            snippet: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

/// One accepted piece of content, written to storage as a single JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub date_published: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub full_text: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    /// 1 (barely related) to 10 (exactly on topic and recent).
    #[serde(default)]
    pub relevance_score: Option<u8>,
    pub search_query: String,
    pub scraped_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_ai_analysis: Option<String>,
}

impl ContentRecord {
    pub fn new(url: impl Into<String>, title: impl Into<String>, search_query: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            date_published: None,
            summary: None,
            key_points: Vec::new(),
            full_text: None,
            author: None,
            content_type: None,
            categories: Vec::new(),
            relevance_score: None,
            search_query: search_query.into(),
            scraped_at: Utc::now(),
            raw_ai_analysis: None,
        }
    }
}

/// Values an LLM uses when it could not determine a field.
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value.is_empty()
        || matches!(
            value.as_str(),
            "unknown" | "unknown date" | "not found" | "n/a" | "none" | "null"
        )
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    pub search_queries_used: usize,
    pub pages_visited: usize,
    pub content_found: usize,
    pub errors: usize,
    pub duplicates_skipped: usize,
    pub similar_content_skipped: usize,
    pub domain_quota_exceeded: usize,
}

/// Where an accepted record ended up, kept for the end-of-run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedContent {
    pub title: String,
    pub url: String,
    pub location: String,
    pub date_published: Option<String>,
    pub relevance_score: Option<u8>,
}

impl SavedContent {
    pub fn from_record(record: &ContentRecord, location: impl Into<String>) -> Self {
        Self {
            title: record.title.clone(),
            url: record.url.clone(),
            location: location.into(),
            date_published: record.date_published.clone(),
            relevance_score: record.relevance_score,
        }
    }

    /// True when the publication date is present and not a placeholder.
    pub fn has_known_date(&self) -> bool {
        self.date_published
            .as_deref()
            .map(|d| !is_placeholder(d))
            .unwrap_or(false)
    }
}
