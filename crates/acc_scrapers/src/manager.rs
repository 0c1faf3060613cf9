use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use chrono::{Datelike, Utc};
use rand::Rng;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{error, info, warn};
use acc_core::{
    ContentStorage, CrawlStats, Fetcher, InferenceModel, PageContent, SavedContent, SearchProvider,
};
use acc_inference::ContentAnalyzer;
use crate::dedup::{DomainQuota, DuplicateDetector, DEFAULT_MAX_PER_DOMAIN};
use crate::html::parse_page;
use crate::search::search_with_fallback;
use crate::urls::{is_likely_content_domain, normalize_url};

/// Scraped result pages are noisy; only this many links go to the model.
const UNCURATED_RANK_LIMIT: usize = 20;
/// Links kept by the content-domain heuristic when the model cannot help.
const HEURISTIC_LINK_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlLimits {
    pub max_content: usize,
    pub max_pages: usize,
    pub max_per_domain: usize,
    /// Upper bound of the random pause between steps. Zero disables it.
    pub max_delay: Duration,
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            max_content: 15,
            max_pages: 50,
            max_per_domain: DEFAULT_MAX_PER_DOMAIN,
            max_delay: Duration::from_millis(1000),
        }
    }
}

/// Queries every run starts with, leaning towards recent material.
pub fn seed_queries(query: &str, year: i32) -> Vec<String> {
    vec![
        query.to_string(),
        format!("latest {} {}", query, year),
        format!("{} recent developments", query),
        format!("{} recent research", query),
        format!("{} updated {}", query, year),
    ]
}

/// Follow-ups once something has been found.
pub fn deeper_queries(query: &str) -> Vec<String> {
    vec![
        format!("{} key insights", query),
        format!("important information about {}", query),
        format!("{} complete guide", query),
        format!("what you need to know about {}", query),
    ]
}

/// Follow-ups when nothing has been found yet.
pub fn broader_queries(query: &str) -> Vec<String> {
    vec![
        format!("{} overview", query),
        format!("introduction to {}", query),
        format!("basics of {}", query),
        format!("{} for beginners", query),
    ]
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub query: String,
    pub stats: CrawlStats,
    pub domain_counts: BTreeMap<String, usize>,
    pub saved: Vec<SavedContent>,
}

impl CrawlReport {
    /// Saved items by relevance, then items with a known publication date
    /// before those without.
    pub fn ranked_content(&self) -> Vec<&SavedContent> {
        let mut ranked: Vec<&SavedContent> = self.saved.iter().collect();
        ranked.sort_by_key(|item| (Reverse(item.relevance_score.unwrap_or(0)), !item.has_known_date()));
        ranked
    }

    /// Domains by number of accepted items, most first.
    pub fn domain_distribution(&self) -> Vec<(&str, usize)> {
        let mut domains: Vec<(&str, usize)> = self
            .domain_counts
            .iter()
            .map(|(domain, count)| (domain.as_str(), *count))
            .collect();
        domains.sort_by_key(|(_, count)| Reverse(*count));
        domains
    }
}

/// Whole milliseconds in `delay`, saturating at `u64::MAX`.
fn delay_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

/// Mutable state of one run.
struct CrawlState {
    search_queue: VecDeque<String>,
    url_queue: VecDeque<String>,
    query_history: HashSet<String>,
    visited: HashSet<String>,
    seen_normalized: HashSet<String>,
    stats: CrawlStats,
    detector: DuplicateDetector,
    quota: DomainQuota,
    saved: Vec<SavedContent>,
}

impl CrawlState {
    fn new(seeds: Vec<String>, max_per_domain: usize) -> Self {
        Self {
            query_history: seeds.iter().cloned().collect(),
            search_queue: seeds.into(),
            url_queue: VecDeque::new(),
            visited: HashSet::new(),
            seen_normalized: HashSet::new(),
            stats: CrawlStats::default(),
            detector: DuplicateDetector::new(),
            quota: DomainQuota::new(max_per_domain),
            saved: Vec::new(),
        }
    }

    fn queue_search(&mut self, query: String) -> bool {
        let query = query.trim().to_string();
        if query.is_empty() || !self.query_history.insert(query.clone()) {
            return false;
        }
        self.search_queue.push_back(query);
        true
    }

    fn queue_search_result(&mut self, url: String) {
        if !self.visited.contains(&url) && !self.url_queue.contains(&url) {
            self.url_queue.push_back(url);
        }
    }

    fn queue_follow_link(&mut self, url: String) {
        if !self.seen_normalized.contains(&normalize_url(&url)) && !self.url_queue.contains(&url) {
            self.url_queue.push_back(url);
        }
    }
}

/// Drives one crawl: searches, visits pages, asks the model about them and
/// stores what it accepts.
pub struct CrawlManager {
    fetcher: Arc<dyn Fetcher>,
    providers: Vec<Arc<dyn SearchProvider>>,
    analyzer: ContentAnalyzer,
    storage: Arc<dyn ContentStorage>,
    limits: CrawlLimits,
}

impl fmt::Debug for CrawlManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlManager")
            .field("query", &self.analyzer.query())
            .field("providers", &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("analyzer", &self.analyzer)
            .field("limits", &self.limits)
            .finish()
    }
}

impl CrawlManager {
    pub fn new(
        query: impl Into<String>,
        fetcher: Arc<dyn Fetcher>,
        providers: Vec<Arc<dyn SearchProvider>>,
        model: Arc<dyn InferenceModel>,
        storage: Arc<dyn ContentStorage>,
    ) -> Self {
        Self {
            analyzer: ContentAnalyzer::new(model, query),
            fetcher,
            providers,
            storage,
            limits: CrawlLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: CrawlLimits) -> Self {
        self.limits = limits;
        self
    }

    fn limits_reached(&self, state: &CrawlState) -> bool {
        state.stats.pages_visited >= self.limits.max_pages
            || state.stats.content_found >= self.limits.max_content
    }

    pub async fn run(&self) -> CrawlReport {
        let query = self.analyzer.query();
        let seeds = seed_queries(query, Utc::now().year());
        let mut state = CrawlState::new(seeds, self.limits.max_per_domain);
        info!("🚀 Searching for content about: {}", query);

        while !self.limits_reached(&state)
            && (!state.search_queue.is_empty() || !state.url_queue.is_empty())
        {
            if let Some(url) = state.url_queue.pop_front() {
                self.visit(&mut state, url).await;
            } else if let Some(next) = state.search_queue.pop_front() {
                self.search(&mut state, &next).await;
            }

            if self.limits_reached(&state) {
                break;
            }

            if state.search_queue.is_empty() && state.url_queue.is_empty() {
                self.refill_searches(&mut state);
            }

            self.polite_delay().await;
        }

        info!(
            "🏁 Crawl finished: {} pages visited, {} items saved",
            state.stats.pages_visited, state.stats.content_found
        );
        CrawlReport {
            query: query.to_string(),
            stats: state.stats,
            domain_counts: state.quota.counts().clone(),
            saved: state.saved,
        }
    }

    fn refill_searches(&self, state: &mut CrawlState) {
        let variants = if state.stats.content_found > 0 {
            info!("🔄 Generating more search queries...");
            deeper_queries(self.analyzer.query())
        } else {
            info!("🔄 Trying broader search queries...");
            broader_queries(self.analyzer.query())
        };
        for query in variants {
            state.queue_search(query);
        }
    }

    async fn polite_delay(&self) {
        let max = delay_millis(self.limits.max_delay);
        if max == 0 {
            return;
        }
        let wait = rand::thread_rng().gen_range(max / 2..=max);
        sleep(Duration::from_millis(wait)).await;
    }

    async fn search(&self, state: &mut CrawlState, query: &str) {
        info!("🔍 Processing search query: {}", query);
        state.stats.search_queries_used += 1;

        let Some(hit) = search_with_fallback(&self.providers, query).await else {
            warn!("No search results for: {}", query);
            return;
        };

        let mut candidates = hit.urls();
        if !hit.curated {
            candidates.truncate(UNCURATED_RANK_LIMIT);
        }

        let urls = match self.analyzer.rank_links(&candidates).await {
            Ok(ranked) => {
                info!("🤖 AI ranked {} URLs from {} results", ranked.len(), hit.provider);
                ranked
            }
            Err(e) if hit.curated => {
                error!("Error ranking search results, using them as-is: {}", e);
                candidates
            }
            Err(e) => {
                error!("Error ranking search results, keeping known content sites: {}", e);
                candidates
                    .into_iter()
                    .filter(|url| is_likely_content_domain(url))
                    .take(HEURISTIC_LINK_LIMIT)
                    .collect()
            }
        };

        for url in urls {
            state.queue_search_result(url);
        }
    }

    async fn visit(&self, state: &mut CrawlState, url: String) {
        let normalized = normalize_url(&url);
        if state.seen_normalized.contains(&normalized) {
            info!("Skipping duplicate URL: {}", url);
            state.stats.duplicates_skipped += 1;
            return;
        }
        if !state.quota.allows(&url) {
            info!(
                "Skipping due to domain quota ({}/{}): {}",
                state.quota.count(&url),
                state.quota.max_per_domain(),
                url
            );
            state.stats.domain_quota_exceeded += 1;
            return;
        }

        state.seen_normalized.insert(normalized);
        state.visited.insert(url.clone());
        state.stats.pages_visited += 1;
        info!("🌐 Visiting potential content page: {}", url);

        let html = match self.fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                error!("Error fetching {}: {}", url, e);
                state.stats.errors += 1;
                return;
            }
        };
        let page = parse_page(&url, &html);

        let verdict = match self.analyzer.judge_relevance(&page).await {
            Ok(verdict) => verdict,
            Err(e) => {
                error!("Error checking if {} has relevant content: {}", url, e);
                state.stats.errors += 1;
                return;
            }
        };
        if !verdict.relevant {
            return;
        }
        info!("✅ Found relevant content: {}", url);

        let record = match self.analyzer.extract_content(&page).await {
            Ok(record) => record,
            Err(e) => {
                error!("Error processing content at {}: {}", url, e);
                state.stats.errors += 1;
                return;
            }
        };

        if let Some(similarity) = state.detector.check(&record) {
            info!("Skipping similar content ({:?}): {}", similarity, url);
            state.stats.similar_content_skipped += 1;
            return;
        }

        match self.storage.store_content(&record).await {
            Ok(location) => {
                state.stats.content_found += 1;
                state.quota.record(&url);
                state.detector.remember(&record);
                state.saved.push(SavedContent::from_record(&record, location));
                info!(
                    "📊 Progress: {}/{} content items found",
                    state.stats.content_found, self.limits.max_content
                );

                if state.stats.content_found >= self.limits.max_content {
                    return;
                }
                match self
                    .analyzer
                    .related_search_terms(&record, &state.quota.overrepresented())
                    .await
                {
                    Ok(terms) => {
                        let added = terms.into_iter().filter(|t| state.queue_search(t.clone())).count();
                        info!("🧭 Queued {} related search terms", added);
                    }
                    Err(e) => error!("Error generating related search terms: {}", e),
                }
            }
            Err(e) => {
                error!("Error saving content for {}: {}", url, e);
                state.stats.errors += 1;
            }
        }

        for link in self.follow_links(&page).await {
            state.queue_follow_link(link);
        }
    }

    async fn follow_links(&self, page: &PageContent) -> Vec<String> {
        if page.links.is_empty() {
            return Vec::new();
        }
        let links = match self.analyzer.pick_follow_links(&page.links).await {
            Ok(Some(links)) => links,
            Ok(None) => page
                .links
                .iter()
                .take(HEURISTIC_LINK_LIMIT)
                .filter(|link| is_likely_content_domain(link))
                .cloned()
                .collect(),
            Err(e) => {
                error!("Error finding more links on {}: {}", page.url, e);
                Vec::new()
            }
        };
        info!("Found {} potentially relevant links on page", links.len());
        links
    }
}
