use std::fmt;
use std::sync::Arc;
use serde_json::Value;
use tracing::{debug, info, warn};
use acc_core::{is_placeholder, ContentRecord, Error, InferenceModel, PageContent, Result};
use crate::prompts::{self, FOLLOW_LINK_LIMIT};
use crate::reply::{clean_keys, is_unparsed, parse_json_reply, score_field, string_field, string_list};

/// The model's answer to "is this page worth keeping?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelevanceVerdict {
    pub relevant: bool,
    pub reasoning: String,
}

/// Every crawl decision that needs the model, bound to one user query.
pub struct ContentAnalyzer {
    model: Arc<dyn InferenceModel>,
    query: String,
}

impl fmt::Debug for ContentAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentAnalyzer")
            .field("model", &self.model.name())
            .field("query", &self.query)
            .finish()
    }
}

impl ContentAnalyzer {
    pub fn new(model: Arc<dyn InferenceModel>, query: impl Into<String>) -> Self {
        Self {
            model,
            query: query.into(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Order search result links by likely relevance and recency.
    pub async fn rank_links(&self, links: &[String]) -> Result<Vec<String>> {
        if links.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self.model.generate(&prompts::rank_links(&self.query, links)).await?;
        let value = parse_json_reply(&reply);

        let ranked = value
            .get("relevant_links")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::Inference("Ranking reply has no relevant_links list".to_string()))?;

        let ranked: Vec<String> = ranked
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        debug!("Model ranked {} of {} links as relevant", ranked.len(), links.len());
        Ok(ranked)
    }

    pub async fn judge_relevance(&self, page: &PageContent) -> Result<RelevanceVerdict> {
        let reply = self.model.generate(&prompts::judge_relevance(&self.query, page)).await?;
        let reasoning = reply.trim().to_string();
        let lowered = reasoning.to_lowercase();
        let relevant = lowered.starts_with("yes");

        info!("🤖 AI relevance check for {}: {}", page.url, first_line(&reasoning));
        if !relevant && (lowered.contains("outdated") || lowered.contains("old")) {
            info!("📅 Content rejected due to age: {}", page.url);
        }

        Ok(RelevanceVerdict { relevant, reasoning })
    }

    /// Summarise a relevant page into a record. Never fails on a malformed
    /// reply: the raw text is kept on a record built from the page itself.
    pub async fn extract_content(&self, page: &PageContent) -> Result<ContentRecord> {
        let reply = self.model.generate(&prompts::extract_content(&self.query, page)).await?;
        let value = clean_keys(parse_json_reply(&reply));

        if !value.is_object() || is_unparsed(&value) {
            warn!("Could not parse extracted content for {}, keeping raw reply", page.url);
            let mut record = self.record_from_page(page);
            record.raw_ai_analysis = Some(reply);
            return Ok(record);
        }

        Ok(self.record_from_reply(page, &value))
    }

    fn record_from_page(&self, page: &PageContent) -> ContentRecord {
        let mut record = ContentRecord::new(&page.url, &page.title, &self.query);
        record.date_published = page.published_at.clone();
        record.author = page_authors(page);
        record.full_text = Some(page.text.clone());
        record
    }

    fn record_from_reply(&self, page: &PageContent, value: &Value) -> ContentRecord {
        let known = |key: &str| string_field(value, key).filter(|v| !is_placeholder(v));

        let title = known("title").unwrap_or_else(|| page.title.clone());
        let mut record = ContentRecord::new(&page.url, title, &self.query);

        record.date_published = match known("date_published") {
            Some(date) => Some(date),
            None => {
                if page.published_at.is_some() {
                    debug!("Using metadata date for {}", page.url);
                }
                page.published_at.clone()
            }
        };
        record.summary = known("summary");
        record.key_points = string_list(value, "key_points");
        record.author = known("author").or_else(|| page_authors(page));
        record.content_type = known("content_type");
        record.categories = string_list(value, "categories");
        record.relevance_score = score_field(value, "relevance_score");
        record.full_text = known("full_text").or_else(|| Some(page.text.clone()));
        record
    }

    /// Follow-up queries steering the crawl away from domains we already have
    /// enough of. An unusable reply yields no queries.
    pub async fn related_search_terms(
        &self,
        record: &ContentRecord,
        overrepresented: &[String],
    ) -> Result<Vec<String>> {
        let prompt = prompts::related_search_terms(&self.query, record, overrepresented);
        let reply = self.model.generate(&prompt).await?;

        match parse_json_reply(&reply) {
            Value::Array(items) => Ok(items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()),
            _ => {
                warn!("Related search terms reply was not a list");
                Ok(Vec::new())
            }
        }
    }

    /// Which outgoing links are worth visiting. `None` when the reply is not
    /// a list of URLs.
    pub async fn pick_follow_links(&self, links: &[String]) -> Result<Option<Vec<String>>> {
        if links.is_empty() {
            return Ok(Some(Vec::new()));
        }
        let candidates = &links[..links.len().min(FOLLOW_LINK_LIMIT)];
        let reply = self
            .model
            .generate(&prompts::pick_follow_links(&self.query, candidates))
            .await?;

        match parse_json_reply(&reply) {
            Value::Array(items) => Ok(Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| s.starts_with("http://") || s.starts_with("https://"))
                    .map(str::to_string)
                    .collect(),
            )),
            _ => Ok(None),
        }
    }
}

fn page_authors(page: &PageContent) -> Option<String> {
    (!page.authors.is_empty()).then(|| page.authors.join(", "))
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedModel {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                ..Default::default()
            })
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl InferenceModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    fn page() -> PageContent {
        PageContent {
            url: "https://blog.example.com/rust-async".to_string(),
            title: "Async Rust".to_string(),
            text: "Async Rust is about futures and executors.".to_string(),
            published_at: Some("2024-03-01".to_string()),
            authors: vec!["Ferris".to_string()],
            links: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_judge_relevance() {
        let model = ScriptedModel::replying("  Yes. It covers async Rust in depth.");
        let analyzer = ContentAnalyzer::new(model.clone(), "async rust");
        let verdict = analyzer.judge_relevance(&page()).await.unwrap();
        assert!(verdict.relevant);
        assert!(verdict.reasoning.starts_with("Yes."));
        assert!(model.last_prompt().contains("async rust"));

        let analyzer = ContentAnalyzer::new(ScriptedModel::replying("NO, outdated."), "async rust");
        assert!(!analyzer.judge_relevance(&page()).await.unwrap().relevant);

        let analyzer = ContentAnalyzer::new(ScriptedModel::replying("Not really, yes-ish"), "q");
        assert!(!analyzer.judge_relevance(&page()).await.unwrap().relevant);
    }

    #[tokio::test]
    async fn test_rank_links() {
        let reply = r#"```json
{"relevant_links": ["https://b.com", "https://a.com"], "irrelevant_links": ["https://c.com"]}
```"#;
        let analyzer = ContentAnalyzer::new(ScriptedModel::replying(reply), "q");
        let links = vec!["https://a.com".to_string(), "https://b.com".to_string(), "https://c.com".to_string()];
        assert_eq!(
            analyzer.rank_links(&links).await.unwrap(),
            vec!["https://b.com", "https://a.com"]
        );

        let analyzer = ContentAnalyzer::new(ScriptedModel::replying("I can't rank these."), "q");
        assert!(analyzer.rank_links(&links).await.is_err());
    }

    #[tokio::test]
    async fn test_extract_content_reads_fields_leniently() {
        let reply = r#"{
            "1. title": "Async Rust in 2024",
            "2. summary": "A tour of async.",
            "3. key_points": ["Futures are lazy", "Executors poll"],
            "4. date_published": "Unknown",
            "5. author": ["Ferris", "Crab"],
            "6. content_type": "blog post",
            "7. categories": "- rust\n- async",
            "8. relevance_score": "9/10"
        }"#;
        let analyzer = ContentAnalyzer::new(ScriptedModel::replying(reply), "async rust");
        let record = analyzer.extract_content(&page()).await.unwrap();

        assert_eq!(record.title, "Async Rust in 2024");
        assert_eq!(record.summary.as_deref(), Some("A tour of async."));
        assert_eq!(record.key_points.len(), 2);
        assert_eq!(record.date_published.as_deref(), Some("2024-03-01"));
        assert_eq!(record.author.as_deref(), Some("Ferris, Crab"));
        assert_eq!(record.categories, vec!["rust", "async"]);
        assert_eq!(record.relevance_score, Some(9));
        assert_eq!(record.full_text.as_deref(), Some("Async Rust is about futures and executors."));
        assert_eq!(record.search_query, "async rust");
        assert!(record.raw_ai_analysis.is_none());
    }

    #[tokio::test]
    async fn test_extract_content_keeps_raw_reply() {
        let analyzer = ContentAnalyzer::new(ScriptedModel::replying("Sorry, this page is a login form."), "q");
        let record = analyzer.extract_content(&page()).await.unwrap();

        assert_eq!(record.title, "Async Rust");
        assert_eq!(record.author.as_deref(), Some("Ferris"));
        assert_eq!(record.relevance_score, None);
        assert_eq!(record.raw_ai_analysis.as_deref(), Some("Sorry, this page is a login form."));
    }

    #[tokio::test]
    async fn test_extract_content_truncates_long_pages() {
        let model = ScriptedModel::replying(r#"{"title": "T"}"#);
        let analyzer = ContentAnalyzer::new(model.clone(), "q");
        let mut long = page();
        long.text = "y".repeat(20_000);
        analyzer.extract_content(&long).await.unwrap();

        let prompt = model.last_prompt();
        assert!(prompt.starts_with("Extract the key information"));
        assert!(prompt.contains(&format!("{}...", "y".repeat(10_000))));
        assert!(!prompt.contains(&"y".repeat(10_001)));
    }

    #[tokio::test]
    async fn test_related_search_terms() {
        let model = ScriptedModel::replying(r#"["tokio tutorial", " ", "async traits"]"#);
        let analyzer = ContentAnalyzer::new(model.clone(), "async rust");
        let record = ContentRecord::new("https://a.com", "A", "async rust");
        let terms = analyzer
            .related_search_terms(&record, &["a.com".to_string()])
            .await
            .unwrap();
        assert_eq!(terms, vec!["tokio tutorial", "async traits"]);
        assert!(model.last_prompt().contains("a.com"));

        let analyzer = ContentAnalyzer::new(ScriptedModel::replying(r#"{"queries": []}"#), "q");
        assert!(analyzer.related_search_terms(&record, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pick_follow_links() {
        let model = ScriptedModel::replying(r#"["https://a.com/next", "not a url"]"#);
        let analyzer = ContentAnalyzer::new(model.clone(), "q");
        let links: Vec<String> = (0..40).map(|i| format!("https://a.com/{}", i)).collect();

        let picked = analyzer.pick_follow_links(&links).await.unwrap();
        assert_eq!(picked, Some(vec!["https://a.com/next".to_string()]));
        let prompt = model.last_prompt();
        assert!(prompt.contains("https://a.com/29\""));
        assert!(!prompt.contains("https://a.com/30\""));

        let analyzer = ContentAnalyzer::new(ScriptedModel::replying("These look good."), "q");
        assert_eq!(analyzer.pick_follow_links(&links).await.unwrap(), None);
    }
}
