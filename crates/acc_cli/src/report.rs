use std::fmt;
use acc_scrapers::CrawlReport;

const RULE: &str = "==================================================";

/// End-of-run summary printed on stdout.
pub struct Summary<'a>(pub &'a CrawlReport);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let stats = &report.stats;

        writeln!(f)?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "CONTENT SCRAPING SUMMARY FOR: {}", report.query)?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Pages visited: {}", stats.pages_visited)?;
        writeln!(f, "Search queries used: {}", stats.search_queries_used)?;
        writeln!(f, "Relevant content found: {}", stats.content_found)?;
        writeln!(f, "Duplicates skipped: {}", stats.duplicates_skipped)?;
        writeln!(f, "Similar content skipped: {}", stats.similar_content_skipped)?;
        writeln!(f, "Domain quota exceeded: {}", stats.domain_quota_exceeded)?;
        writeln!(f, "Errors encountered: {}", stats.errors)?;

        writeln!(f)?;
        writeln!(f, "DOMAIN DISTRIBUTION:")?;
        for (domain, count) in report.domain_distribution() {
            writeln!(f, "{}: {} items", domain, count)?;
        }

        let ranked = report.ranked_content();
        if !ranked.is_empty() {
            writeln!(f)?;
            writeln!(f, "SCRAPED CONTENT (ordered by relevance and recency):")?;
            for (i, item) in ranked.iter().enumerate() {
                writeln!(f, "{}. {}", i + 1, item.title)?;
                writeln!(f, "   URL: {}", item.url)?;
                writeln!(
                    f,
                    "   Published: {}",
                    item.date_published.as_deref().unwrap_or("Unknown date")
                )?;
                if let Some(score) = item.relevance_score {
                    writeln!(f, "   Relevance: {}/10", score)?;
                }
                writeln!(f, "   Saved to: {}", item.location)?;
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
