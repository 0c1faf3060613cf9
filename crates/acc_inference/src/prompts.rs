use acc_core::{ContentRecord, PageContent};

pub const RELEVANCE_TEXT_LIMIT: usize = 5_000;
pub const EXTRACTION_TEXT_LIMIT: usize = 10_000;
pub const FOLLOW_LINK_LIMIT: usize = 30;

/// Cut `text` to at most `limit` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}

fn json_list(items: &[String]) -> String {
    serde_json::to_string_pretty(items).unwrap_or_else(|_| items.join("\n"))
}

pub fn rank_links(query: &str, links: &[String]) -> String {
    format!(
        r#"Rank these search results for a research task about "{query}". Prefer the most RECENT and up-to-date information.

Links:
{links}

1. Decide which links most likely contain recent, relevant content about "{query}".
2. Order them by likely relevance and recency, best first.

Respond with a JSON object with two fields:
- "relevant_links": array of URLs likely to contain relevant content, ranked
- "irrelevant_links": array of URLs unlikely to be useful or current

Dates in URLs and words such as "latest", "update" or a recent year are good signals of recency."#,
        query = query,
        links = json_list(links),
    )
}

pub fn judge_relevance(query: &str, page: &PageContent) -> String {
    format!(
        r#"Decide whether this web page contains substantial, relevant and RECENT content about "{query}".

URL: {url}
Publication date (from metadata): {date}

Relevant content is:
1. directly about {query}
2. informative and substantial, not a passing mention
3. useful to someone learning about {query}
4. preferably recent or still current

It is NOT relevant if it only mentions the topic briefly, is mostly about something else,
is a listing page with little information, is a paywall or login page, or is clearly
outdated (older than two or three years unless still authoritative).

Page content:
---
{text}
---

Answer YES or NO first. Then briefly explain why, including how recent the content appears to be."#,
        query = query,
        url = page.url,
        date = page.published_at.as_deref().unwrap_or("Unknown"),
        text = truncate_chars(&page.text, RELEVANCE_TEXT_LIMIT),
    )
}

pub fn extract_content(query: &str, page: &PageContent) -> String {
    format!(
        r#"Extract the key information from this web page about "{query}".

URL: {url}
Title: {title}
Publication date (from metadata): {date}

Return a JSON object with these fields:
- title: the main title of the content
- summary: a concise summary of 150-200 words
- key_points: array of the 5-7 most important points or findings
- date_published: publication or last update date, as YYYY-MM-DD when possible; look for dates in the text if the metadata has none, otherwise estimate (e.g. "Appears to be from 2023")
- author: the author or authors if available
- content_type: article, blog post, news, research, tutorial, ...
- categories: array of topics this content covers
- relevance_score: integer from 1 to 10, how relevant and recent this is for "{query}"
- full_text: the main content text without navigation, ads or boilerplate

Page content:
---
{text}
---

Respond with the JSON object only."#,
        query = query,
        url = page.url,
        title = page.title,
        date = page.published_at.as_deref().unwrap_or("Not found in metadata"),
        text = truncate_chars(&page.text, EXTRACTION_TEXT_LIMIT),
    )
}

pub fn related_search_terms(query: &str, record: &ContentRecord, overrepresented: &[String]) -> String {
    let domains = if overrepresented.is_empty() {
        "none yet".to_string()
    } else {
        overrepresented.join(", ")
    };
    format!(
        r#"Suggest follow-up search queries for a research task about "{query}".

We just collected this content:
Title: {title}
Type: {content_type}
Summary: {summary}
Key points: {key_points}
Categories: {categories}

Write 5 specific search queries that find more DIVERSE content on the topic by covering
subtopics this content misses, other perspectives, more specialised material, and
sources other than the ones we already have.

We already have enough content from these domains: {domains}

Every query must stay closely related to "{query}".
Respond with a JSON array of query strings and nothing else."#,
        query = query,
        title = record.title,
        content_type = record.content_type.as_deref().unwrap_or("Unknown"),
        summary = record.summary.as_deref().unwrap_or("Unknown"),
        key_points = json_list(&record.key_points),
        categories = json_list(&record.categories),
        domains = domains,
    )
}

pub fn pick_follow_links(query: &str, links: &[String]) -> String {
    format!(
        r#"Pick the links on this page that most likely lead to more content about "{query}".

Links found on a relevant page:
{links}

Good candidates are related articles, more in-depth material and subtopics of the main topic.
Respond with a JSON array containing only the promising URLs."#,
        query = query,
        links = json_list(links),
    )
}
