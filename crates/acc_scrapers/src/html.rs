use scraper::{Html, Node, Selector};
use url::Url;
use acc_core::{Error, PageContent, Result};
use crate::jsonld;

/// Link parameters dropped when rebuilding outgoing links.
const LINK_TRACKING_PARAMS: &[&str] = &["utm_source", "utm_medium", "utm_campaign", "ref", "source"];

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

const DATE_PROPERTIES: &[&str] = &[
    "article:published_time",
    "og:updated_time",
    "datePublished",
    "dateModified",
];
const DATE_NAMES: &[&str] = &["date", "pubdate", "publication_date", "lastmod"];
const DATE_ITEMPROPS: &[&str] = &["datePublished", "dateModified", "dateCreated"];

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Scraping(format!("Invalid selector {}: {}", css, e)))
}

/// Parse a fetched page into the fields the crawler works with.
pub fn parse_page(url: &str, html: &str) -> PageContent {
    let document = Html::parse_document(html);

    let mut authors = jsonld::extract_authors(&document);
    if authors.is_empty() {
        authors.extend(meta_author(&document));
    }

    PageContent {
        url: url.to_string(),
        title: extract_title(&document),
        text: visible_text(&document),
        published_at: meta_date(&document).or_else(|| jsonld::extract_date_published(&document)),
        authors,
        links: Url::parse(url)
            .map(|base| document_links(&base, &document))
            .unwrap_or_default(),
    }
}

fn extract_title(document: &Html) -> String {
    selector("title")
        .ok()
        .and_then(|s| document.select(&s).next())
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Text of the document outside scripts and styles, one line per text run.
pub fn visible_text(document: &Html) -> String {
    let mut lines = Vec::new();
    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|el| HIDDEN_ELEMENTS.contains(&el.name()))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }
        lines.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }
    lines.join("\n")
}

/// The `content` of the first date-bearing `<meta>` tag in document order.
fn meta_date(document: &Html) -> Option<String> {
    let meta = selector("meta").ok()?;
    document.select(&meta).find_map(|el| {
        let attrs = el.value();
        let matches = attrs.attr("property").is_some_and(|p| DATE_PROPERTIES.contains(&p))
            || attrs.attr("name").is_some_and(|n| DATE_NAMES.contains(&n))
            || attrs.attr("itemprop").is_some_and(|i| DATE_ITEMPROPS.contains(&i));
        if !matches {
            return None;
        }
        attrs
            .attr("content")
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    })
}

fn meta_author(document: &Html) -> Option<String> {
    let meta = selector("meta[name='author']").ok()?;
    document
        .select(&meta)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

/// All outgoing http(s) links of a page, resolved against `base` and
/// stripped of tracking parameters.
pub fn extract_links(base: &str, html: &str) -> Result<Vec<String>> {
    let base = Url::parse(base).map_err(|e| Error::InvalidUrl(format!("{}: {}", base, e)))?;
    let document = Html::parse_document(html);
    Ok(document_links(&base, &document))
}

fn document_links(base: &Url, document: &Html) -> Vec<String> {
    let Ok(anchors) = selector("a[href]") else {
        return Vec::new();
    };
    let mut links: Vec<String> = Vec::new();
    for href in document.select(&anchors).filter_map(|a| a.value().attr("href")) {
        if let Some(link) = clean_link(base, href) {
            if !links.contains(&link) {
                links.push(link);
            }
        }
    }
    links
}

fn clean_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }
    let url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    let host = url.host_str()?;

    let mut link = match url.port() {
        Some(port) => format!("{}://{}:{}{}", url.scheme(), host, port, url.path()),
        None => format!("{}://{}{}", url.scheme(), host, url.path()),
    };
    let params: Vec<&str> = url
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|param| match param.split_once('=') {
            Some((name, _)) => !LINK_TRACKING_PARAMS.iter().any(|p| p.eq_ignore_ascii_case(name)),
            None => false,
        })
        .collect();
    if !params.is_empty() {
        link.push('?');
        link.push_str(&params.join("&"));
    }
    Some(link)
}
