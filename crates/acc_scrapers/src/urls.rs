use url::Url;

/// Query parameters that identify a click rather than a page.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "ref",
    "source",
    "fbclid",
    "gclid",
];

/// Publishers that are known to host articles, used when the model cannot
/// pick links for us.
pub const CONTENT_DOMAINS: &[&str] = &[
    "medium.com",
    "dev.to",
    "towardsdatascience.com",
    "hackernoon.com",
    "freecodecamp.org",
    "infoworld.com",
    "dzone.com",
    "stackoverflow.com",
    "stackexchange.com",
    "reddit.com",
    "habr.com",
    "levelup.gitconnected.com",
    "blog.logrocket.com",
    "blog.bitsrc.io",
    "tds.ai",
    "hashnode.com",
    "techcrunch.com",
    "wired.com",
    "venturebeat.com",
    "thenextweb.com",
    "zdnet.com",
    "cnet.com",
    "theverge.com",
    "engadget.com",
    "arstechnica.com",
    "mashable.com",
    "vox.com",
    "forbes.com",
    "businessinsider.com",
    "nytimes.com",
    "wsj.com",
    "bbc.com",
    "reuters.com",
    "cnbc.com",
    "bloomberg.com",
    "ft.com",
];

/// Canonical form used to decide whether two URLs point at the same page.
/// Input that does not parse as an absolute URL comes back unchanged.
pub fn normalize_url(raw: &str) -> String {
    let url = match Url::parse(raw.trim()) {
        Ok(url) => url,
        Err(_) => return raw.to_string(),
    };
    let host = match authority(&url) {
        Some(host) => host,
        None => return raw.to_string(),
    };

    let path = url.path().to_lowercase();
    let mut normalized = format!("{}://{}{}", url.scheme(), host, path.trim_end_matches('/'));

    let mut params: Vec<(&str, &str)> = url
        .query()
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(name, _)| !is_tracking_param(name))
        .collect();
    params.sort_by(|a, b| a.0.cmp(b.0));

    if !params.is_empty() {
        let query: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        normalized.push('?');
        normalized.push_str(&query.join("&"));
    }
    normalized
}

fn is_tracking_param(name: &str) -> bool {
    TRACKING_PARAMS.iter().any(|p| p.eq_ignore_ascii_case(name))
}

fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Lower-cased `host[:port]` of a URL.
pub fn domain_of(raw: &str) -> Option<String> {
    Url::parse(raw.trim()).ok().as_ref().and_then(authority)
}

pub fn is_likely_content_domain(raw: &str) -> bool {
    match domain_of(raw) {
        Some(domain) => CONTENT_DOMAINS.iter().any(|d| domain.contains(d)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("https://Example.COM/Blog/Post/?utm_source=x&b=2&a=1#top"),
            "https://example.com/blog/post?a=1&b=2"
        );
        assert_eq!(normalize_url("https://example.com/"), "https://example.com");
        assert_eq!(
            normalize_url("https://example.com/a?flag&FBCLID=1&id=3"),
            "https://example.com/a?id=3"
        );
        assert_eq!(normalize_url("http://example.com:8080/x"), "http://example.com:8080/x");
    }

    #[test]
    fn test_normalize_url_is_idempotent() {
        let once = normalize_url("https://Dev.to/Rust/?ref=home&page=2");
        assert_eq!(normalize_url(&once), once);
    }

    #[test]
    fn test_normalize_url_keeps_garbage() {
        assert_eq!(normalize_url("not a url"), "not a url");
        assert_eq!(normalize_url("/relative/path"), "/relative/path");
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://Blog.Example.com/a").as_deref(), Some("blog.example.com"));
        assert_eq!(domain_of("http://localhost:3000/").as_deref(), Some("localhost:3000"));
        assert_eq!(domain_of("nope"), None);
    }

    #[test]
    fn test_is_likely_content_domain() {
        assert!(is_likely_content_domain("https://medium.com/@someone/post"));
        assert!(is_likely_content_domain("https://www.bbc.com/news/technology"));
        assert!(!is_likely_content_domain("https://example.org/post"));
        assert!(!is_likely_content_domain("garbage"));
    }
}
