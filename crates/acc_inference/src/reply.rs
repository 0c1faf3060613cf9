//! Turning free-form model replies into JSON values.
//!
//! Models are asked for JSON but often wrap it in markdown fences, add a
//! sentence before it, or embed code samples with unescaped quotes. Parsing
//! is therefore best-effort and never fails: the last resort is an object
//! holding the raw text under `raw_text`.

use std::sync::OnceLock;
use regex::Regex;
use serde_json::{Map, Value};

pub const RAW_TEXT_KEY: &str = "raw_text";

fn code_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```.*?```").expect("static regex"))
}

fn numbering_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\s*").expect("static regex"))
}

/// Parse the JSON payload out of a model reply.
pub fn parse_json_reply(text: &str) -> Value {
    let mut candidates = Vec::with_capacity(3);
    if let Some(body) = fenced_body(text, "```json") {
        candidates.push(body);
    }
    if let Some(body) = fenced_body(text, "```") {
        candidates.push(body);
    }
    candidates.push(text.trim());

    for candidate in candidates {
        if let Some(value) = parse_candidate(candidate) {
            return value;
        }
    }

    let mut fallback = Map::new();
    fallback.insert(RAW_TEXT_KEY.to_string(), Value::String(text.to_string()));
    Value::Object(fallback)
}

/// True when `parse_json_reply` could not find any JSON.
pub fn is_unparsed(value: &Value) -> bool {
    value
        .as_object()
        .map(|o| o.len() == 1 && o.contains_key(RAW_TEXT_KEY))
        .unwrap_or(false)
}

fn parse_candidate(body: &str) -> Option<Value> {
    let body = body.trim();
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return Some(value);
    }
    if let Some(value) = outermost_span(body).and_then(|s| serde_json::from_str(s).ok()) {
        return Some(value);
    }

    // Code samples inside string values break parsing; swap them out
    let mut index = 0;
    let placeholdered = code_block_re().replace_all(body, |_: &regex::Captures| {
        let placeholder = format!("\"CODE_BLOCK_{}\"", index);
        index += 1;
        placeholder
    });
    if let Ok(value) = serde_json::from_str::<Value>(&placeholdered) {
        return Some(value);
    }
    outermost_span(&placeholdered).and_then(|s| serde_json::from_str(s).ok())
}

/// The text between the first `fence` and the next closing fence. A
/// language tag on the opening line is skipped.
fn fenced_body<'a>(text: &'a str, fence: &str) -> Option<&'a str> {
    let start = text.find(fence)?;
    let mut rest = &text[start + fence.len()..];
    if let Some(nl) = rest.find('\n') {
        let tag = rest[..nl].trim();
        if !tag.contains(' ') && !tag.contains(['{', '[']) {
            rest = &rest[nl + 1..];
        }
    }
    Some(rest.find("```").map(|end| &rest[..end]).unwrap_or(rest))
}

/// From the first `{` or `[` to the last matching closing bracket.
fn outermost_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Strip list numbering the model sometimes puts in front of keys
/// (`"1. title"` becomes `"title"`).
pub fn clean_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (numbering_re().replace(&k, "").trim().to_string(), v))
                .collect(),
        ),
        other => other,
    }
}

/// Read a field as text. Arrays of strings are joined, numbers are printed.
pub fn string_field(value: &Value, key: &str) -> Option<String> {
    let text = match value.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(o) => o.get("name").and_then(|n| n.as_str()).map(|s| s.trim().to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(o) => o.get("name").and_then(|n| n.as_str())?.trim().to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Read a field as a list of strings. A single string is split into lines
/// with bullet markers removed.
pub fn string_list(value: &Value, key: &str) -> Vec<String> {
    match value.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .lines()
            .map(|line| line.trim().trim_start_matches(['-', '*', '•']).trim().to_string())
            .filter(|line| !line.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Read a 1-10 score. Accepts numbers and strings like `"8"` or `"8/10"`.
pub fn score_field(value: &Value, key: &str) -> Option<u8> {
    let raw = match value.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            digits.parse::<f64>().ok()?
        }
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(1.0, 10.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json() {
        assert_eq!(parse_json_reply(r#"{"a": 1}"#), json!({"a": 1}));
        assert_eq!(parse_json_reply(r#"["x", "y"]"#), json!(["x", "y"]));
    }

    #[test]
    fn test_fenced_json() {
        let reply = "Here you go:\n```json\n{\"relevant_links\": [\"https://a.com\"]}\n```\nHope it helps";
        assert_eq!(parse_json_reply(reply), json!({"relevant_links": ["https://a.com"]}));

        let reply = "```\n[\"rust async\", \"tokio guide\"]\n```";
        assert_eq!(parse_json_reply(reply), json!(["rust async", "tokio guide"]));
    }

    #[test]
    fn test_fenced_block_wins_over_bracketed_prose() {
        let reply = "See note [1] below.\n```\n[\"rust tokio\", \"rust async book\"]\n```";
        assert_eq!(parse_json_reply(reply), json!(["rust tokio", "rust async book"]));
    }

    #[test]
    fn test_json_with_surrounding_prose() {
        let reply = "Sure! The result is {\"title\": \"T\"} as requested.";
        assert_eq!(parse_json_reply(reply), json!({"title": "T"}));
    }

    #[test]
    fn test_nested_code_blocks_are_replaced() {
        let reply = "{\"title\": \"Intro\", \"full_text\": ```rust\nfn main() { println!(\"hi\"); }\n```}";
        let value = parse_json_reply(reply);
        assert_eq!(value["title"], "Intro");
        assert_eq!(value["full_text"], "CODE_BLOCK_0");
    }

    #[test]
    fn test_unparseable_falls_back_to_raw_text() {
        let reply = "I could not find anything useful.";
        let value = parse_json_reply(reply);
        assert!(is_unparsed(&value));
        assert_eq!(value[RAW_TEXT_KEY], reply);
        assert!(!is_unparsed(&json!({"title": "x"})));
    }

    #[test]
    fn test_clean_keys() {
        let value = clean_keys(json!({"1. title": "T", "2.summary": "S", "author": "A"}));
        assert_eq!(value, json!({"title": "T", "summary": "S", "author": "A"}));
    }

    #[test]
    fn test_string_field() {
        let value = json!({
            "author": ["Ada", {"name": "Grace"}],
            "year": 2024,
            "empty": "  ",
            "publisher": {"name": "ACM"}
        });
        assert_eq!(string_field(&value, "author").as_deref(), Some("Ada, Grace"));
        assert_eq!(string_field(&value, "year").as_deref(), Some("2024"));
        assert_eq!(string_field(&value, "publisher").as_deref(), Some("ACM"));
        assert_eq!(string_field(&value, "empty"), None);
        assert_eq!(string_field(&value, "missing"), None);
    }

    #[test]
    fn test_string_list() {
        let value = json!({
            "points": ["one", " two ", ""],
            "bullets": "- first\n* second\n\n• third"
        });
        assert_eq!(string_list(&value, "points"), vec!["one", "two"]);
        assert_eq!(string_list(&value, "bullets"), vec!["first", "second", "third"]);
        assert!(string_list(&value, "missing").is_empty());
    }

    #[test]
    fn test_score_field() {
        let value = json!({"a": 8, "b": "7/10", "c": 42, "d": 0.2, "e": "high", "f": 6.6});
        assert_eq!(score_field(&value, "a"), Some(8));
        assert_eq!(score_field(&value, "b"), Some(7));
        assert_eq!(score_field(&value, "c"), Some(10));
        assert_eq!(score_field(&value, "d"), Some(1));
        assert_eq!(score_field(&value, "e"), None);
        assert_eq!(score_field(&value, "f"), Some(7));
    }
}
