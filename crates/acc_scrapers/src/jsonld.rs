use scraper::{Html, Selector};
use serde_json::Value;

/// Every JSON-LD object embedded in the document, with top-level arrays and
/// `@graph` containers flattened.
fn jsonld_objects(document: &Html) -> Vec<Value> {
    let mut objects = Vec::new();

    if let Ok(script_selector) = Selector::parse("script[type='application/ld+json']") {
        for script in document.select(&script_selector) {
            let raw = script.text().collect::<String>();
            let Ok(json) = serde_json::from_str::<Value>(raw.trim()) else {
                continue;
            };
            match json {
                Value::Array(items) => objects.extend(items),
                Value::Object(mut obj) => {
                    if let Some(Value::Array(graph)) = obj.remove("@graph") {
                        objects.extend(graph);
                    }
                    if !obj.is_empty() {
                        objects.push(Value::Object(obj));
                    }
                }
                _ => {}
            }
        }
    }

    objects
}

fn author_names(author: &Value, authors: &mut Vec<String>) {
    match author {
        Value::Array(arr) => {
            for author_obj in arr {
                author_names(author_obj, authors);
            }
        }
        Value::Object(obj) => {
            if let Some(name) = obj.get("name").and_then(|n| n.as_str()) {
                authors.push(name.trim().to_string());
            }
        }
        Value::String(s) => authors.push(s.trim().to_string()),
        _ => {}
    }
}

/// Extracts authors from JSON-LD metadata in the HTML document.
pub fn extract_authors(document: &Html) -> Vec<String> {
    let mut authors = Vec::new();
    for object in jsonld_objects(document) {
        if let Some(author) = object.get("author") {
            author_names(author, &mut authors);
        }
    }
    authors.retain(|a| !a.is_empty());
    authors.dedup();
    authors
}

/// The first `datePublished` found in JSON-LD metadata.
pub fn extract_date_published(document: &Html) -> Option<String> {
    jsonld_objects(document).iter().find_map(|object| {
        object
            .get("datePublished")
            .and_then(|d| d.as_str())
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
    })
}
