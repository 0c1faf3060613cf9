use async_trait::async_trait;
use acc_core::{is_placeholder, ContentRecord, ContentStorage, Error, Result};
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_CONTENT_DIR: &str = "data/content";

const MAX_STEM_CHARS: usize = 50;

/// Writes one pretty-printed JSON file per record into a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn create_unique(&self, stem: &str) -> Result<(PathBuf, tokio::fs::File)> {
        let timestamp = Utc::now().timestamp();
        for attempt in 0..1000u32 {
            let name = if attempt == 0 {
                format!("{}_{}.json", stem, timestamp)
            } else {
                format!("{}_{}_{}.json", stem, timestamp, attempt)
            };
            let path = self.dir.join(name);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(Error::Storage(format!(
            "Could not find a free file name for {} in {}",
            stem,
            self.dir.display()
        )))
    }
}

/// Builds the file stem for a record: the title when it is meaningful,
/// otherwise the last URL path segment, otherwise the host.
pub fn file_stem(record: &ContentRecord) -> String {
    let base = if !is_placeholder(&record.title) {
        record.title.clone()
    } else {
        match Url::parse(&record.url) {
            Ok(url) => url
                .path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_string))
                .or_else(|| url.host_str().map(str::to_string))
                .unwrap_or_else(|| "content".to_string()),
            Err(_) => "content".to_string(),
        }
    };

    base.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .take(MAX_STEM_CHARS)
        .collect()
}

#[async_trait]
impl ContentStorage for JsonFileStorage {
    async fn store_content(&self, record: &ContentRecord) -> Result<String> {
        let body = serde_json::to_string_pretty(record)?;
        let (path, mut file) = self.create_unique(&file_stem(record)).await?;
        file.write_all(body.as_bytes()).await?;
        file.flush().await?;

        let location = path.display().to_string();
        info!("💾 Saved content data to {}", location);
        Ok(location)
    }

    async fn list_content(&self) -> Result<Vec<ContentRecord>> {
        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str::<ContentRecord>(&raw) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable record {}: {}", path.display(), e),
            }
        }
        records.sort_by(|a, b| a.scraped_at.cmp(&b.scraped_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem_from_title() {
        let record = ContentRecord::new("https://example.com/a", "Rust 2025: what's new?", "rust");
        assert_eq!(file_stem(&record), "Rust_2025__what_s_new_");
    }

    #[test]
    fn test_file_stem_falls_back_to_path_then_host() {
        let record = ContentRecord::new("https://example.com/blog/async-rust/", "Unknown", "rust");
        assert_eq!(file_stem(&record), "async-rust");

        let record = ContentRecord::new("https://example.com/", "", "rust");
        assert_eq!(file_stem(&record), "example_com");
    }

    #[test]
    fn test_file_stem_is_truncated() {
        let title = "a".repeat(120);
        let record = ContentRecord::new("https://example.com", title, "q");
        assert_eq!(file_stem(&record).chars().count(), 50);
    }

    #[tokio::test]
    async fn test_store_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("content")).await.unwrap();

        let mut record = ContentRecord::new("https://example.com/a", "Café guide", "coffee");
        record.relevance_score = Some(7);
        record.key_points = vec!["Grind fresh".to_string()];

        let first = storage.store_content(&record).await.unwrap();
        let second = storage.store_content(&record).await.unwrap();
        assert_ne!(first, second, "same title in the same second must not overwrite");

        let raw = std::fs::read_to_string(&first).unwrap();
        assert!(raw.contains("Café guide"), "non-ASCII is written as-is");

        let listed = storage.list_content().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|r| r.relevance_score == Some(7)));
    }

    #[tokio::test]
    async fn test_list_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();

        let storage = JsonFileStorage::new(dir.path()).await.unwrap();
        assert!(storage.list_content().await.unwrap().is_empty());
    }
}
