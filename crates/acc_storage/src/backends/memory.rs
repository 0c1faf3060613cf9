use async_trait::async_trait;
use acc_core::{ContentRecord, ContentStorage, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct MemoryStore {
    records: Vec<ContentRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    pub fn store_content(&mut self, record: &ContentRecord) -> String {
        if let Some(existing) = self.records.iter_mut().find(|r| r.url == record.url) {
            *existing = record.clone();
        } else {
            self.records.push(record.clone());
        }
        format!("memory://{}", record.url)
    }

    pub fn records(&self) -> &[ContentRecord] {
        &self.records
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps records in process memory; used for dry runs and tests.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.records().len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ContentStorage for InMemoryStorage {
    async fn store_content(&self, record: &ContentRecord) -> Result<String> {
        let mut store = self.store.write().await;
        Ok(store.store_content(record))
    }

    async fn list_content(&self) -> Result<Vec<ContentRecord>> {
        let store = self.store.read().await;
        Ok(store.records().to_vec())
    }
}
