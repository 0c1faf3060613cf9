use async_trait::async_trait;
use crate::types::ContentRecord;
use crate::Result;

#[async_trait]
pub trait ContentStorage: Send + Sync {
    /// Persist a record and return where it was written
    async fn store_content(&self, record: &ContentRecord) -> Result<String>;

    /// All records persisted so far
    async fn list_content(&self) -> Result<Vec<ContentRecord>>;
}
