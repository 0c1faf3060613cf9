use acc_core::{ContentStorage, Error, Result};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

pub mod backends;

pub use backends::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Json,
    Memory,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" | "file" | "files" => Ok(Self::Json),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(Error::Config(format!(
                "Unknown storage backend: {} (expected json or memory)",
                other
            ))),
        }
    }
}

/// Build the storage backend selected on the command line.
pub async fn create_storage(kind: StorageKind, dir: &Path) -> Result<Arc<dyn ContentStorage>> {
    match kind {
        StorageKind::Json => Ok(Arc::new(JsonFileStorage::new(dir).await?)),
        StorageKind::Memory => Ok(Arc::new(InMemoryStorage::new())),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, StorageKind};
}
