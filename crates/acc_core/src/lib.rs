pub mod error;
pub mod models;
pub mod sources;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::InferenceModel;
pub use sources::{Fetcher, SearchProvider};
pub use storage::ContentStorage;
pub use types::{
    is_placeholder, ContentRecord, CrawlStats, PageContent, SavedContent, SearchResult,
};
