pub mod dedup;
pub mod fetch;
pub mod html;
pub mod jsonld;
pub mod manager;
pub mod search;
pub mod urls;

pub use fetch::HttpFetcher;
pub use manager::{CrawlLimits, CrawlManager, CrawlReport};
pub use search::{default_providers, SearchConfig};

pub mod prelude {
    pub use super::dedup::{DomainQuota, DuplicateDetector, Similarity};
    pub use super::fetch::HttpFetcher;
    pub use super::manager::{CrawlLimits, CrawlManager, CrawlReport};
    pub use super::search::{default_providers, GoogleCustomSearch, ResultsPageSearch, SearchConfig};
    pub use acc_core::{CrawlStats, Error, Fetcher, PageContent, Result, SavedContent, SearchProvider};
}
