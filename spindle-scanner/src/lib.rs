pub mod crawler;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod result;

pub use crawler::{Crawler, DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_PAGES, ProgressCallback};
pub use error::ScanError;
pub use fetch::{FetchedPage, HttpFetcher, PageFetcher};
pub use normalize::normalize_url;
pub use result::{CrawlOutcome, PageRecord};
