pub mod cache;
pub mod client;
pub mod collector;
pub mod crawler;
pub mod error;
pub mod result;
pub mod retry;
pub mod urls;

pub use cache::ResponseCache;
pub use client::http_client;
pub use collector::UrlCollector;
pub use crawler::{Crawler, ProgressCallback};
pub use error::ScanError;
pub use result::CrawlStats;
pub use retry::RetryPolicy;
pub use urls::{cache_key, target_domain};
