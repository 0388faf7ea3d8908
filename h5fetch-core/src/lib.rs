pub mod error;
pub mod export;
pub mod pipeline;
pub mod pool;
pub mod task;
pub mod tracker;

pub use error::CoreError;
pub use pipeline::{
    PipelineOptions, PipelineProgressCallback, RootDiscovery, RootDownloadReport, discover,
    download_all, total_urls,
};
pub use pool::{DownloadFailure, PoolReport, WorkerPool};
pub use task::{CrawlTask, DownloadTask};
pub use tracker::DownloadTracker;
