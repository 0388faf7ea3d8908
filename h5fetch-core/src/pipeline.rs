use crate::error::Result;
use crate::pool::{PoolReport, WorkerPool};
use crate::task::{CrawlTask, plan_downloads};
use crate::tracker::DownloadTracker;
use h5fetch_scanner::{
    CrawlStats, Crawler, ProgressCallback, ResponseCache, RetryPolicy, UrlCollector, http_client,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Options for configuring a crawl-and-download run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub cache_dir: PathBuf,
    pub ledger_dir: PathBuf,
    /// Download root, or the export file in export mode.
    pub output: PathBuf,
    pub workers: usize,
    pub flat: bool,
    pub dedup: bool,
    pub retry: RetryPolicy,
    pub show_progress_bars: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("url_cache"),
            ledger_dir: PathBuf::from("downloaded_db"),
            output: PathBuf::from("./files"),
            workers: 4,
            flat: false,
            dedup: false,
            retry: RetryPolicy::default(),
            show_progress_bars: false,
        }
    }
}

/// Callback for reporting pipeline progress
pub type PipelineProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Everything found under one crawl root.
#[derive(Debug, Clone)]
pub struct RootDiscovery {
    pub task: CrawlTask,
    pub target_domain: String,
    pub urls: Vec<String>,
    pub stats: CrawlStats,
}

/// Download results for one crawl root.
#[derive(Debug, Clone)]
pub struct RootDownloadReport {
    pub root_url: String,
    pub discovered: usize,
    /// Already in the ledger with the file still on disk.
    pub skipped: usize,
    pub planned: usize,
    pub pool: PoolReport,
}

pub fn total_urls(discoveries: &[RootDiscovery]) -> usize {
    discoveries.iter().map(|d| d.urls.len()).sum()
}

/// Crawl every root in order and collect its file URLs.
///
/// All roots are validated before the first request, so a bad root aborts
/// the run without touching the network.
pub async fn discover(
    tasks: &[CrawlTask],
    options: &PipelineOptions,
    progress_callback: Option<PipelineProgressCallback>,
) -> Result<Vec<RootDiscovery>> {
    let targets = tasks
        .iter()
        .map(CrawlTask::target_domain)
        .collect::<Result<Vec<_>>>()?;

    let cache = ResponseCache::open(&options.cache_dir, http_client()?)?.with_retry(options.retry);

    let spinner = if options.show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let pages = Arc::new(AtomicUsize::new(0));
    let mut discoveries = Vec::with_capacity(tasks.len());

    for (idx, (task, target_domain)) in tasks.iter().zip(targets).enumerate() {
        if let Some(ref callback) = progress_callback {
            callback(format!(
                "Processing {}/{}: {}",
                idx + 1,
                tasks.len(),
                task.root_url
            ));
        }

        let pb = spinner.clone();
        let pages_clone = pages.clone();
        let page_callback: ProgressCallback = Arc::new(move |depth: usize, url: String| {
            let count = pages_clone.fetch_add(1, Ordering::Relaxed) + 1;
            pb.set_message(format!("[{} pages] depth {}: {}", count, depth, url));
            pb.tick();
        });

        let collector = UrlCollector::with_dedup(options.dedup);
        let stats = Crawler::new(&cache, target_domain.clone())
            .with_max_depth(task.max_depth)
            .with_progress_callback(page_callback)
            .crawl(&task.root_url, &collector)
            .await;

        discoveries.push(RootDiscovery {
            task: task.clone(),
            target_domain,
            urls: collector.into_urls(),
            stats,
        });
    }

    spinner.finish_and_clear();
    Ok(discoveries)
}

/// Download everything discovered, one root at a time, resuming from each
/// root's ledger.
pub async fn download_all(
    discoveries: &[RootDiscovery],
    options: &PipelineOptions,
    progress_callback: Option<PipelineProgressCallback>,
) -> Result<Vec<RootDownloadReport>> {
    let pool = WorkerPool::new(http_client()?, options.workers)
        .with_retry(options.retry)
        .with_progress_bar(options.show_progress_bars);

    let mut reports = Vec::with_capacity(discoveries.len());
    for discovery in discoveries {
        let tracker = Arc::new(DownloadTracker::new(
            &options.ledger_dir,
            discovery.task.root_url.clone(),
        ));
        tracker.load().await;

        let tasks = plan_downloads(
            &discovery.task.root_url,
            &discovery.target_domain,
            &discovery.urls,
            &tracker,
            &options.output,
            options.flat,
        )
        .await;

        let planned = tasks.len();
        let skipped = discovery.urls.len() - planned;

        if let Some(ref callback) = progress_callback {
            if planned == 0 {
                callback("All files already downloaded".to_string());
            } else {
                callback(format!(
                    "Downloading {} files with {} workers...",
                    planned,
                    pool.workers()
                ));
            }
        }

        let pool_report = pool.run(tasks, tracker).await;
        reports.push(RootDownloadReport {
            root_url: discovery.task.root_url.clone(),
            discovered: discovery.urls.len(),
            skipped,
            planned,
            pool: pool_report,
        });
    }

    Ok(reports)
}
