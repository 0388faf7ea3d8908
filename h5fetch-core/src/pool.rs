use crate::error::{CoreError, Result};
use crate::task::DownloadTask;
use crate::tracker::DownloadTracker;
use futures::StreamExt;
use h5fetch_scanner::RetryPolicy;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

/// A download that did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadFailure {
    pub url: String,
    pub error: String,
}

/// Outcome of one pool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub downloaded: usize,
    pub bytes: u64,
    pub failed: Vec<DownloadFailure>,
}

impl PoolReport {
    fn merge(&mut self, other: PoolReport) {
        self.downloaded += other.downloaded;
        self.bytes += other.bytes;
        self.failed.extend(other.failed);
    }
}

/// Fixed number of workers draining a pre-filled, closed task queue.
pub struct WorkerPool {
    client: Client,
    workers: usize,
    retry: RetryPolicy,
    show_progress_bar: bool,
}

impl WorkerPool {
    pub fn new(client: Client, workers: usize) -> Self {
        Self {
            client,
            workers: workers.max(1),
            retry: RetryPolicy::default(),
            show_progress_bar: false,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_progress_bar(mut self, show: bool) -> Self {
        self.show_progress_bar = show;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Download every task, marking each success in `tracker`.
    ///
    /// Returns once all workers have drained the queue and exited. A failed
    /// task is reported and skipped; it never stops the other workers.
    pub async fn run(&self, tasks: Vec<DownloadTask>, tracker: Arc<DownloadTracker>) -> PoolReport {
        let mut report = PoolReport::default();
        if tasks.is_empty() {
            return report;
        }

        let progress_bar = if self.show_progress_bar {
            let pb = ProgressBar::new(tasks.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let (tx, rx) = mpsc::channel(tasks.len());
        for task in tasks {
            // Capacity equals the task count, so this never waits.
            if tx.send(task).await.is_err() {
                break;
            }
        }
        drop(tx);

        let rx = Arc::new(Mutex::new(rx));
        let mut worker_handles = Vec::with_capacity(self.workers);

        for worker_id in 0..self.workers {
            let rx = rx.clone();
            let client = self.client.clone();
            let retry = self.retry;
            let tracker = tracker.clone();
            let pb = progress_bar.clone();

            let handle = tokio::spawn(async move {
                debug!("Download worker {} started", worker_id);
                let mut worker_report = PoolReport::default();

                loop {
                    let task = { rx.lock().await.recv().await };
                    let Some(task) = task else { break };

                    pb.set_message(task.destination.display().to_string());
                    match retry.run(&task.url, || download_file(&client, &task)).await {
                        Ok(bytes) => {
                            tracker.mark_completed(&task.url).await;
                            info!("Downloaded: {}", task.destination.display());
                            worker_report.downloaded += 1;
                            worker_report.bytes += bytes;
                        }
                        Err(e) => {
                            warn!("Error downloading {}: {}", task.url, e);
                            pb.println(format!("Error downloading {}: {}", task.url, e));
                            worker_report.failed.push(DownloadFailure {
                                url: task.url.clone(),
                                error: e.to_string(),
                            });
                        }
                    }
                    pb.inc(1);
                }

                debug!("Download worker {} finished", worker_id);
                worker_report
            });

            worker_handles.push(handle);
        }

        for handle in worker_handles {
            match handle.await {
                Ok(worker_report) => report.merge(worker_report),
                Err(e) => warn!("Download worker failed: {}", e),
            }
        }

        progress_bar.finish_and_clear();
        report
    }
}

/// Stream `task.url` straight into `task.destination`.
///
/// Parent directories are created as needed. An interrupted transfer leaves
/// a truncated file behind; it is not recorded in the ledger.
pub async fn download_file(client: &Client, task: &DownloadTask) -> Result<u64> {
    if let Some(parent) = task.destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let response = client.get(&task.url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CoreError::HttpStatus {
            url: task.url.clone(),
            status: status.as_u16(),
        });
    }

    let mut file = tokio::fs::File::create(&task.destination).await?;
    let mut stream = response.bytes_stream();
    let mut total_bytes = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        total_bytes += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(total_bytes)
}
