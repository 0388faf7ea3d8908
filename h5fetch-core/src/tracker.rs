use crate::error::Result;
use h5fetch_scanner::cache_key;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// On-disk ledger for one crawl root.
#[derive(Debug, Serialize, Deserialize)]
struct Ledger {
    root_url: String,
    completed: Vec<String>,
}

/// Persistent set of URLs fully downloaded for one crawl root.
///
/// Every [`mark_completed`](Self::mark_completed) rewrites the whole ledger
/// while holding the write lock, so concurrent workers never interleave
/// their writes and the file always holds the latest snapshot.
pub struct DownloadTracker {
    root_url: String,
    ledger_path: PathBuf,
    completed: RwLock<HashSet<String>>,
}

impl DownloadTracker {
    pub fn new(ledger_dir: impl AsRef<Path>, root_url: impl Into<String>) -> Self {
        let root_url = root_url.into();
        let ledger_path = ledger_dir
            .as_ref()
            .join(format!("{}.json", cache_key(&root_url)));
        Self {
            root_url,
            ledger_path,
            completed: RwLock::new(HashSet::new()),
        }
    }

    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    /// Merge the persisted ledger into memory and return how many URLs it held.
    ///
    /// A missing, unreadable or foreign ledger counts as empty.
    pub async fn load(&self) -> usize {
        let data = match tokio::fs::read(&self.ledger_path).await {
            Ok(data) => data,
            Err(e) => {
                debug!("No ledger at {}: {}", self.ledger_path.display(), e);
                return 0;
            }
        };

        let ledger: Ledger = match serde_json::from_slice(&data) {
            Ok(ledger) => ledger,
            Err(e) => {
                warn!("Ignoring unreadable ledger {}: {}", self.ledger_path.display(), e);
                return 0;
            }
        };

        if ledger.root_url != self.root_url {
            warn!(
                "Ledger {} belongs to {}, ignoring it",
                self.ledger_path.display(),
                ledger.root_url
            );
            return 0;
        }

        let count = ledger.completed.len();
        self.completed.write().await.extend(ledger.completed);
        count
    }

    pub async fn is_completed(&self, url: &str) -> bool {
        self.completed.read().await.contains(url)
    }

    /// True when `url` is in the ledger and `path` still exists on disk.
    pub async fn is_resumable(&self, url: &str, path: &Path) -> bool {
        self.is_completed(url).await && tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    pub async fn completed_count(&self) -> usize {
        self.completed.read().await.len()
    }

    /// Record `url` as downloaded and rewrite the ledger.
    ///
    /// A failed write is logged; the in-memory set is still updated.
    pub async fn mark_completed(&self, url: &str) {
        let mut completed = self.completed.write().await;
        completed.insert(url.to_string());

        if let Err(e) = self.persist(&completed).await {
            warn!(
                "Could not save ledger {}: {}",
                self.ledger_path.display(),
                e
            );
        }
    }

    async fn persist(&self, completed: &HashSet<String>) -> Result<()> {
        let mut urls: Vec<String> = completed.iter().cloned().collect();
        urls.sort();
        let ledger = Ledger {
            root_url: self.root_url.clone(),
            completed: urls,
        };

        if let Some(parent) = self.ledger_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.ledger_path, serde_json::to_vec_pretty(&ledger)?).await?;
        Ok(())
    }
}
