use serde::{Deserialize, Serialize};

/// Page-level counters for one crawl root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    pub pages_visited: usize,
    pub pages_failed: usize,
    pub directories_found: usize,
    pub files_found: usize,
    pub links_skipped: usize,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }
}
