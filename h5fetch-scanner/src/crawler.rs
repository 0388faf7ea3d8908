use crate::cache::ResponseCache;
use crate::collector::UrlCollector;
use crate::result::CrawlStats;
use futures::future::BoxFuture;
use scraper::{Html, Selector};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

/// Called with `(depth, url)` for every listing page about to be fetched.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector is valid"));

/// What a single href on a listing page points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingLink {
    /// Trailing `/`: a sub-directory listing to descend into.
    Directory(String),
    File(String),
    /// Parent-directory links and empty hrefs.
    Skipped,
}

impl ListingLink {
    pub fn classify(href: &str) -> Self {
        if href.is_empty() || href.starts_with("..") {
            ListingLink::Skipped
        } else if href.ends_with('/') {
            ListingLink::Directory(href.to_string())
        } else {
            ListingLink::File(href.to_string())
        }
    }
}

/// Depth-first crawler for h5ai-style directory listings.
///
/// Every page goes through the shared [`ResponseCache`]. Links are resolved
/// by prefixing them with the target domain, so listings are expected to
/// use root-relative hrefs (`/files/a.txt`), which is what h5ai emits.
pub struct Crawler<'a> {
    cache: &'a ResponseCache,
    target_domain: String,
    max_depth: usize,
    progress_callback: Option<ProgressCallback>,
}

impl<'a> Crawler<'a> {
    pub fn new(cache: &'a ResponseCache, target_domain: impl Into<String>) -> Self {
        Self {
            cache,
            target_domain: target_domain.into(),
            max_depth: 4,
            progress_callback: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn target_domain(&self) -> &str {
        &self.target_domain
    }

    /// Crawl from a root URL at depth 0, adding every file link to `collector`.
    pub async fn crawl(&self, root_url: &str, collector: &UrlCollector) -> CrawlStats {
        info!(
            "Starting crawl of {} (max depth {})",
            root_url, self.max_depth
        );
        let mut stats = CrawlStats::new();
        self.crawl_page(root_url.to_string(), 0, collector, &mut stats)
            .await;
        info!(
            "Crawl of {} complete: {} pages, {} files",
            root_url, stats.pages_visited, stats.files_found
        );
        stats
    }

    /// Visit `url` at `depth`. A fetch failure abandons this branch only.
    pub fn crawl_page<'b>(
        &'b self,
        url: String,
        depth: usize,
        collector: &'b UrlCollector,
        stats: &'b mut CrawlStats,
    ) -> BoxFuture<'b, ()> {
        Box::pin(async move {
            if depth > self.max_depth {
                return;
            }

            if let Some(ref callback) = self.progress_callback {
                callback(depth, url.clone());
            }

            let body = match self.cache.fetch(&url).await {
                Ok(body) => body,
                Err(e) => {
                    debug!("Abandoning {}: {}", url, e);
                    stats.pages_failed += 1;
                    return;
                }
            };
            stats.pages_visited += 1;

            for href in extract_links(&String::from_utf8_lossy(&body)) {
                match ListingLink::classify(&href) {
                    ListingLink::Skipped => stats.links_skipped += 1,
                    ListingLink::Directory(dir) => {
                        stats.directories_found += 1;
                        let next = format!("{}{}", self.target_domain, dir);
                        self.crawl_page(next, depth + 1, collector, stats).await;
                    }
                    ListingLink::File(file) => {
                        let file_url = format!("{}{}", self.target_domain, file);
                        debug!("Found file: {}", file_url);
                        if collector.add(file_url) {
                            stats.files_found += 1;
                        }
                    }
                }
            }
        })
    }
}

/// Every `<a href>` value in document order.
pub fn extract_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&LINK_SELECTOR)
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_string)
        .collect()
}
