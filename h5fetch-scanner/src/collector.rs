use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Collected {
    urls: Vec<String>,
    seen: HashSet<String>,
}

/// Append-only list of file URLs discovered under one crawl root.
///
/// Safe to share between concurrent crawl branches. Insertion order is kept.
/// Repeated URLs are kept as well unless the collector was built with
/// [`UrlCollector::with_dedup`].
#[derive(Default)]
pub struct UrlCollector {
    inner: Mutex<Collected>,
    dedup: bool,
}

impl UrlCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dedup(dedup: bool) -> Self {
        Self {
            inner: Mutex::new(Collected::default()),
            dedup,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Collected> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a discovered URL. Returns false when dedup dropped it.
    pub fn add(&self, url: String) -> bool {
        let mut collected = self.lock();
        if self.dedup && !collected.seen.insert(url.clone()) {
            return false;
        }
        collected.urls.push(url);
        true
    }

    pub fn len(&self) -> usize {
        self.lock().urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of everything collected so far.
    pub fn urls(&self) -> Vec<String> {
        self.lock().urls.clone()
    }

    pub fn into_urls(self) -> Vec<String> {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_keeps_duplicates_by_default() {
        let collector = UrlCollector::new();
        assert!(collector.add("http://a.test/x".to_string()));
        assert!(collector.add("http://a.test/y".to_string()));
        assert!(collector.add("http://a.test/x".to_string()));

        assert_eq!(
            collector.into_urls(),
            vec!["http://a.test/x", "http://a.test/y", "http://a.test/x"]
        );
    }

    #[test]
    fn test_dedup_drops_repeats() {
        let collector = UrlCollector::with_dedup(true);
        assert!(collector.add("http://a.test/x".to_string()));
        assert!(!collector.add("http://a.test/x".to_string()));
        assert!(collector.add("http://a.test/y".to_string()));

        assert_eq!(collector.urls(), vec!["http://a.test/x", "http://a.test/y"]);
    }

    #[test]
    fn test_concurrent_adds_are_all_kept() {
        let collector = Arc::new(UrlCollector::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let collector = collector.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        collector.add(format!("http://a.test/{}/{}", t, i));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(collector.len(), 800);
    }
}
