use crate::error::{Result, ScanError};
use crate::retry::RetryPolicy;
use crate::urls::cache_key;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// On-disk form of one cached response.
///
/// The URL is stored so that two URLs sharing a key never read each other's body.
#[derive(Debug, Serialize, Deserialize)]
struct CachedResponse {
    url: String,
    body: Vec<u8>,
}

/// Persistent cache of raw page bodies, one file per URL.
///
/// Entries never expire. All fetches are serialized through one lock, which
/// is held for the whole lookup, network request and write.
pub struct ResponseCache {
    dir: PathBuf,
    client: Client,
    retry: RetryPolicy,
    lock: Mutex<()>,
    network_fetches: AtomicUsize,
}

impl ResponseCache {
    /// Open (creating if needed) a cache rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>, client: Client) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            client,
            retry: RetryPolicy::default(),
            lock: Mutex::new(()),
            network_fetches: AtomicUsize::new(0),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of HTTP requests issued so far, retries included.
    pub fn network_fetches(&self) -> usize {
        self.network_fetches.load(Ordering::Relaxed)
    }

    pub fn entry_path(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.json", cache_key(url)))
    }

    /// Return the body for `url`, from disk when cached, otherwise over HTTP.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let _guard = self.lock.lock().await;
        let path = self.entry_path(url);

        if let Some(body) = Self::read_entry(&path, url).await {
            debug!("Cache hit for {}", url);
            return Ok(body);
        }

        let body = self.retry.run(url, || self.request(url)).await?;

        if let Err(e) = Self::write_entry(&path, url, &body).await {
            warn!("Could not cache {} at {}: {}", url, path.display(), e);
        }

        Ok(body)
    }

    async fn request(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Fetching {}", url);
        self.network_fetches.fetch_add(1, Ordering::Relaxed);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn read_entry(path: &Path, url: &str) -> Option<Vec<u8>> {
        let data = tokio::fs::read(path).await.ok()?;
        match serde_json::from_slice::<CachedResponse>(&data) {
            Ok(entry) if entry.url == url => Some(entry.body),
            Ok(entry) => {
                debug!("Cache key collision: {} is holding {}", path.display(), entry.url);
                None
            }
            Err(e) => {
                debug!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn write_entry(path: &Path, url: &str, body: &[u8]) -> Result<()> {
        let entry = CachedResponse {
            url: url.to_string(),
            body: body.to_vec(),
        };
        let data = serde_json::to_vec(&entry)?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::http_client;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn open_cache(dir: &TempDir) -> ResponseCache {
        ResponseCache::open(dir.path().join("url_cache"), http_client().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_disk() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pub/"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<html>listing</html>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir);
        let url = format!("{}/pub/", mock_server.uri());

        let first = cache.fetch(&url).await.unwrap();
        let second = cache.fetch(&url).await.unwrap();

        assert_eq!(first, b"<html>listing</html>");
        assert_eq!(first, second);
        assert_eq!(cache.network_fetches(), 1);
        assert!(cache.entry_path(&url).exists());
    }

    #[tokio::test]
    async fn test_cache_survives_reopen() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pub/"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"body"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dir = TempDir::new().unwrap();
        let url = format!("{}/pub/", mock_server.uri());

        open_cache(&dir).fetch(&url).await.unwrap();

        let reopened = open_cache(&dir);
        assert_eq!(reopened.fetch(&url).await.unwrap(), b"body");
        assert_eq!(reopened.network_fetches(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pub/"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh"))
            .mount(&mock_server)
            .await;

        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir);
        let url = format!("{}/pub/", mock_server.uri());
        std::fs::write(cache.entry_path(&url), b"\x00not json").unwrap();

        assert_eq!(cache.fetch(&url).await.unwrap(), b"fresh");
        assert_eq!(cache.network_fetches(), 1);
    }

    #[tokio::test]
    async fn test_key_collision_is_a_miss() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a_b"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"underscore"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/a/b"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"slash"))
            .mount(&mock_server)
            .await;

        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir);

        let underscore = format!("{}/a_b", mock_server.uri());
        let slash = format!("{}/a/b", mock_server.uri());
        assert_eq!(cache.entry_path(&underscore), cache.entry_path(&slash));

        assert_eq!(cache.fetch(&underscore).await.unwrap(), b"underscore");
        assert_eq!(cache.fetch(&slash).await.unwrap(), b"slash");
        assert_eq!(cache.network_fetches(), 2);
    }

    #[tokio::test]
    async fn test_error_status_is_not_cached() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir);
        let url = format!("{}/missing/", mock_server.uri());

        let err = cache.fetch(&url).await.unwrap_err();
        assert!(matches!(err, ScanError::HttpStatus { status: 404, .. }));
        assert!(!cache.entry_path(&url).exists());
    }

    #[tokio::test]
    async fn test_unwritable_cache_still_returns_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pub/"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok"))
            .mount(&mock_server)
            .await;

        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir);
        std::fs::remove_dir_all(cache.dir()).unwrap();

        let url = format!("{}/pub/", mock_server.uri());
        assert_eq!(cache.fetch(&url).await.unwrap(), b"ok");
    }

    #[tokio::test]
    async fn test_retry_policy_applies_to_page_fetches() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky/"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky/"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"recovered"))
            .mount(&mock_server)
            .await;

        let dir = TempDir::new().unwrap();
        let retry = RetryPolicy::with_retries(1)
            .with_backoff(Duration::from_millis(10), Duration::from_millis(10));
        let cache = open_cache(&dir).with_retry(retry);
        let url = format!("{}/flaky/", mock_server.uri());

        assert_eq!(cache.fetch(&url).await.unwrap(), b"recovered");
        assert_eq!(cache.network_fetches(), 2);
    }
}
