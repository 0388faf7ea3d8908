use crate::error::{CoreError, Result};
use crate::tracker::DownloadTracker;
use h5fetch_scanner::target_domain;
use std::path::{Component, Path, PathBuf};

/// One crawl root and how deep to follow its listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub root_url: String,
    pub max_depth: usize,
}

impl CrawlTask {
    pub fn new(root_url: impl Into<String>, max_depth: usize) -> Self {
        Self {
            root_url: root_url.into(),
            max_depth,
        }
    }

    /// `scheme://host[:port]` of the root, or an error for non-http(s) roots.
    pub fn target_domain(&self) -> Result<String> {
        target_domain(&self.root_url).ok_or_else(|| CoreError::InvalidRoot(self.root_url.clone()))
    }
}

/// A single file to fetch in this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub url: String,
    pub destination: PathBuf,
    pub target_domain: String,
    pub root_url: String,
}

/// Percent-decode `s`, falling back to the input when it is not valid UTF-8.
pub fn decode_path(s: &str) -> String {
    urlencoding::decode(s)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

/// Server path of `url` below its target domain, without the leading `/`.
fn server_path<'a>(target_domain: &str, url: &'a str) -> &'a str {
    url.strip_prefix(target_domain)
        .unwrap_or(url)
        .trim_start_matches('/')
}

/// Decoded server path as shown in export files.
pub fn relative_export_path(target_domain: &str, url: &str) -> String {
    decode_path(server_path(target_domain, url))
}

/// Where `url` is written on disk.
///
/// Mirrors the server layout under `output_dir`, or keeps only the file name
/// when `flat` is set. `.` and `..` segments produced by decoding are dropped
/// so a listing can never place files outside `output_dir`.
pub fn download_path(target_domain: &str, url: &str, output_dir: &Path, flat: bool) -> PathBuf {
    let path = server_path(target_domain, url);
    let relative = if flat {
        path.rsplit('/').next().unwrap_or(path)
    } else {
        path
    };

    let decoded = decode_path(relative);
    let mut destination = output_dir.to_path_buf();
    for component in Path::new(&decoded).components() {
        if let Component::Normal(part) = component {
            destination.push(part);
        }
    }
    destination
}

/// Build this run's download tasks for one root.
///
/// A URL is skipped only when the ledger has it AND its file still exists.
pub async fn plan_downloads(
    root_url: &str,
    target_domain: &str,
    urls: &[String],
    tracker: &DownloadTracker,
    output_dir: &Path,
    flat: bool,
) -> Vec<DownloadTask> {
    let mut tasks = Vec::new();
    for url in urls {
        let destination = download_path(target_domain, url, output_dir, flat);
        if tracker.is_resumable(url, &destination).await {
            continue;
        }
        tasks.push(DownloadTask {
            url: url.clone(),
            destination,
            target_domain: target_domain.to_string(),
            root_url: root_url.to_string(),
        });
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_path_mirrors_server_layout() {
        let path = download_path(
            "http://a.test",
            "http://a.test/files/sub/My%20File.txt",
            Path::new("./files"),
            false,
        );
        assert_eq!(path, PathBuf::from("./files/files/sub/My File.txt"));
    }

    #[test]
    fn test_download_path_flat_keeps_basename() {
        let path = download_path(
            "http://a.test",
            "http://a.test/files/sub/My%20File.txt",
            Path::new("out"),
            true,
        );
        assert_eq!(path, PathBuf::from("out/My File.txt"));
    }

    #[test]
    fn test_download_path_drops_dot_segments() {
        let path = download_path(
            "http://a.test",
            "http://a.test/files/%2E%2E/%2E%2E/etc/passwd",
            Path::new("out"),
            false,
        );
        assert_eq!(path, PathBuf::from("out/files/etc/passwd"));
    }

    #[test]
    fn test_invalid_utf8_escape_is_left_encoded() {
        assert_eq!(decode_path("bad%FFname"), "bad%FFname");
        assert_eq!(decode_path("a%2Fb"), "a/b");
    }

    #[test]
    fn test_relative_export_path() {
        assert_eq!(
            relative_export_path("http://a.test", "http://a.test/files/%C3%A9t%C3%A9.mkv"),
            "files/été.mkv"
        );
    }

    #[test]
    fn test_crawl_task_target_domain() {
        let task = CrawlTask::new("http://a.test/files/", 1);
        assert_eq!(task.target_domain().unwrap(), "http://a.test");

        let bad = CrawlTask::new("a.test/files/", 1);
        assert!(matches!(bad.target_domain(), Err(CoreError::InvalidRoot(_))));
    }
}
