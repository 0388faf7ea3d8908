use url::Url;

/// Turn a URL into a name that is safe to use as a single file name.
///
/// The scheme is dropped and every `/` becomes `_`, so
/// `http://example.com/files/a.txt` maps to `example.com_files_a.txt`.
/// Distinct URLs can collide (`/a_b` vs `/a/b`); callers that persist
/// under this key must store the original URL alongside the data.
pub fn cache_key(url: &str) -> String {
    url.replace("http://", "")
        .replace("https://", "")
        .replace('/', "_")
}

/// Extract the `scheme://host[:port]` prefix of an http(s) URL.
///
/// Returns `None` for anything that is not an absolute http or https URL.
pub fn target_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }
    let host = parsed.host_str()?;

    match parsed.port() {
        Some(port) => Some(format!("{}://{}:{}", parsed.scheme(), host, port)),
        None => Some(format!("{}://{}", parsed.scheme(), host)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_strips_scheme_and_slashes() {
        assert_eq!(
            cache_key("http://example.com/files/a.txt"),
            "example.com_files_a.txt"
        );
        assert_eq!(cache_key("https://example.com/"), "example.com_");
    }

    #[test]
    fn test_target_domain() {
        assert_eq!(
            target_domain("http://a.test/files/"),
            Some("http://a.test".to_string())
        );
        assert_eq!(
            target_domain("https://b.test/data/x/y"),
            Some("https://b.test".to_string())
        );
    }

    #[test]
    fn test_target_domain_keeps_explicit_port() {
        assert_eq!(
            target_domain("http://127.0.0.1:8080/pub/"),
            Some("http://127.0.0.1:8080".to_string())
        );
    }

    #[test]
    fn test_target_domain_rejects_other_schemes() {
        assert_eq!(target_domain("ftp://example.com/pub/"), None);
        assert_eq!(target_domain("example.com/pub/"), None);
        assert_eq!(target_domain("not a url"), None);
    }
}
