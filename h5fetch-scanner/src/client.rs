use crate::error::Result;
use reqwest::Client;
use std::time::Duration;

/// HTTP client shared by page fetches and file downloads.
///
/// No request timeout is set: large downloads may legitimately take hours.
pub fn http_client() -> Result<Client> {
    let client = Client::builder()
        .user_agent(concat!("h5fetch/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(50)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?;
    Ok(client)
}
