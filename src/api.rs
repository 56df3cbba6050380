use std::time::Duration;

use anyhow::Context;
use log::{debug, info};
use reqwest::Url;

/// Sent with every request; the survey pages are served to browsers.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

pub fn reqwest_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connection_verbose(true)
        .build()
}

/// Downloads one page.  A non-success status is an error; there is no retry.
pub async fn fetch_page(client: &reqwest::Client, url: &Url) -> anyhow::Result<String> {
    info!("Fetching {url}");
    let response = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("Failed to request {url}"))?;
    let status = response.status();
    let response = response
        .error_for_status()
        .with_context(|| format!("{url} returned {status}"))?;
    let body = response
        .text()
        .await
        .with_context(|| format!("Failed to read the body of {url}"))?;
    debug!("Received {} bytes from {url}", body.len());
    Ok(body)
}
