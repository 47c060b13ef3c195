//! Author index fetching and work-link discovery.
//!
//! Each run starts from a single fixed seed URL: the author's index page on
//! the archive site. This crate fetches that page and turns its raw HTML into
//! an ordered, deduplicated list of [`WorkCandidate`]s restricted to the
//! author's namespace.

mod parser;

use std::time::Duration;

use anthology_shared::{AnthologyError, Result};
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

pub use parser::{IndexScope, discover_works};

/// Maximum number of redirects to follow on archive fetches.
const MAX_REDIRECTS: usize = 3;

/// User-Agent string for archive requests.
const USER_AGENT: &str = concat!("Anthology/", env!("CARGO_PKG_VERSION"));

/// Build the process-wide HTTP client used for all archive fetches.
///
/// Created once at startup and reused across the run; every request is
/// bounded by `timeout_secs`.
pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AnthologyError::Network(format!("failed to build HTTP client: {e}")))
}

/// Fetch the author's index page.
///
/// Any transport error, timeout, or non-2xx status is a [`AnthologyError::Network`];
/// the orchestrator treats a seed-page failure as fatal for the run, since no
/// candidates can be produced without it.
#[instrument(skip_all, fields(url = %seed_url))]
pub async fn fetch_index(client: &Client, seed_url: &Url) -> Result<String> {
    info!("fetching author index");
    fetch_html(client, seed_url).await
}

/// Fetch a single page and return its HTML body.
///
/// Shared by index and work-page fetches: same timeout, same status policy.
pub async fn fetch_html(client: &Client, url: &Url) -> Result<String> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| AnthologyError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AnthologyError::Network(format!("{url}: HTTP {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| AnthologyError::Network(format!("{url}: failed to read body: {e}")))?;

    debug!(len = body.len(), "page fetched");
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_index_returns_body() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_string("<html>index</html>"),
            )
            .mount(&server)
            .await;

        let client = build_client(5).unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let body = fetch_index(&client, &url).await.unwrap();
        assert!(body.contains("index"));
    }

    #[tokio::test]
    async fn fetch_index_non_2xx_is_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = build_client(5).unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let err = fetch_index(&client, &url).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn fetch_index_connection_refused_is_error() {
        // Nothing listens on this port.
        let client = build_client(1).unwrap();
        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        let result = fetch_index(&client, &url).await;
        assert!(matches!(result, Err(AnthologyError::Network(_))));
    }
}
