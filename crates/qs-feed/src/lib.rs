//! Seismic bulletin feed client.
//!
//! Downloads the RSS bulletin and turns each item's description text into a
//! validated [`qs_core::Event`]. Items that cannot be read are reported back
//! instead of aborting the batch.

use std::time::Duration;

use thiserror::Error;

mod parse;

pub use parse::{FeedBatch, ItemError, RejectedItem, parse_description, parse_feed};

/// Default request timeout for feed downloads.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("quakestat/", env!("CARGO_PKG_VERSION"));

/// Feed client errors.
#[derive(Debug, Error)]
pub enum FeedError {
    /// No feed URL was configured or given.
    #[error("no feed URL configured")]
    MissingUrl,
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("feed returned status {status}")]
    Status { status: reqwest::StatusCode },
    /// The body is not well-formed XML.
    #[error("malformed feed XML: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Feed HTTP client.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
}

impl Client {
    /// Creates a client with the default timeout.
    pub fn new() -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FeedError::ClientBuild)?;
        Ok(Self { http })
    }

    /// Downloads the raw feed body.
    pub async fn fetch(&self, url: &str) -> Result<String, FeedError> {
        if url.trim().is_empty() {
            return Err(FeedError::MissingUrl);
        }
        tracing::debug!(url, "fetching feed");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status { status });
        }
        Ok(response.text().await?)
    }

    /// Downloads and parses the feed.
    pub async fn fetch_events(&self, url: &str) -> Result<FeedBatch, FeedError> {
        let body = self.fetch(url).await?;
        let batch = parse_feed(&body)?;
        tracing::info!(
            parsed = batch.events.len(),
            rejected = batch.rejected.len(),
            "parsed feed"
        );
        Ok(batch)
    }
}
