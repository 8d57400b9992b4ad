//! Remote dataset access
//!
//! - **endpoints**: URL builders for the manifest and dataset files
//! - **locator**: picks the latest dataset file from the manifest
//! - **fetcher**: streams the chosen file into transient local storage

pub mod endpoints;
pub mod fetcher;
pub mod locator;

pub use fetcher::StreamFetcher;
pub use locator::{parse_manifest, SourceLocator};

use crate::config::SourceConfig;
use crate::error::{IngestError, Result};
use reqwest::Client;

const USER_AGENT: &str = concat!("foodfacts-ingest/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by the locator and the fetcher.
///
/// Only the connect phase is bounded; a stalled body read is not timed out.
pub fn http_client(config: &SourceConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout())
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| IngestError::SourceUnavailable(format!("failed to build HTTP client: {}", e)))
}
