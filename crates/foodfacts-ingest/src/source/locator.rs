//! Latest dataset discovery
//!
//! The remote manifest is a plain text file with one dataset file name per
//! line. Manifest order is authoritative: the last non-blank line is the
//! latest file. No dates are parsed.

use reqwest::Client;
use tracing::{debug, info, instrument};

use super::endpoints;
use crate::config::SourceConfig;
use crate::error::{IngestError, Result};

/// Resolves which remote dataset file is the latest one
pub struct SourceLocator {
    client: Client,
    manifest_url: String,
}

impl SourceLocator {
    pub fn new(client: Client, config: &SourceConfig) -> Self {
        Self {
            client,
            manifest_url: endpoints::manifest_url(&config.data_base_url, &config.manifest_name),
        }
    }

    pub fn manifest_url(&self) -> &str {
        &self.manifest_url
    }

    /// Fetch the manifest and return its last non-blank entry
    #[instrument(skip(self), fields(url = %self.manifest_url))]
    pub async fn resolve_latest(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.manifest_url)
            .send()
            .await
            .map_err(|e| unavailable(&self.manifest_url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::SourceUnavailable(format!(
                "manifest {} responded {}",
                self.manifest_url, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| unavailable(&self.manifest_url, e))?;
        debug!(bytes = body.len(), "Manifest fetched");

        let latest = parse_manifest(&body).ok_or_else(|| {
            IngestError::SourceUnavailable(format!(
                "manifest {} lists no dataset files",
                self.manifest_url
            ))
        })?;

        info!(file = %latest, "Resolved latest dataset file");
        Ok(latest)
    }
}

fn unavailable(url: &str, err: reqwest::Error) -> IngestError {
    IngestError::SourceUnavailable(format!("failed to fetch manifest {}: {}", url, err))
}

/// Last non-blank entry of a manifest body, trimmed
pub fn parse_manifest(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .rev()
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_entry_wins() {
        assert_eq!(
            parse_manifest("a.gz\n\nb.gz\n").as_deref(),
            Some("b.gz")
        );
    }

    #[test]
    fn test_trailing_blank_lines_ignored() {
        assert_eq!(
            parse_manifest("products_01.json.gz\nproducts_02.json.gz\n\n  \n").as_deref(),
            Some("products_02.json.gz")
        );
    }

    #[test]
    fn test_crlf_manifest() {
        assert_eq!(
            parse_manifest("a.gz\r\nb.gz\r\n").as_deref(),
            Some("b.gz")
        );
    }

    #[test]
    fn test_empty_manifest() {
        assert_eq!(parse_manifest(""), None);
        assert_eq!(parse_manifest("\n \n\t\n"), None);
    }
}
