//! Streamed dataset download
//!
//! The response body is written chunk by chunk, so memory use stays flat no
//! matter how large the dataset is. The destination is a single well-known
//! file that every run overwrites.

use futures::StreamExt;
use reqwest::Client;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use super::endpoints;
use crate::config::SourceConfig;
use crate::error::{IngestError, Result};

/// Emit a debug progress line every this many bytes
const PROGRESS_STEP_BYTES: u64 = 16 * 1024 * 1024;

/// Downloads a remote dataset file into transient local storage
pub struct StreamFetcher {
    client: Client,
    base_url: String,
    tmp_dir: PathBuf,
    artifact_path: PathBuf,
}

impl StreamFetcher {
    pub fn new(client: Client, config: &SourceConfig) -> Self {
        Self {
            client,
            base_url: config.data_base_url.clone(),
            tmp_dir: config.tmp_dir.clone(),
            artifact_path: config.artifact_path(),
        }
    }

    /// Local path every download is written to
    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// Stream `filename` from the remote dataset directory to the local artifact path
    #[instrument(skip(self), fields(path = %self.artifact_path.display()))]
    pub async fn download(&self, filename: &str) -> Result<PathBuf> {
        let url = endpoints::dataset_url(&self.base_url, filename);

        tokio::fs::create_dir_all(&self.tmp_dir)
            .await
            .map_err(|e| failed(format!("cannot create {}", self.tmp_dir.display()), e))?;

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| failed(format!("GET {}", url), e))?;

        let expected = response.content_length();
        info!(url = %url, expected_bytes = ?expected, "Downloading dataset");

        let mut file = tokio::fs::File::create(&self.artifact_path)
            .await
            .map_err(|e| failed(format!("cannot create {}", self.artifact_path.display()), e))?;

        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        let mut next_report = PROGRESS_STEP_BYTES;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| failed(format!("transfer of {} interrupted", url), e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| failed(format!("write to {}", self.artifact_path.display()), e))?;
            written += chunk.len() as u64;

            if written >= next_report {
                debug!(written_bytes = written, expected_bytes = ?expected, "Download progress");
                next_report += PROGRESS_STEP_BYTES;
            }
        }

        file.flush()
            .await
            .map_err(|e| failed("flush downloaded artifact", e))?;
        file.sync_all()
            .await
            .map_err(|e| failed("sync downloaded artifact", e))?;
        drop(file);

        info!(written_bytes = written, "Dataset downloaded");
        Ok(self.artifact_path.clone())
    }
}

fn failed(context: impl Display, err: impl Display) -> IngestError {
    IngestError::DownloadFailed(format!("{}: {}", context, err))
}
