//! Error types for product ingestion
//!
//! Only conditions that end a whole run live in [`IngestError`]. Per-record
//! conditions (missing code, malformed line, duplicate) are reported as
//! [`crate::pipeline::RecordOutcome`] variants instead.

use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Fatal pipeline errors
#[derive(Error, Debug)]
pub enum IngestError {
    /// Manifest unreachable, non-success, or empty
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Transport error or non-success response while fetching the dataset
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// The local artifact could not be decompressed
    #[error("Corrupt artifact: {0}")]
    CorruptArtifact(String),

    #[error("Primary store error: {0}")]
    Persistence(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Primary store failures
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached at all
    #[error("primary store unavailable: {0}")]
    Unavailable(String),

    /// Unique constraint on the natural key rejected the write
    #[error("product with code '{0}' already exists")]
    DuplicateKey(String),

    #[error("primary store query failed: {0}")]
    Query(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

/// Search index failures. Never fatal to an already committed primary write.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("search index request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("search index responded {status}: {body}")]
    Status { status: u16, body: String },
}
