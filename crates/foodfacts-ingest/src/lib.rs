//! Foodfacts Ingest Library
//!
//! Imports the food products dataset into the primary store and mirrors a
//! projection of every product into the search index.
//!
//! # Pipeline
//!
//! - **source**: resolve the latest dataset file and stream it to disk
//! - **decompression**: lazy, single-pass lines out of the gzip artifact
//! - **sanitizer**: raw JSON object to [`models::NormalizedProduct`]
//! - **dedup**: skip products whose code is already stored
//! - **pipeline**: the coordinator, its state machine and run reports
//! - **store** / **index**: primary store and search index ports
//!
//! # Example
//!
//! ```no_run
//! use foodfacts_ingest::config::IngestConfig;
//! use foodfacts_ingest::index::ElasticsearchIndex;
//! use foodfacts_ingest::pipeline::{ImportCoordinator, ImportService};
//! use foodfacts_ingest::store::PgProductStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::from_env()?;
//!     let store = Arc::new(PgProductStore::connect(&config.database).await?);
//!     let index = Arc::new(ElasticsearchIndex::new(reqwest::Client::new(), &config.search));
//!
//!     let service = ImportService::new(ImportCoordinator::from_config(&config, store, index)?);
//!     service.trigger().await?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod catalog;
pub mod config;
pub mod decompression;
pub mod dedup;
pub mod error;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod sanitizer;
pub mod scheduler;
pub mod source;
pub mod store;

pub use error::{IndexError, IngestError, Result, StoreError};
