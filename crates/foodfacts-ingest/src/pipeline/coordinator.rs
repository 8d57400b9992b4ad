//! Import coordinator
//!
//! Drives one run through `locate -> fetch -> stream -> per record
//! (sanitize -> dedup check -> persist -> index)`. Records are processed one
//! at a time in file order; the run stops once `max_records` products have
//! been accepted or the file is exhausted.
//!
//! Failure policy:
//!
//! | Condition                      | Effect                              |
//! |--------------------------------|-------------------------------------|
//! | manifest, download, gzip error | run aborted                         |
//! | dedup lookup error             | run aborted                         |
//! | malformed line, missing code   | record skipped                      |
//! | duplicate code                 | record skipped                      |
//! | store insert error             | record failed, run continues        |
//! | search index error             | warning, record still accepted      |

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

use super::run::{ImportReport, ImportRun, PipelineState};
use crate::config::IngestConfig;
use crate::decompression::LineStream;
use crate::dedup::DedupGuard;
use crate::error::{IngestError, Result, StoreError};
use crate::index::SearchIndex;
use crate::models::ProductId;
use crate::sanitizer::{normalize, parse_line, ParsedLine, ValidationError};
use crate::source::{self, SourceLocator, StreamFetcher};
use crate::store::ProductStore;

/// Why a record was not imported. Not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingCode,
    Malformed(String),
    /// A product with this code is already stored
    Duplicate(String),
}

/// Result of processing one line
#[derive(Debug)]
pub enum RecordOutcome {
    Accepted {
        code: String,
        id: ProductId,
        /// False when the search index write failed
        indexed: bool,
    },
    Skipped(SkipReason),
    Failed {
        code: String,
        cause: StoreError,
    },
}

/// A run that ended in [`PipelineState::Aborted`]
#[derive(Error, Debug)]
#[error("import aborted while {stage}: {source}")]
pub struct ImportFailure {
    /// Stage the fatal error occurred in
    pub stage: PipelineState,
    pub source: IngestError,
    /// Partial counts up to the failure
    pub report: Box<ImportReport>,
}

struct Progress {
    state: PipelineState,
    run: ImportRun,
    report: ImportReport,
}

impl Progress {
    fn enter(&mut self, state: PipelineState) {
        trace!(from = %self.state, to = %state, "Pipeline state change");
        self.state = state;
    }

    fn record(&mut self, outcome: RecordOutcome) {
        let elapsed_ms = u64::try_from(self.run.record_elapsed().as_millis()).unwrap_or(u64::MAX);
        let line = self.report.lines_read;

        match outcome {
            RecordOutcome::Accepted { code, id, indexed } => {
                self.run.accept();
                self.report.accepted = self.run.accepted();
                if !indexed {
                    self.report.index_failures += 1;
                }
                info!(
                    code = %code,
                    id = %id,
                    elapsed_ms,
                    accepted = self.run.accepted(),
                    max_records = self.run.max_records(),
                    progress_pct = self.run.progress_pct(),
                    "Product imported"
                );
            },
            RecordOutcome::Skipped(SkipReason::MissingCode) => {
                self.report.skipped_missing_code += 1;
                info!(line, "Skipping record without a product code");
            },
            RecordOutcome::Skipped(SkipReason::Malformed(reason)) => {
                self.report.skipped_malformed += 1;
                warn!(line, reason = %reason, "Skipping malformed line");
            },
            RecordOutcome::Skipped(SkipReason::Duplicate(code)) => {
                self.report.skipped_duplicate += 1;
                info!(code = %code, "Product already present, skipping");
            },
            RecordOutcome::Failed { code, cause } => {
                self.report.failed += 1;
                error!(code = %code, error = %cause, elapsed_ms, "Failed to store product");
            },
        }
    }
}

/// Runs the import pipeline against injected collaborators
pub struct ImportCoordinator {
    locator: SourceLocator,
    fetcher: StreamFetcher,
    dedup: DedupGuard,
    store: Arc<dyn ProductStore>,
    index: Arc<dyn SearchIndex>,
    max_records: usize,
}

impl ImportCoordinator {
    pub fn new(
        locator: SourceLocator,
        fetcher: StreamFetcher,
        store: Arc<dyn ProductStore>,
        index: Arc<dyn SearchIndex>,
        max_records: usize,
    ) -> Self {
        Self {
            locator,
            fetcher,
            dedup: DedupGuard::new(store.clone()),
            store,
            index,
            max_records,
        }
    }

    /// Wire the HTTP side from configuration
    pub fn from_config(
        config: &IngestConfig,
        store: Arc<dyn ProductStore>,
        index: Arc<dyn SearchIndex>,
    ) -> Result<Self> {
        let client = source::http_client(&config.source)?;
        Ok(Self::new(
            SourceLocator::new(client.clone(), &config.source),
            StreamFetcher::new(client, &config.source),
            store,
            index,
            config.max_records_per_run,
        ))
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    /// Execute one import run.
    ///
    /// Returns the final report on completion, or the fatal error with the
    /// partial report on abort.
    pub async fn run(&self) -> std::result::Result<ImportReport, ImportFailure> {
        let run_id = Uuid::new_v4();
        self.execute(run_id)
            .instrument(info_span!("import_run", %run_id))
            .await
    }

    async fn execute(&self, run_id: Uuid) -> std::result::Result<ImportReport, ImportFailure> {
        let mut progress = Progress {
            state: PipelineState::Idle,
            run: ImportRun::start(self.max_records),
            report: ImportReport::new(run_id, self.max_records),
        };
        info!(max_records = self.max_records, "Import started");

        match self.drive(&mut progress).await {
            Ok(()) => {
                progress.enter(PipelineState::Completed);
                let elapsed = progress.run.elapsed();
                progress.report.finish(PipelineState::Completed, elapsed);

                let report = progress.report;
                info!(
                    state = %report.state,
                    lines_read = report.lines_read,
                    accepted = report.accepted,
                    skipped = report.skipped(),
                    failed = report.failed,
                    index_failures = report.index_failures,
                    elapsed_ms = report.elapsed_ms(),
                    "Import completed"
                );
                Ok(report)
            },
            Err(source) => {
                let stage = progress.state;
                progress.enter(PipelineState::Aborted);
                let elapsed = progress.run.elapsed();
                progress.report.finish(PipelineState::Aborted, elapsed);

                let report = progress.report;
                error!(
                    state = %report.state,
                    stage = %stage,
                    error = %source,
                    lines_read = report.lines_read,
                    accepted = report.accepted,
                    skipped = report.skipped(),
                    failed = report.failed,
                    elapsed_ms = report.elapsed_ms(),
                    "Import aborted"
                );
                Err(ImportFailure {
                    stage,
                    source,
                    report: Box::new(report),
                })
            },
        }
    }

    async fn drive(&self, progress: &mut Progress) -> Result<()> {
        progress.enter(PipelineState::Locating);
        let filename = self.locator.resolve_latest().await?;
        progress.report.source_file = Some(filename.clone());

        progress.enter(PipelineState::Fetching);
        let path = self.fetcher.download(&filename).await?;

        progress.enter(PipelineState::Streaming);
        let mut lines = LineStream::open(path);

        while !progress.run.is_full() {
            let Some(line) = lines.next_line().await else {
                debug!("Dataset exhausted before reaching the record cap");
                break;
            };
            let line = line?;
            progress.report.lines_read += 1;

            if line.trim().is_empty() {
                continue;
            }

            progress.run.begin_record();
            let outcome = self.process_line(&line, progress).await?;
            progress.record(outcome);
            progress.enter(PipelineState::Streaming);
        }

        Ok(())
    }

    /// Handle one line. Only a failed dedup lookup escapes as an error.
    async fn process_line(&self, line: &str, progress: &mut Progress) -> Result<RecordOutcome> {
        progress.enter(PipelineState::Sanitizing);
        let raw = match parse_line(line) {
            ParsedLine::Record(raw) => raw,
            ParsedLine::Malformed(reason) => {
                return Ok(RecordOutcome::Skipped(SkipReason::Malformed(reason)));
            },
        };
        let product = match normalize(&raw, Utc::now()) {
            Ok(product) => product,
            Err(ValidationError::MissingCode) => {
                return Ok(RecordOutcome::Skipped(SkipReason::MissingCode));
            },
        };

        progress.enter(PipelineState::DedupChecking);
        if self.dedup.already_exists(&product.code).await? {
            return Ok(RecordOutcome::Skipped(SkipReason::Duplicate(product.code)));
        }

        progress.enter(PipelineState::Persisting);
        let stored = match self.store.insert(&product).await {
            Ok(stored) => stored,
            Err(StoreError::DuplicateKey(code)) => {
                return Ok(RecordOutcome::Skipped(SkipReason::Duplicate(code)));
            },
            Err(cause) => {
                return Ok(RecordOutcome::Failed {
                    code: product.code,
                    cause,
                });
            },
        };

        progress.enter(PipelineState::Indexing);
        let indexed = match self.index.upsert(&stored.id, &stored.index_document()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    code = %stored.code(),
                    id = %stored.id,
                    error = %e,
                    "Search index write failed, product kept in primary store"
                );
                false
            },
        };

        Ok(RecordOutcome::Accepted {
            code: product.code,
            id: stored.id,
            indexed,
        })
    }
}
