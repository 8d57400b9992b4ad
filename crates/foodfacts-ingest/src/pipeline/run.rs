//! Per-run state and the report emitted at the end of a run

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Stage of the import state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Locating,
    Fetching,
    Streaming,
    Sanitizing,
    DedupChecking,
    Persisting,
    Indexing,
    Completed,
    Aborted,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Locating => "locating",
            PipelineState::Fetching => "fetching",
            PipelineState::Streaming => "streaming",
            PipelineState::Sanitizing => "sanitizing",
            PipelineState::DedupChecking => "dedup_checking",
            PipelineState::Persisting => "persisting",
            PipelineState::Indexing => "indexing",
            PipelineState::Completed => "completed",
            PipelineState::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Aborted)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-local bookkeeping for one execution. Never persisted.
#[derive(Debug)]
pub struct ImportRun {
    started: Instant,
    record_started: Instant,
    accepted: usize,
    max_records: usize,
}

impl ImportRun {
    pub fn start(max_records: usize) -> Self {
        let now = Instant::now();
        Self {
            started: now,
            record_started: now,
            accepted: 0,
            max_records,
        }
    }

    /// Reset the per-record clock
    pub fn begin_record(&mut self) {
        self.record_started = Instant::now();
    }

    /// Time spent on the current record so far
    pub fn record_elapsed(&self) -> Duration {
        self.record_started.elapsed()
    }

    pub fn accept(&mut self) {
        self.accepted += 1;
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    /// Cap reached, stop pulling lines
    pub fn is_full(&self) -> bool {
        self.accepted >= self.max_records
    }

    pub fn progress_pct(&self) -> f64 {
        if self.max_records == 0 {
            return 100.0;
        }
        (self.accepted as f64 / self.max_records as f64 * 100.0).min(100.0)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Counts and timings of a finished (completed or aborted) run
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub run_id: Uuid,
    pub state: PipelineState,
    /// Dataset file resolved from the manifest, if the run got that far
    pub source_file: Option<String>,
    pub lines_read: u64,
    pub accepted: usize,
    pub skipped_missing_code: u64,
    pub skipped_malformed: u64,
    pub skipped_duplicate: u64,
    /// Records whose primary-store write failed
    pub failed: u64,
    /// Accepted records whose search index write failed
    pub index_failures: u64,
    pub max_records: usize,
    pub elapsed: Duration,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ImportReport {
    pub fn new(run_id: Uuid, max_records: usize) -> Self {
        Self {
            run_id,
            state: PipelineState::Idle,
            source_file: None,
            lines_read: 0,
            accepted: 0,
            skipped_missing_code: 0,
            skipped_malformed: 0,
            skipped_duplicate: 0,
            failed: 0,
            index_failures: 0,
            max_records,
            elapsed: Duration::ZERO,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn skipped(&self) -> u64 {
        self.skipped_missing_code + self.skipped_malformed + self.skipped_duplicate
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    pub(crate) fn finish(&mut self, state: PipelineState, elapsed: Duration) {
        self.state = state;
        self.elapsed = elapsed;
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_is_full_at_cap() {
        let mut run = ImportRun::start(2);
        assert!(!run.is_full());
        run.accept();
        assert_eq!(run.progress_pct(), 50.0);
        run.accept();
        assert!(run.is_full());
        assert_eq!(run.progress_pct(), 100.0);
    }

    #[test]
    fn test_report_skipped_total() {
        let mut report = ImportReport::new(Uuid::new_v4(), 10);
        report.skipped_missing_code = 2;
        report.skipped_malformed = 1;
        report.skipped_duplicate = 4;
        assert_eq!(report.skipped(), 7);
    }

    #[test]
    fn test_finish_sets_terminal_state() {
        let mut report = ImportReport::new(Uuid::new_v4(), 10);
        report.finish(PipelineState::Completed, Duration::from_millis(1500));
        assert!(report.state.is_terminal());
        assert_eq!(report.elapsed_ms(), 1500);
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn test_state_names() {
        assert_eq!(PipelineState::DedupChecking.to_string(), "dedup_checking");
        assert_eq!(
            serde_json::to_value(PipelineState::DedupChecking).unwrap(),
            "dedup_checking"
        );
    }
}
