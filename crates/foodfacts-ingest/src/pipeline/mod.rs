//! Import pipeline
//!
//! - **run**: state machine stages, per-run bookkeeping and the final report
//! - **coordinator**: the end-to-end sequence and its failure policy
//! - **service**: single-flight wrapper used by the CLI and the scheduler

pub mod coordinator;
pub mod run;
pub mod service;

pub use coordinator::{ImportCoordinator, ImportFailure, RecordOutcome, SkipReason};
pub use run::{ImportReport, ImportRun, PipelineState};
pub use service::{ImportService, RunOutcome};
