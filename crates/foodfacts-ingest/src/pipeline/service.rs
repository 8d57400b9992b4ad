//! Single-flight entry point for triggering imports

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use super::coordinator::{ImportCoordinator, ImportFailure};
use super::run::ImportReport;

/// What a trigger did
#[derive(Debug)]
pub enum RunOutcome {
    Finished(ImportReport),
    /// Another run held the lock; nothing was done
    AlreadyRunning,
}

/// Shared handle that allows at most one import run at a time in this process.
///
/// Overlapping triggers return immediately instead of queueing, so two runs
/// never race on the local artifact path.
#[derive(Clone)]
pub struct ImportService {
    coordinator: Arc<ImportCoordinator>,
    running: Arc<Mutex<()>>,
}

impl ImportService {
    pub fn new(coordinator: ImportCoordinator) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
            running: Arc::new(Mutex::new(())),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Run an import now unless one is already in progress
    pub async fn trigger(&self) -> Result<RunOutcome, ImportFailure> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!("Import already in progress, skipping this trigger");
            return Ok(RunOutcome::AlreadyRunning);
        };

        self.coordinator.run().await.map(RunOutcome::Finished)
    }
}
