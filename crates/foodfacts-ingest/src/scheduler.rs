//! Daily import scheduling
//!
//! Registers [`ImportService::trigger`] as a cron job evaluated in the
//! configured timezone. A failed run is logged and the scheduler keeps going;
//! a trigger that fires while the previous run is still busy is skipped.

use anyhow::{Context, Result};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::ScheduleConfig;
use crate::pipeline::{ImportService, RunOutcome};

/// Running cron scheduler with the import job registered
pub struct ImportScheduler {
    scheduler: JobScheduler,
    job_id: Uuid,
}

impl ImportScheduler {
    /// Register the import job and start ticking
    pub async fn start(service: ImportService, config: &ScheduleConfig) -> Result<Self> {
        let tz = config.tz()?;

        let job = Job::new_async_tz(config.cron.as_str(), tz, move |job_id, _scheduler| {
            let service = service.clone();
            Box::pin(
                async move {
                    info!("Scheduled import triggered");
                    match service.trigger().await {
                        Ok(RunOutcome::Finished(report)) => info!(
                            accepted = report.accepted,
                            elapsed_ms = report.elapsed_ms(),
                            "Scheduled import completed"
                        ),
                        Ok(RunOutcome::AlreadyRunning) => {
                            info!("Scheduled import skipped, previous run still active")
                        },
                        Err(failure) => error!(
                            error = %failure,
                            accepted = failure.report.accepted,
                            "Scheduled import failed"
                        ),
                    }
                }
                .instrument(info_span!("scheduled_import", %job_id)),
            )
        })
        .with_context(|| format!("Invalid import schedule '{}'", config.cron))?;

        let mut scheduler = JobScheduler::new()
            .await
            .context("Failed to create job scheduler")?;
        let job_id = scheduler
            .add(job)
            .await
            .context("Failed to register import job")?;
        scheduler
            .start()
            .await
            .context("Failed to start job scheduler")?;

        let next_run = scheduler.next_tick_for_job(job_id).await.ok().flatten();
        info!(
            cron = %config.cron,
            timezone = %config.timezone,
            next_run = ?next_run,
            "Import scheduler started"
        );

        Ok(Self { scheduler, job_id })
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Stop firing new runs
    pub async fn shutdown(mut self) -> Result<()> {
        self.scheduler
            .shutdown()
            .await
            .context("Failed to shut down job scheduler")?;
        info!("Import scheduler stopped");
        Ok(())
    }
}
