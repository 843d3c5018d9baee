use anyhow::Result;
use std::time::Instant;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SchedulerConfig;
use crate::db::Store;

/// Runs the monthly quota reset on a cron schedule.
pub struct Scheduler {
    store: Store,
    config: SchedulerConfig,
}

impl Scheduler {
    #[must_use]
    pub const fn new(store: Store, config: SchedulerConfig) -> Self {
        Self { store, config }
    }

    /// Starts the job scheduler. Returns `None` when the job is disabled;
    /// the returned scheduler must be kept alive for the job to keep firing.
    pub async fn start(&self) -> Result<Option<JobScheduler>> {
        if !self.config.usage_reset_enabled {
            info!("Usage reset job is disabled in config");
            return Ok(None);
        }

        let sched = JobScheduler::new().await?;
        let store = self.store.clone();

        let job = Job::new_async(self.config.usage_reset_cron.as_str(), move |_uuid, _lock| {
            let store = store.clone();
            Box::pin(async move {
                if let Err(e) = reset_monthly_usage(&store).await {
                    error!(event = "job_failed", job_name = "reset_usage", error = %e, "Scheduled usage reset failed");
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Usage reset scheduled with cron: {}", self.config.usage_reset_cron);
        Ok(Some(sched))
    }
}

/// Zeroes every company's monthly counter; shared by the cron job and CLI.
pub async fn reset_monthly_usage(store: &Store) -> Result<u64> {
    let start = Instant::now();
    info!(event = "job_started", job_name = "reset_usage", "Resetting monthly usage");

    let companies = store.reset_monthly_usage().await?;

    info!(
        event = "job_finished",
        job_name = "reset_usage",
        companies,
        duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Monthly usage reset"
    );
    Ok(companies)
}
