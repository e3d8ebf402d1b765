//! Daily scheduling loop for the monthly pipeline.
//!
//! Replays the upstream trigger contract: one tick per UTC day, each tick
//! supplying the first of the current month as the run's partition. Failures
//! are forwarded to the notifier and returned; retry policy stays with the
//! operator.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use tracing::{info, warn};

use crate::notify::{FailureNotifier, RunFailure};
use crate::partition::MonthKey;
use crate::pipeline::{Pipeline, RunError, RunReport};

/// Job name attached to failure events from this scheduler.
const JOB_NAME: &str = "monthly_energy_map";

/// Daily trigger that runs the pipeline for the current month.
pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    notifier: Arc<dyn FailureNotifier>,
    job_name: String,
}

impl Scheduler {
    /// Create a scheduler over a pipeline and a failure notifier.
    pub fn new(pipeline: Arc<Pipeline>, notifier: Arc<dyn FailureNotifier>) -> Self {
        Self {
            pipeline,
            notifier,
            job_name: JOB_NAME.to_string(),
        }
    }

    /// Override the job name used in failure events.
    pub fn with_job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = name.into();
        self
    }

    /// Month partition a tick at `now` runs for: the first of the current
    /// UTC month.
    pub fn month_for(now: DateTime<Utc>) -> MonthKey {
        MonthKey::containing(now.date_naive())
    }

    /// Run one scheduled tick.
    ///
    /// Executes the pipeline for the current month; on failure, forwards a
    /// [`RunFailure`] to the notifier before returning the error.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<RunReport, RunError> {
        let month = Self::month_for(now);
        info!(%month, job = %self.job_name, "scheduled run starting");

        match self.pipeline.run(&month).await {
            Ok(report) => Ok(report),
            Err(err) => {
                let failure =
                    RunFailure::from_run_error(self.job_name.as_str(), Some(month), &err);
                self.notifier.notify(&failure).await;
                Err(err)
            }
        }
    }

    /// Tick immediately, then once per day at UTC midnight, forever.
    pub async fn run_forever(&self) {
        loop {
            let now = Utc::now();
            if let Err(err) = self.tick(now).await {
                warn!(step = err.step(), "scheduled run failed: {err}");
            }

            let wait = until_next_midnight(now);
            info!(seconds = wait.as_secs(), "sleeping until next scheduled run");
            tokio::time::sleep(wait).await;
        }
    }
}

/// Duration from `now` until the next UTC midnight.
fn until_next_midnight(now: DateTime<Utc>) -> std::time::Duration {
    let next = (now.date_naive() + ChronoDuration::days(1))
        .and_time(NaiveTime::MIN)
        .and_utc();
    (next - now).to_std().unwrap_or_default()
}
