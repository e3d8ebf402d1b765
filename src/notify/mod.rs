//! Failure events and the notification seam.
//!
//! When a run fails, the scheduler builds a [`RunFailure`] event and hands it
//! to a [`FailureNotifier`]. Formatting and delivering the alert (chat
//! message, page, ticket) is the notifier implementation's job; this crate
//! only defines the event and ships a log-based default.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::partition::MonthKey;
use crate::pipeline::RunError;

/// Structured event describing one failed pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunFailure {
    /// Name of the job that failed.
    pub job: String,
    /// Name of the step that raised the error.
    pub step: String,
    /// Month partition of the failed run, if the run was partitioned.
    pub month: Option<MonthKey>,
    /// Error text of the failure.
    pub error: String,
    /// When the failure was observed.
    pub failed_at: DateTime<Utc>,
}

impl RunFailure {
    /// Build an event from a run error.
    pub fn from_run_error(job: impl Into<String>, month: Option<MonthKey>, error: &RunError) -> Self {
        Self {
            job: job.into(),
            step: error.step().to_string(),
            month,
            error: error.to_string(),
            failed_at: Utc::now(),
        }
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "something went wrong in *{}*:\n>`{}`", self.step, self.error)
    }
}

/// Observer for failed runs.
///
/// Implementations own delivery; the scheduler only hands the event over and
/// never waits on a delivery outcome.
#[async_trait]
pub trait FailureNotifier: Send + Sync {
    async fn notify(&self, failure: &RunFailure);
}

/// Notifier that records failures on the log only.
pub struct LogNotifier;

#[async_trait]
impl FailureNotifier for LogNotifier {
    async fn notify(&self, failure: &RunFailure) {
        error!(
            job = %failure.job,
            step = %failure.step,
            error = %failure.error,
            "pipeline run failed"
        );
    }
}
