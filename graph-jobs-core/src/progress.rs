//! Progress notifications emitted once per poll.

use std::time::Duration;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use tracing::info;

use crate::envelope::JobStatus;

/// Snapshot of a polling session right after an envelope arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct PollingProgress {
    pub job_id: String,
    pub status: JobStatus,
    /// 1-based attempt number.
    pub attempt: u32,
    pub max_attempts: u32,
    pub elapsed: Duration,
    /// Wait before the next poll; `None` once the status is terminal.
    pub next_retry: Option<Duration>,
}

/// Observer invoked synchronously by the poller. Implementations must not block.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: &PollingProgress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&PollingProgress) + Send + Sync,
{
    fn on_progress(&self, progress: &PollingProgress) {
        self(progress)
    }
}

/// Logs every poll as a structured `info` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgressObserver;

impl ProgressObserver for TracingProgressObserver {
    fn on_progress(&self, progress: &PollingProgress) {
        info!(
            job_id = %progress.job_id,
            status = %progress.status,
            attempt = progress.attempt,
            max_attempts = progress.max_attempts,
            elapsed_ms = millis(progress.elapsed),
            next_retry_ms = progress.next_retry.map(millis),
            "Polling job"
        );
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
