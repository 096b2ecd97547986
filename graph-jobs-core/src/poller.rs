//! # poller: drive an asynchronous job to a terminal state
//!
//! [`poll_until_complete`] repeatedly invokes a caller-supplied submit/check operation and
//! inspects each [`Envelope`] it returns:
//!
//! - `completed` with a result ends the session with that result
//! - `completed` without a result is a protocol violation
//! - `failed` ends the session with [`PollError::JobFailed`]
//! - anything else waits (server `retryAfter` or the default interval) and polls again
//!
//! Before each call the session checks, in order: cancellation, the attempt budget, the
//! wall-clock budget. Polls are strictly sequential and the wait between them is the only
//! suspension point besides the call itself. Transport errors propagate unchanged.
//!
//! Each invocation owns its [`PollingSession`]; nothing is shared between sessions.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{PollingConfig, UnknownStatusPolicy};
use crate::delay::abortable_sleep;
use crate::envelope::{Envelope, JobState};
use crate::error::{PollError, TransportError};
use crate::progress::{PollingProgress, ProgressObserver};

/// Everything one session needs besides the operation itself.
#[derive(Clone, Default)]
pub struct PollOptions {
    pub config: PollingConfig,
    pub progress: Option<Arc<dyn ProgressObserver>>,
    pub cancel: Option<CancellationToken>,
}

impl PollOptions {
    pub fn new(config: PollingConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }
}

/// Stack-local state of one poll loop.
#[derive(Debug)]
struct PollingSession {
    started: Instant,
    attempt: u32,
    job_id: String,
}

impl PollingSession {
    fn start() -> Self {
        Self {
            started: Instant::now(),
            attempt: 0,
            job_id: String::new(),
        }
    }

    fn timeout(&self, config: &PollingConfig, attempts: u32) -> PollError {
        PollError::Timeout {
            job_id: self.job_id.clone(),
            timeout: config.timeout(),
            attempts,
        }
    }
}

/// Wait before the next poll: the server's `retryAfter` if it sent one, else the default.
pub fn next_retry_delay<T>(envelope: &Envelope<T>, config: &PollingConfig) -> Duration {
    envelope
        .retry_after
        .unwrap_or_else(|| config.default_retry_interval())
}

/// Polls `check` until the job completes, fails, times out or is cancelled.
pub async fn poll_until_complete<T, F, Fut>(
    options: &PollOptions,
    mut check: F,
) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Envelope<T>, TransportError>>,
{
    let config = &options.config;
    let cancel = options.cancel.as_ref();
    let mut session = PollingSession::start();

    loop {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            debug!(job_id = %session.job_id, "Polling cancelled before next attempt");
            return Err(PollError::Cancelled);
        }

        session.attempt += 1;
        if session.attempt > config.max_polling_attempts {
            return Err(session.timeout(config, config.max_polling_attempts));
        }

        if session.started.elapsed() >= config.timeout() {
            return Err(session.timeout(config, session.attempt - 1));
        }

        let envelope = check().await?;
        // An envelope without a job id keeps the last known one.
        if !envelope.job_id.is_empty() {
            session.job_id.clone_from(&envelope.job_id);
        }

        let status = envelope.status();
        let next_retry = (!status.is_terminal()).then(|| next_retry_delay(&envelope, config));
        debug!(
            job_id = %session.job_id,
            %status,
            attempt = session.attempt,
            "Received job envelope"
        );

        if let Some(observer) = &options.progress {
            observer.on_progress(&PollingProgress {
                job_id: session.job_id.clone(),
                status: status.clone(),
                attempt: session.attempt,
                max_attempts: config.max_polling_attempts,
                elapsed: session.started.elapsed(),
                next_retry,
            });
        }

        match envelope.state {
            JobState::Completed { result: Some(result) } => return Ok(result),
            JobState::Completed { result: None } => {
                return Err(PollError::ProtocolViolation {
                    job_id: session.job_id,
                })
            }
            JobState::Failed { message } => {
                return Err(PollError::JobFailed {
                    job_id: session.job_id,
                    message: message.unwrap_or_else(|| "unknown error".to_string()),
                })
            }
            JobState::Unrecognized { status } => match config.unknown_status {
                UnknownStatusPolicy::Fail => {
                    return Err(PollError::UnrecognizedStatus {
                        job_id: session.job_id,
                        status,
                    })
                }
                UnknownStatusPolicy::Retry => {
                    warn!(job_id = %session.job_id, %status, "Unrecognized job status, polling again");
                }
            },
            JobState::Pending | JobState::Processing => {}
        }

        // Non-terminal statuses always carry a delay.
        let wait = next_retry.unwrap_or_else(|| config.default_retry_interval());
        abortable_sleep(wait, cancel).await?;
    }
}
