//! Error types for job submission and polling.

use std::time::Duration;

/// Failures raised by a single submit/check call against the remote API.
///
/// The poller never classifies or retries these; they end the session as-is.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection error, request timeout, etc.
    #[error("http error: {0}")]
    Http(String),

    /// The server answered with a non-success status code.
    #[error("server returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The response body was valid JSON but not a usable envelope.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// Reading the archive from disk failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminal failures of a polling session.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The server reported `failed` for the job.
    #[error("job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    /// The attempt budget or the wall-clock budget ran out while the job was still running.
    #[error("job {job_id} did not finish within {timeout:?} ({attempts} attempts)")]
    Timeout {
        /// Last job id observed; empty if no response arrived.
        job_id: String,
        timeout: Duration,
        attempts: u32,
    },

    /// The server reported `completed` without a result payload.
    #[error("job {job_id} completed without a result")]
    ProtocolViolation { job_id: String },

    /// The caller's cancellation token fired.
    #[error("polling cancelled")]
    Cancelled,

    /// The server reported a status this client does not know, and the
    /// configured policy treats that as fatal.
    #[error("job {job_id} reported unrecognized status {status:?}")]
    UnrecognizedStatus { job_id: String, status: String },

    /// The submit/check call itself failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl PollError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PollError::Cancelled)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::Timeout { .. })
    }

    /// Job id carried by the error, if the failure happened after a response arrived.
    pub fn job_id(&self) -> Option<&str> {
        match self {
            PollError::JobFailed { job_id, .. }
            | PollError::ProtocolViolation { job_id }
            | PollError::UnrecognizedStatus { job_id, .. } => Some(job_id),
            PollError::Timeout { job_id, .. } if !job_id.is_empty() => Some(job_id),
            _ => None,
        }
    }
}

/// Returned by [`crate::delay::abortable_sleep`] when the wait was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("wait cancelled")]
pub struct Cancelled;

impl From<Cancelled> for PollError {
    fn from(_: Cancelled) -> Self {
        PollError::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_without_response_has_no_job_id() {
        let err = PollError::Timeout {
            job_id: String::new(),
            timeout: Duration::from_secs(1),
            attempts: 0,
        };
        assert!(err.is_timeout());
        assert!(!err.is_cancelled());
        assert_eq!(err.job_id(), None);
    }

    #[test]
    fn job_failure_message_includes_server_text() {
        let err = PollError::JobFailed {
            job_id: "job-7".into(),
            message: "bad archive".into(),
        };
        assert_eq!(err.to_string(), "job job-7 failed: bad archive");
        assert_eq!(err.job_id(), Some("job-7"));
    }

    #[test]
    fn cancelled_converts_into_poll_error() {
        let err: PollError = Cancelled.into();
        assert!(err.is_cancelled());
    }
}
