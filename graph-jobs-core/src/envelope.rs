//! # envelope: the per-poll response of an asynchronous job
//!
//! The server answers every submit/check call with a small JSON envelope:
//!
//! ```json
//! { "status": "processing", "jobId": "c0ffee", "retryAfter": 5 }
//! ```
//!
//! [`WireEnvelope`] is that shape as it appears on the wire. It is converted once, at the
//! transport boundary, into [`Envelope`], whose [`JobState`] is a closed variant the poller
//! can match on exhaustively instead of comparing strings.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Envelope exactly as the server serializes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEnvelope {
    pub status: String,
    #[serde(default)]
    pub job_id: String,
    /// Seconds to wait before the next poll.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

/// Status of a job as reported in one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Unrecognized(String),
}

impl JobStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "pending" => JobStatus::Pending,
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            other => JobStatus::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Unrecognized(raw) => raw,
        }
    }

    /// `completed` and `failed` end a polling session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the job is doing, with the payload that belongs to that state.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState<T> {
    Pending,
    Processing,
    /// `result` is `None` when the server broke its contract and sent no payload.
    Completed { result: Option<T> },
    Failed { message: Option<String> },
    Unrecognized { status: String },
}

impl<T> JobState<T> {
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Pending => JobStatus::Pending,
            JobState::Processing => JobStatus::Processing,
            JobState::Completed { .. } => JobStatus::Completed,
            JobState::Failed { .. } => JobStatus::Failed,
            JobState::Unrecognized { status } => JobStatus::Unrecognized(status.clone()),
        }
    }
}

/// One poll's response, after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub job_id: String,
    /// Server-requested wait before the next poll. Never zero.
    pub retry_after: Option<Duration>,
    pub state: JobState<T>,
}

impl<T> Envelope<T> {
    pub fn pending(job_id: impl Into<String>) -> Self {
        Self::with_state(job_id, JobState::Pending)
    }

    pub fn processing(job_id: impl Into<String>) -> Self {
        Self::with_state(job_id, JobState::Processing)
    }

    pub fn completed(job_id: impl Into<String>, result: T) -> Self {
        Self::with_state(job_id, JobState::Completed { result: Some(result) })
    }

    pub fn failed(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_state(
            job_id,
            JobState::Failed {
                message: Some(message.into()),
            },
        )
    }

    pub fn with_state(job_id: impl Into<String>, state: JobState<T>) -> Self {
        Self {
            job_id: job_id.into(),
            retry_after: None,
            state,
        }
    }

    pub fn retry_after(mut self, wait: Duration) -> Self {
        self.retry_after = (!wait.is_zero()).then_some(wait);
        self
    }

    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    /// Converts the result payload, leaving every other field untouched.
    pub fn try_map_result<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Envelope<U>, E> {
        let state = match self.state {
            JobState::Pending => JobState::Pending,
            JobState::Processing => JobState::Processing,
            JobState::Completed { result } => JobState::Completed {
                result: result.map(f).transpose()?,
            },
            JobState::Failed { message } => JobState::Failed { message },
            JobState::Unrecognized { status } => JobState::Unrecognized { status },
        };
        Ok(Envelope {
            job_id: self.job_id,
            retry_after: self.retry_after,
            state,
        })
    }
}

impl Envelope<serde_json::Value> {
    /// Decodes the JSON result into the operation's typed result.
    pub fn decode<T: serde::de::DeserializeOwned>(self) -> Result<Envelope<T>, TransportError> {
        self.try_map_result(|value| serde_json::from_value(value).map_err(TransportError::from))
    }
}

/// Converts a server `retryAfter` in seconds into a wait. Absent, non-positive and
/// non-finite values mean "use the default interval".
fn retry_after_from_secs(secs: Option<f64>) -> Option<Duration> {
    secs.filter(|s| s.is_finite() && *s > 0.0)
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
}

impl TryFrom<WireEnvelope> for Envelope<serde_json::Value> {
    type Error = TransportError;

    fn try_from(wire: WireEnvelope) -> Result<Self, Self::Error> {
        let state = match JobStatus::parse(&wire.status) {
            JobStatus::Pending => JobState::Pending,
            JobStatus::Processing => JobState::Processing,
            // `null` counts as a missing result.
            JobStatus::Completed => JobState::Completed {
                result: wire.result.filter(|v| !v.is_null()),
            },
            JobStatus::Failed => JobState::Failed {
                message: wire.error,
            },
            JobStatus::Unrecognized(status) => {
                if status.is_empty() {
                    return Err(TransportError::InvalidEnvelope(
                        "envelope has an empty status".to_string(),
                    ));
                }
                JobState::Unrecognized { status }
            }
        };
        Ok(Envelope {
            job_id: wire.job_id,
            retry_after: retry_after_from_secs(wire.retry_after),
            state,
        })
    }
}
