use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::idempotency::{IdempotencyKeyGenerator, UuidKeyGenerator};
use crate::progress::ProgressObserver;

pub const DEFAULT_TIMEOUT_MS: u64 = 900_000;
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_MAX_POLLING_ATTEMPTS: u32 = 90;

/// What the poller does with a status string it does not recognize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownStatusPolicy {
    /// Keep polling, as for `pending`, within the attempt and time budgets.
    #[default]
    Retry,
    /// End the session with [`crate::error::PollError::UnrecognizedStatus`].
    Fail,
}

/// Budgets and intervals for one polling session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub timeout_ms: u64,
    pub default_retry_interval_ms: u64,
    pub max_polling_attempts: u32,
    pub unknown_status: UnknownStatusPolicy,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            default_retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            max_polling_attempts: DEFAULT_MAX_POLLING_ATTEMPTS,
            unknown_status: UnknownStatusPolicy::Retry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_polling_attempts must be at least 1")]
    NoAttempts,
    #[error("default_retry_interval_ms must be greater than zero")]
    ZeroRetryInterval,
}

impl PollingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn default_retry_interval(&self) -> Duration {
        Duration::from_millis(self.default_retry_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_polling_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        if self.default_retry_interval_ms == 0 {
            return Err(ConfigError::ZeroRetryInterval);
        }
        Ok(())
    }

    pub fn trace_loaded(&self) {
        info!(
            timeout_ms = self.timeout_ms,
            default_retry_interval_ms = self.default_retry_interval_ms,
            max_polling_attempts = self.max_polling_attempts,
            "Loaded polling config"
        );
        debug!(?self, "Polling config loaded (full debug)");
    }
}

/// Client-wide defaults shared by every call a [`crate::client::GraphClient`] makes.
#[derive(Clone, Default)]
pub struct ClientOptions {
    pub polling: PollingConfig,
    pub progress: Option<Arc<dyn ProgressObserver>>,
    pub key_generator: Option<Arc<dyn IdempotencyKeyGenerator>>,
    pub cancel: Option<CancellationToken>,
}

impl ClientOptions {
    pub fn new(polling: PollingConfig) -> Self {
        Self {
            polling,
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.progress = Some(Arc::new(observer));
        self
    }

    pub fn with_key_generator(mut self, generator: impl IdempotencyKeyGenerator + 'static) -> Self {
        self.key_generator = Some(Arc::new(generator));
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn generate_key(&self) -> String {
        match &self.key_generator {
            Some(generator) => generator.generate(),
            None => UuidKeyGenerator.generate(),
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("polling", &self.polling)
            .field("progress", &self.progress.is_some())
            .field("key_generator", &self.key_generator.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// Per-call overrides. A per-call `cancel` replaces the client-level token entirely.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub idempotency_key: Option<String>,
    pub cancel: Option<CancellationToken>,
    /// Extra request headers handed to the transport unchanged.
    pub headers: Vec<(String, String)>,
}

impl CallOptions {
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}
