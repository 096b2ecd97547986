#![doc = "HTTP transport for the graph generation API: one multipart submission per call."]
//
//! # HTTP transport
//!
//! [`HttpTransport`] implements [`GraphTransport`] from `graph-jobs-core` against the remote
//! API. Each call posts the archive to `/v1/graphs/{kind}` with the session's idempotency key;
//! the server either creates the job or reports on the job that key already maps to.
//!
//! - Construct with [`HttpTransport::from_env`] (`GRAPH_API_KEY`) or [`HttpTransport::new`].
//! - Non-success HTTP statuses become [`TransportError::Status`]; bodies are parsed as
//!   [`WireEnvelope`] and validated into [`Envelope`] here, never in the core.

use std::env;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use graph_jobs_core::contract::{GraphRequest, GraphTransport};
use graph_jobs_core::envelope::{Envelope, WireEnvelope};
use graph_jobs_core::error::TransportError;
use reqwest::multipart::{Form, Part};

use crate::load_config::ApiSection;

pub const API_KEY_ENV: &str = "GRAPH_API_KEY";
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";
pub const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        request_timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn from_env(api: &ApiSection) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        dotenvy::dotenv().ok(); // loads environment variables from .env if present
        let api_key = env::var(API_KEY_ENV).map_err(|e| {
            tracing::error!(error = ?e, "{API_KEY_ENV} missing in environment");
            format!("{API_KEY_ENV} must be set: {e}")
        })?;
        let transport = Self::new(
            api.base_url.clone(),
            api_key,
            api.request_timeout_secs.map(Duration::from_secs),
        )?;
        tracing::info!(base_url = %transport.base_url, "Initialized HTTP transport from environment");
        Ok(transport)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, request: &GraphRequest) -> String {
        format!("{}/v1/graphs/{}", self.base_url, request.kind.path_segment())
    }
}

#[async_trait]
impl GraphTransport for HttpTransport {
    async fn submit(
        &self,
        request: GraphRequest,
    ) -> Result<Envelope<serde_json::Value>, TransportError> {
        let url = self.endpoint(&request);
        tracing::debug!(
            url = %url,
            archive = request.archive.file_name(),
            size = request.archive.len(),
            "Submitting graph job"
        );

        // Shares the archive's buffer; every poll resends it without copying.
        let part = Part::stream_with_length(
            reqwest::Body::from(request.archive.shared_bytes()),
            request.archive.len() as u64,
        )
        .file_name(request.archive.file_name().to_string())
        .mime_str("application/zip")
        .map_err(|e| TransportError::Http(e.to_string()))?;
        let form = Form::new().part("file", part);

        let mut builder = self
            .client
            .post(&url)
            .header(IDEMPOTENCY_KEY_HEADER, request.idempotency_key.as_str())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .multipart(form);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let wire: WireEnvelope = serde_json::from_str(&body)?;
        Envelope::try_from(wire)
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let transport = HttpTransport::new("http://localhost:8080/", "k", None).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8080");
    }

    #[test]
    fn debug_hides_api_key() {
        let transport = HttpTransport::new("http://localhost", "secret-key", None).unwrap();
        let printed = format!("{transport:?}");
        assert!(!printed.contains("secret-key"));
        assert!(printed.contains("REDACTED"));
    }
}
