//! # contract: the transport the poller drives
//!
//! This module defines a single trait ([`GraphTransport`]) and the request it receives. A
//! transport performs exactly one submit/check call per invocation and returns the envelope
//! the server answered with. It knows nothing about polling; that lives in [`crate::poller`].
//!
//! ## Interface & Extensibility
//! - Implement [`GraphTransport`] to talk to a real API (see the `graph-jobs` crate's HTTP
//!   transport) or to script envelopes in tests.
//! - Convert wire responses into [`Envelope`] at this boundary; the core never sees raw
//!   status strings.
//! - Report every failure of the call itself as a [`TransportError`]; the poller passes it
//!   through unchanged.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`, so `MockGraphTransport` is available under
//!   `cfg(test)` and the `test-export-mocks` feature.

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::archive::Archive;
use crate::envelope::Envelope;
use crate::error::TransportError;
use crate::models::GraphKind;

/// One submit/check call. Every poll of the same logical job sends the same request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRequest {
    pub kind: GraphKind,
    pub idempotency_key: String,
    pub archive: Archive,
    /// Extra headers supplied per call.
    pub headers: Vec<(String, String)>,
}

/// Raw, non-polling access to the graph generation API.
///
/// The trait is `Send` + `Sync` and intended for async/await usage.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait GraphTransport: Send + Sync {
    /// Submit the archive (or check on the job the idempotency key already maps to) and
    /// return the server's envelope with its result still as JSON.
    async fn submit(
        &self,
        request: GraphRequest,
    ) -> Result<Envelope<serde_json::Value>, TransportError>;
}

#[async_trait]
impl<T: GraphTransport + ?Sized> GraphTransport for std::sync::Arc<T> {
    async fn submit(
        &self,
        request: GraphRequest,
    ) -> Result<Envelope<serde_json::Value>, TransportError> {
        (**self).submit(request).await
    }
}
