//! Facade over a [`GraphTransport`]: one method per graph operation, each running a full
//! polling session and returning the unwrapped result.

use serde::de::DeserializeOwned;
use tracing::{info, info_span, Instrument};

use crate::archive::Archive;
use crate::config::{CallOptions, ClientOptions};
use crate::contract::{GraphRequest, GraphTransport};
use crate::error::PollError;
use crate::models::{CodeGraph, DomainGraph, GraphKind, SupermodelIr};
use crate::poller::{poll_until_complete, PollOptions};

pub struct GraphClient<T> {
    transport: T,
    options: ClientOptions,
}

impl<T: GraphTransport> GraphClient<T> {
    pub fn new(transport: T, options: ClientOptions) -> Self {
        Self { transport, options }
    }

    /// The underlying transport, for callers that want to manage polling themselves.
    pub fn raw(&self) -> &T {
        &self.transport
    }

    pub async fn generate_dependency_graph(
        &self,
        archive: Archive,
        call: CallOptions,
    ) -> Result<CodeGraph, PollError> {
        self.generate(GraphKind::Dependency, archive, call).await
    }

    pub async fn generate_call_graph(
        &self,
        archive: Archive,
        call: CallOptions,
    ) -> Result<CodeGraph, PollError> {
        self.generate(GraphKind::Call, archive, call).await
    }

    pub async fn generate_domain_graph(
        &self,
        archive: Archive,
        call: CallOptions,
    ) -> Result<DomainGraph, PollError> {
        self.generate(GraphKind::Domain, archive, call).await
    }

    pub async fn generate_parse_graph(
        &self,
        archive: Archive,
        call: CallOptions,
    ) -> Result<CodeGraph, PollError> {
        self.generate(GraphKind::Parse, archive, call).await
    }

    pub async fn generate_supermodel_ir(
        &self,
        archive: Archive,
        call: CallOptions,
    ) -> Result<SupermodelIr, PollError> {
        self.generate(GraphKind::Supermodel, archive, call).await
    }

    /// Runs one polling session for `kind` and decodes the result as `R`.
    pub async fn generate<R: DeserializeOwned>(
        &self,
        kind: GraphKind,
        archive: Archive,
        call: CallOptions,
    ) -> Result<R, PollError> {
        let idempotency_key = call
            .idempotency_key
            .unwrap_or_else(|| self.options.generate_key());
        let poll = PollOptions {
            config: self.options.polling.clone(),
            progress: self.options.progress.clone(),
            cancel: call.cancel.or_else(|| self.options.cancel.clone()),
        };
        let request = GraphRequest {
            kind,
            idempotency_key,
            archive,
            headers: call.headers,
        };

        let span = info_span!("generate", %kind, idempotency_key = %request.idempotency_key);
        async {
            info!(archive_size = request.archive.len(), "Starting graph generation");
            let result = poll_until_complete(&poll, || {
                let request = request.clone();
                async move { self.transport.submit(request).await?.decode::<R>() }
            })
            .await;
            if result.is_ok() {
                info!("Graph generation completed");
            }
            result
        }
        .instrument(span)
        .await
    }
}
