#![doc = "graph-jobs-core: core logic library for graph-jobs."]

//! This crate contains the transport-independent logic of graph-jobs: the job envelope
//! model, the polling state machine and the graph generation facade built on top of it.
//! HTTP and CLI concerns live in the `graph-jobs` crate.
//!
//! # Usage
//! Implement [`contract::GraphTransport`] (or use `MockGraphTransport` in tests), wrap it in
//! a [`client::GraphClient`] and call one of the `generate_*` methods.

pub mod archive;
pub mod client;
pub mod config;
pub mod contract;
pub mod delay;
pub mod envelope;
pub mod error;
pub mod idempotency;
pub mod models;
pub mod poller;
pub mod progress;

pub use archive::Archive;
pub use client::GraphClient;
pub use config::{CallOptions, ClientOptions, PollingConfig, UnknownStatusPolicy};
pub use contract::{GraphRequest, GraphTransport};
pub use envelope::{Envelope, JobState, JobStatus, WireEnvelope};
pub use error::{PollError, TransportError};
pub use models::{CodeGraph, DomainGraph, GraphKind, SupermodelIr};
pub use poller::{poll_until_complete, PollOptions};
pub use progress::{PollingProgress, ProgressObserver, TracingProgressObserver};
