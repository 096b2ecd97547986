///
/// This module implements the CLI interface for graph-jobs: command parsing, argument
/// validation and the async `run` entrypoint shared by `main()` and integration tests.
///
/// All polling, envelope and error semantics live in the `graph-jobs-core` crate. This
/// module is strictly CLI glue: config loading, transport construction, Ctrl-C wiring and
/// writing results out.
///
/// ## How To Use
/// - For command-line users: use the installed `graph-jobs` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
use crate::load_config::{load_config, CliConfig};
use crate::transport::HttpTransport;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use graph_jobs_core::archive::Archive;
use graph_jobs_core::client::GraphClient;
use graph_jobs_core::config::{CallOptions, ClientOptions};
use graph_jobs_core::contract::{GraphRequest, GraphTransport};
use graph_jobs_core::envelope::{Envelope, JobState};
use graph_jobs_core::idempotency::generate_idempotency_key;
use graph_jobs_core::models::GraphKind;
use graph_jobs_core::progress::TracingProgressObserver;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// CLI for graph-jobs: generate code graphs from repository archives.
#[derive(Parser)]
#[clap(
    name = "graph-jobs",
    version,
    about = "Submit repository archives for graph generation and wait for the results"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit an archive and poll until the graph is ready
    Generate {
        /// dependency, call, domain, parse or supermodel
        kind: GraphKind,
        /// Path to the repository archive (zip)
        #[clap(long)]
        archive: PathBuf,
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
        /// Reuse a key from an earlier run to pick up the same job
        #[clap(long)]
        idempotency_key: Option<String>,
        /// Write the result here instead of stdout
        #[clap(long)]
        output: Option<PathBuf>,
    },
    /// Make a single submit/check call and print the envelope, without polling
    Submit {
        kind: GraphKind,
        #[clap(long)]
        archive: PathBuf,
        #[clap(long)]
        config: Option<PathBuf>,
        #[clap(long)]
        idempotency_key: Option<String>,
    },
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate {
            kind,
            archive,
            config,
            idempotency_key,
            output,
        } => {
            let archive = read_archive(&archive).await?;
            let config = load_config(config)?;
            let transport = build_transport(&config)?;
            let cancel = cancel_on_ctrl_c();
            let options = ClientOptions::new(config.polling)
                .with_progress(TracingProgressObserver)
                .with_cancel(cancel);
            let client = GraphClient::new(transport, options);
            let call = CallOptions {
                idempotency_key,
                ..CallOptions::default()
            };

            tracing::info!(command = "generate", %kind, "Starting graph generation");
            let json = match kind {
                GraphKind::Dependency => to_json(&client.generate_dependency_graph(archive, call).await?),
                GraphKind::Call => to_json(&client.generate_call_graph(archive, call).await?),
                GraphKind::Domain => to_json(&client.generate_domain_graph(archive, call).await?),
                GraphKind::Parse => to_json(&client.generate_parse_graph(archive, call).await?),
                GraphKind::Supermodel => to_json(&client.generate_supermodel_ir(archive, call).await?),
            }?;
            write_output(output.as_deref(), &json).await?;
            tracing::info!(command = "generate", %kind, "Graph generation complete");
            Ok(())
        }
        Commands::Submit {
            kind,
            archive,
            config,
            idempotency_key,
        } => {
            let archive = read_archive(&archive).await?;
            let config = load_config(config)?;
            let transport = build_transport(&config)?;
            let client = GraphClient::new(transport, ClientOptions::new(config.polling));
            let request = GraphRequest {
                kind,
                idempotency_key: idempotency_key.unwrap_or_else(generate_idempotency_key),
                archive,
                headers: Vec::new(),
            };
            let key = request.idempotency_key.clone();

            let envelope = client.raw().submit(request).await?;
            let summary = EnvelopeSummary::new(&key, &envelope);
            println!("{}", to_json(&summary)?);
            Ok(())
        }
    }
}

async fn read_archive(path: &Path) -> Result<Archive> {
    let archive = Archive::from_path(path)
        .await
        .with_context(|| format!("Failed to read archive {}", path.display()))?;
    if archive.is_empty() {
        tracing::error!(path = %path.display(), "Archive is empty");
        anyhow::bail!("Archive {} is empty", path.display());
    }
    Ok(archive)
}

fn build_transport(config: &CliConfig) -> Result<HttpTransport> {
    HttpTransport::from_env(&config.api).map_err(|e| anyhow::anyhow!("Failed to construct transport: {e}"))
}

/// Cancels the returned token on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl-C received, cancelling");
            trigger.cancel();
        }
    });
    token
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize result")
}

async fn write_output(path: Option<&Path>, json: &str) -> Result<()> {
    match path {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = json.len(), "Wrote result");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Printable view of one raw envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeSummary<'a> {
    idempotency_key: &'a str,
    job_id: &'a str,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a serde_json::Value>,
}

impl<'a> EnvelopeSummary<'a> {
    fn new(idempotency_key: &'a str, envelope: &'a Envelope<serde_json::Value>) -> Self {
        let (error, result) = match &envelope.state {
            JobState::Failed { message } => (message.as_deref(), None),
            JobState::Completed { result } => (None, result.as_ref()),
            _ => (None, None),
        };
        Self {
            idempotency_key,
            job_id: &envelope.job_id,
            status: envelope.status().to_string(),
            retry_after_ms: envelope.retry_after.map(|d| d.as_millis()),
            error,
            result,
        }
    }
}
