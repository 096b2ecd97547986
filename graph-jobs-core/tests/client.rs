use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use graph_jobs_core::config::{CallOptions, ClientOptions, PollingConfig};
use graph_jobs_core::contract::{GraphRequest, MockGraphTransport};
use graph_jobs_core::envelope::Envelope;
use graph_jobs_core::error::{PollError, TransportError};
use graph_jobs_core::models::GraphKind;
use graph_jobs_core::{Archive, GraphClient, GraphTransport};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn archive() -> Archive {
    Archive::from_bytes("repo.zip", b"PK\x03\x04fake".to_vec())
}

fn fast_polling() -> ClientOptions {
    ClientOptions::new(PollingConfig {
        timeout_ms: 60_000,
        default_retry_interval_ms: 1_000,
        max_polling_attempts: 5,
        ..PollingConfig::default()
    })
}

fn graph_json() -> serde_json::Value {
    json!({
        "nodes": [{"id": "src/main.rs", "labels": ["File"]}],
        "relationships": []
    })
}

#[tokio::test(start_paused = true)]
async fn dependency_graph_is_unwrapped_after_polling() {
    let mut transport = MockGraphTransport::new();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    transport
        .expect_submit()
        .withf(|req: &GraphRequest| req.kind == GraphKind::Dependency)
        .times(2)
        .returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(Envelope::pending("job-1"))
            } else {
                Ok(Envelope::completed("job-1", graph_json()))
            }
        });

    let client = GraphClient::new(transport, fast_polling());
    let graph = client
        .generate_dependency_graph(archive(), CallOptions::default())
        .await
        .expect("dependency graph should be returned");

    assert_eq!(graph.nodes.len(), 1);
    assert_eq!(graph.nodes[0].id, "src/main.rs");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn one_key_is_reused_across_polls() {
    let keys = Arc::new(Mutex::new(Vec::new()));
    let seen = keys.clone();
    let mut transport = MockGraphTransport::new();
    transport.expect_submit().times(3).returning(move |req| {
        let mut seen = seen.lock().unwrap();
        seen.push(req.idempotency_key.clone());
        if seen.len() < 3 {
            Ok(Envelope::processing("job-2"))
        } else {
            Ok(Envelope::completed("job-2", graph_json()))
        }
    });

    let client = GraphClient::new(transport, fast_polling());
    client
        .generate_call_graph(archive(), CallOptions::default())
        .await
        .unwrap();

    let keys = keys.lock().unwrap();
    let distinct: HashSet<_> = keys.iter().collect();
    assert_eq!(distinct.len(), 1, "every poll must reuse the same key");
    assert_eq!(keys[0].len(), 36);
}

#[tokio::test]
async fn explicit_key_and_headers_are_passed_through() {
    let mut transport = MockGraphTransport::new();
    transport
        .expect_submit()
        .withf(|req: &GraphRequest| {
            req.idempotency_key == "caller-key"
                && req.kind == GraphKind::Parse
                && req.archive.file_name() == "repo.zip"
                && req.headers == vec![("X-Trace".to_string(), "abc".to_string())]
        })
        .times(1)
        .returning(|_| Ok(Envelope::completed("job-3", graph_json())));

    let client = GraphClient::new(transport, fast_polling());
    let call = CallOptions::default()
        .idempotency_key("caller-key")
        .header("X-Trace", "abc");
    client.generate_parse_graph(archive(), call).await.unwrap();
}

#[tokio::test]
async fn injected_key_generator_is_used_per_call() {
    let counter = Arc::new(AtomicU32::new(0));
    let next = counter.clone();
    let options = fast_polling().with_key_generator(move || {
        format!("key-{}", next.fetch_add(1, Ordering::SeqCst))
    });

    let mut transport = MockGraphTransport::new();
    transport
        .expect_submit()
        .withf(|req: &GraphRequest| req.idempotency_key == "key-0")
        .times(1)
        .returning(|_| Ok(Envelope::completed("a", json!({"domains": []}))));
    transport
        .expect_submit()
        .withf(|req: &GraphRequest| req.idempotency_key == "key-1")
        .times(1)
        .returning(|_| Ok(Envelope::completed("b", json!({"domains": []}))));

    let client = GraphClient::new(transport, options);
    client
        .generate_domain_graph(archive(), CallOptions::default())
        .await
        .unwrap();
    client
        .generate_domain_graph(archive(), CallOptions::default())
        .await
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn same_key_on_deduplicating_server_sees_same_job() {
    // Server side: one job per idempotency key.
    let jobs = Arc::new(Mutex::new(Vec::<String>::new()));
    let registry = jobs.clone();
    let mut transport = MockGraphTransport::new();
    transport.expect_submit().times(2).returning(move |req| {
        let mut registry = registry.lock().unwrap();
        let index = match registry.iter().position(|k| *k == req.idempotency_key) {
            Some(i) => i,
            None => {
                registry.push(req.idempotency_key.clone());
                registry.len() - 1
            }
        };
        Ok(Envelope::completed(format!("job-{index}"), json!({"repo": "acme"})))
    });

    let client = GraphClient::new(transport, fast_polling());
    let first = client
        .generate_supermodel_ir(archive(), CallOptions::default().idempotency_key("same"))
        .await
        .unwrap();
    let second = client
        .generate_supermodel_ir(archive(), CallOptions::default().idempotency_key("same"))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(jobs.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn per_call_token_replaces_client_token() {
    let client_token = CancellationToken::new();
    client_token.cancel();
    let mut transport = MockGraphTransport::new();
    transport
        .expect_submit()
        .times(1)
        .returning(|_| Ok(Envelope::completed("job-4", graph_json())));

    let client = GraphClient::new(transport, fast_polling().with_cancel(client_token));
    let call = CallOptions::default().cancel(CancellationToken::new());
    let graph = client.generate_call_graph(archive(), call).await;

    assert!(graph.is_ok(), "a fresh per-call token must not inherit cancellation");
}

#[tokio::test]
async fn client_token_applies_when_no_override() {
    let client_token = CancellationToken::new();
    client_token.cancel();
    let mut transport = MockGraphTransport::new();
    transport.expect_submit().never();

    let client = GraphClient::new(transport, fast_polling().with_cancel(client_token));
    let err = client
        .generate_call_graph(archive(), CallOptions::default())
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
}

#[tokio::test]
async fn undecodable_result_is_transport_error() {
    let mut transport = MockGraphTransport::new();
    transport
        .expect_submit()
        .returning(|_| Ok(Envelope::completed("job-5", json!("not a graph"))));

    let client = GraphClient::new(transport, fast_polling());
    let err = client
        .generate_dependency_graph(archive(), CallOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PollError::Transport(TransportError::Decode(_))));
}

#[tokio::test]
async fn job_failure_propagates_unchanged() {
    let mut transport = MockGraphTransport::new();
    transport
        .expect_submit()
        .returning(|_| Ok(Envelope::failed("job-6", "bad archive")));

    let client = GraphClient::new(transport, fast_polling());
    let err = client
        .generate_parse_graph(archive(), CallOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "job job-6 failed: bad archive");
}

#[tokio::test]
async fn raw_transport_returns_single_envelope() {
    let mut transport = MockGraphTransport::new();
    transport
        .expect_submit()
        .times(1)
        .returning(|_| Ok(Envelope::pending("job-7")));

    let client = GraphClient::new(transport, fast_polling());
    let request = GraphRequest {
        kind: GraphKind::Dependency,
        idempotency_key: "manual".into(),
        archive: archive(),
        headers: Vec::new(),
    };
    let envelope = client.raw().submit(request).await.unwrap();

    assert_eq!(envelope.job_id, "job-7");
    assert!(!envelope.status().is_terminal());
}
