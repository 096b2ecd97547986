use assert_cmd::Command;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use predicates::prelude::*;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;

fn fake_archive() -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".zip")
        .tempfile()
        .expect("Creating temp archive failed");
    file.write_all(b"PK\x03\x04").expect("Writing temp archive failed");
    file
}

#[test]
fn help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("graph-jobs").expect("Binary exists");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate").and(predicate::str::contains("submit")));
}

#[test]
fn unknown_graph_kind_is_rejected() {
    let archive = fake_archive();
    let mut cmd = Command::cargo_bin("graph-jobs").expect("Binary exists");
    cmd.arg("generate")
        .arg("flowchart")
        .arg("--archive")
        .arg(archive.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown graph kind"));
}

#[test]
fn missing_archive_fails_before_any_request() {
    let mut cmd = Command::cargo_bin("graph-jobs").expect("Binary exists");
    cmd.arg("generate")
        .arg("dependency")
        .arg("--archive")
        .arg("/no/such/repo.zip")
        .env("GRAPH_API_KEY", "unused")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read archive"));
}

#[test]
fn missing_api_key_is_reported() {
    let archive = fake_archive();
    let mut cmd = Command::cargo_bin("graph-jobs").expect("Binary exists");
    cmd.arg("generate")
        .arg("call")
        .arg("--archive")
        .arg(archive.path())
        .env_remove("GRAPH_API_KEY")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GRAPH_API_KEY"));
}

#[test]
fn empty_archive_is_rejected() {
    let archive = tempfile::Builder::new()
        .suffix(".zip")
        .tempfile()
        .expect("Creating temp archive failed");
    let mut cmd = Command::cargo_bin("graph-jobs").expect("Binary exists");
    cmd.arg("generate")
        .arg("dependency")
        .arg("--archive")
        .arg(archive.path())
        .env("GRAPH_API_KEY", "unused")
        .assert()
        .failure()
        .stderr(predicate::str::contains("is empty"));
}

/// First request per server is `pending`, every later one `completed`.
async fn graph_job(
    State(calls): State<Arc<AtomicUsize>>,
    Path(kind): Path<String>,
    body: Bytes,
) -> Json<Value> {
    assert!(body.windows(4).any(|w| w == b"PK\x03\x04"));
    let job_id = format!("job-{kind}");
    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
        return Json(json!({ "status": "pending", "jobId": job_id, "retryAfter": 0.01 }));
    }
    Json(json!({
        "status": "completed",
        "jobId": job_id,
        "result": {
            "nodes": [{ "id": "src/main.rs", "labels": ["File"] }],
            "relationships": []
        }
    }))
}

/// Serves the graph API on a background thread; returns its base URL and the call counter.
fn spawn_backend() -> (String, Arc<AtomicUsize>) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Binding mock API failed");
    listener
        .set_nonblocking(true)
        .expect("Setting non-blocking failed");
    let addr = listener.local_addr().expect("Local address");
    let calls = Arc::new(AtomicUsize::new(0));
    let state = calls.clone();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().expect("Building runtime failed");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("Tokio listener");
            let app = Router::new()
                .route("/v1/graphs/{kind}", post(graph_job))
                .with_state(state);
            axum::serve(listener, app).await.expect("Mock API stopped");
        });
    });
    (format!("http://{addr}"), calls)
}

#[test]
fn generate_writes_result_to_output_file() {
    let (base_url, calls) = spawn_backend();
    let archive = fake_archive();
    let out_dir = tempfile::tempdir().expect("Creating temp dir failed");
    let out_path = out_dir.path().join("graph.json");

    let mut cmd = Command::cargo_bin("graph-jobs").expect("Binary exists");
    cmd.arg("generate")
        .arg("dependency")
        .arg("--archive")
        .arg(archive.path())
        .arg("--output")
        .arg(&out_path)
        .env("GRAPH_API_BASE_URL", &base_url)
        .env("GRAPH_API_KEY", "test-key")
        .assert()
        .success();

    let written = std::fs::read_to_string(&out_path).expect("Output file written");
    let graph: Value = serde_json::from_str(&written).expect("Output is JSON");
    assert_eq!(graph["nodes"][0]["id"], "src/main.rs");
    assert_eq!(graph["relationships"], json!([]));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn generate_prints_result_to_stdout() {
    let (base_url, _calls) = spawn_backend();
    let archive = fake_archive();

    let mut cmd = Command::cargo_bin("graph-jobs").expect("Binary exists");
    cmd.arg("generate")
        .arg("parse")
        .arg("--archive")
        .arg(archive.path())
        .env("GRAPH_API_BASE_URL", &base_url)
        .env("GRAPH_API_KEY", "test-key")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"src/main.rs\""));
}

#[test]
fn submit_prints_single_envelope() {
    let (base_url, calls) = spawn_backend();
    let archive = fake_archive();

    let mut cmd = Command::cargo_bin("graph-jobs").expect("Binary exists");
    cmd.arg("submit")
        .arg("call")
        .arg("--archive")
        .arg(archive.path())
        .arg("--idempotency-key")
        .arg("abc-123")
        .env("GRAPH_API_BASE_URL", &base_url)
        .env("GRAPH_API_KEY", "test-key")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"idempotencyKey\": \"abc-123\"")
                .and(predicate::str::contains("\"jobId\": \"job-call\""))
                .and(predicate::str::contains("\"status\": \"pending\"")),
        );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
