//! End-to-end runs: a coordinator served over HTTP and real worker loops.

use log_analyzer::config::{CoordinationConfig, WorkerConfig};
use log_analyzer::coordinator::coordinator::Coordinator;
use log_analyzer::coordinator::detector::spawn_failure_detector;
use log_analyzer::coordinator::handlers::router;
use log_analyzer::coordinator::protocol::{ENDPOINT_JOB, ENDPOINT_REPORT, ENDPOINT_STATUS, StatusResponse};
use log_analyzer::parser::line::ResponseTimeParser;
use log_analyzer::parser::reader::process_whole_file;
use log_analyzer::registry::types::WorkerId;
use log_analyzer::worker::client::CoordinatorClient;
use log_analyzer::worker::worker::Worker;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn coordination() -> CoordinationConfig {
    CoordinationConfig {
        chunk_count: None,
        lease_timeout_ms: 2_000,
        heartbeat_interval_ms: 200,
        dead_threshold_ms: 1_000,
        max_attempts: 3,
        sweep_interval_ms: 100,
    }
}

fn worker_config() -> WorkerConfig {
    WorkerConfig {
        heartbeat_interval_ms: 200,
        poll_interval_ms: 20,
        request_timeout_ms: 2_000,
        submit_attempts: 3,
        retry_backoff_ms: 10,
    }
}

fn log_file(lines: usize) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for i in 0..lines {
        match i % 10 {
            0 => writeln!(file, "2024-01-01T10:00:00 ERROR Connection reset by peer").unwrap(),
            7 => writeln!(file, "2024-01-01T10:00:00 WARN Cache miss for key {}", i).unwrap(),
            _ => writeln!(file, "2024-01-01T10:00:00 INFO Request {} processed in {}ms", i, i % 97).unwrap(),
        }
    }
    file.flush().unwrap();
    file
}

async fn serve(coordinator: Arc<Coordinator>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(coordinator)).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_four_workers_match_sequential_pass() {
    // ARRANGE
    let log = log_file(5_000);
    let coordinator = Coordinator::new(coordination()).unwrap();
    let _detector = spawn_failure_detector(coordinator.clone());
    let base_url = serve(coordinator.clone()).await;

    let mut handles = Vec::new();
    for i in 0..4 {
        let client = Arc::new(CoordinatorClient::new(base_url.clone(), worker_config()).unwrap());
        let worker = Worker::new(
            WorkerId::from(format!("worker{}", i).as_str()),
            client,
            Arc::new(ResponseTimeParser),
            worker_config(),
        );
        handles.push(tokio::spawn(async move { worker.run().await }));
    }

    // Wait for the pool before partitioning, like the coordinator binary does.
    for _ in 0..200 {
        if coordinator.status().await.workers.idle == 4 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // ACT
    let mut completion = coordinator.subscribe_completion();
    let started = coordinator.start_job(log.path().to_path_buf(), Some(8)).await.unwrap();
    assert_eq!(started.chunks, 8);

    tokio::time::timeout(Duration::from_secs(20), completion.wait_for(|r| r.is_some()))
        .await
        .unwrap()
        .unwrap();

    let mut processed = 0;
    for handle in handles {
        let summary = tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        processed += summary.chunks_processed;
    }

    // ASSERT
    assert_eq!(processed, 8);

    let report = coordinator.report().await.unwrap();
    let expected = process_whole_file(log.path(), &ResponseTimeParser).unwrap();
    assert_eq!(report.metrics, expected);
    assert_eq!(report.metrics.error_count, 500);
    assert_eq!(report.metrics.request_count, 4_000);
    assert_eq!(report.chunks_done, 8);
    assert!(report.failed_chunks.is_empty());
}

#[tokio::test]
async fn test_job_and_report_over_http() {
    // ARRANGE
    let log = log_file(300);
    let coordinator = Coordinator::new(coordination()).unwrap();
    let base_url = serve(coordinator.clone()).await;
    let http = reqwest::Client::new();

    // Report before any job
    let response = http.get(format!("{}{}", base_url, ENDPOINT_REPORT)).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    // ACT: start the job over HTTP with no workers, falling back to one chunk
    let response = http
        .post(format!("{}{}", base_url, ENDPOINT_JOB))
        .json(&serde_json::json!({ "path": log.path(), "chunk_count": null }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let started: serde_json::Value = response.json().await.unwrap();
    assert_eq!(started["chunks"], 1);

    // Incomplete job
    let response = http.get(format!("{}{}", base_url, ENDPOINT_REPORT)).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);

    // A second job while the first runs
    let response = http
        .post(format!("{}{}", base_url, ENDPOINT_JOB))
        .json(&serde_json::json!({ "path": log.path(), "chunk_count": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);

    let client = Arc::new(CoordinatorClient::new(base_url.clone(), worker_config()).unwrap());
    let worker = Worker::new(WorkerId::from("late"), client, Arc::new(ResponseTimeParser), worker_config());
    let summary = tokio::time::timeout(Duration::from_secs(10), worker.run())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.chunks_processed, 1);

    // ASSERT
    let status: StatusResponse = http
        .get(format!("{}{}", base_url, ENDPOINT_STATUS))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(status.job_complete);
    assert_eq!(status.chunks.unwrap().done, 1);

    let response = http.get(format!("{}{}", base_url, ENDPOINT_REPORT)).send().await.unwrap();
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["report"]["metrics"]["error_count"], 30);
    assert_eq!(body["report"]["metrics"]["request_count"], 240);
}
