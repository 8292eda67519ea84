//! Integration tests for the queue client.
//!
//! A wiremock server stands in for the platform's job-take and job-done
//! endpoints.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio::sync::watch;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xtts_core::{JobError, JobOutcome, JobStatus, QueueConfig, WorkerConfig};
use xtts_engine::{MockModel, ModelHandle};
use xtts_worker::{JobHandler, QueueClient, WorkerMetrics};

fn queue_config(server: &MockServer) -> QueueConfig {
    QueueConfig {
        api_key: "test-key".to_string(),
        worker_id: "worker-1".to_string(),
        take_url: format!("{}/job-take/worker-1", server.uri()),
        done_url_template: format!("{}/job-done/$ID", server.uri()),
    }
}

fn test_handler(speakers: &TempDir, output: &TempDir) -> JobHandler {
    let config = WorkerConfig {
        speakers_dir: speakers.path().to_path_buf(),
        output_dir: output.path().to_path_buf(),
        ..WorkerConfig::default()
    };
    JobHandler::new(
        Arc::new(ModelHandle::with_model(Box::new(MockModel::new()))),
        Arc::new(WorkerMetrics::init_noop()),
        config,
    )
}

/// A 200 response with a job payload is returned as a job.
#[tokio::test]
async fn test_take_job_returns_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/job-take/worker-1"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "q-1",
            "input": {"text": "Hello", "language": "de"}
        })))
        .mount(&server)
        .await;

    let client = QueueClient::new(queue_config(&server)).unwrap();
    let job = client.take_job().await.unwrap().expect("should get a job");

    assert_eq!(job.id, "q-1");
    assert_eq!(job.input.text, "Hello");
    assert_eq!(job.input.language.as_deref(), Some("de"));
}

/// A 204 means the queue is empty, not an error.
#[tokio::test]
async fn test_take_job_handles_empty_queue() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/job-take/worker-1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = QueueClient::new(queue_config(&server)).unwrap();
    assert!(client.take_job().await.unwrap().is_none());
}

/// Server errors on job-take surface as queue errors.
#[tokio::test]
async fn test_take_job_reports_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/job-take/worker-1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = QueueClient::new(queue_config(&server)).unwrap();
    let err = client.take_job().await.unwrap_err();
    assert!(err.to_string().contains("500"), "{err}");
}

/// Outcomes are POSTed to the done URL with the job id substituted in.
#[tokio::test]
async fn test_submit_result_posts_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/job-done/q-9"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "error": "text is required and must be a non-empty string",
            "status": "invalid_input"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = QueueClient::new(queue_config(&server)).unwrap();
    let outcome = JobOutcome::Error(JobError {
        error: "text is required and must be a non-empty string".to_string(),
        status: JobStatus::InvalidInput,
    });
    client.submit_result("q-9", &outcome).await.unwrap();
}

/// The poll loop takes a job, runs it, submits the result, and keeps polling
/// until shutdown.
#[tokio::test]
async fn test_poll_loop_processes_and_submits() {
    let server = MockServer::start().await;

    // One job, then an empty queue.
    Mock::given(method("GET"))
        .and(path("/job-take/worker-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "q-42",
            "input": {"text": "Queue job"}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job-take/worker-1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/job-done/q-42"))
        .and(body_partial_json(json!({"status": "success"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let speakers = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let handler = test_handler(&speakers, &output);
    let client = QueueClient::new(queue_config(&server)).unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        client.poll_loop(&handler, shutdown_rx).await.unwrap();
    });

    // Wait until the result lands, then stop the loop.
    for _ in 0..100 {
        let submitted = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .any(|r| r.url.path() == "/job-done/q-42");
        if submitted {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    shutdown_tx.send(true).unwrap();
    task.await.unwrap();
}
