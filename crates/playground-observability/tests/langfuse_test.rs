// Integration tests for the Langfuse backend against a mock ingestion API

use chrono::Utc;
use playground_observability::{
    LangfuseBackend, LangfuseConfig, ObservabilityBackend, ObservabilityError, ObservabilityEvent,
};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, max_batch_size: usize) -> LangfuseConfig {
    let mut config = LangfuseConfig::new("pk-lf-test", "sk-lf-secret");
    config.host = server.uri();
    config.max_batch_size = max_batch_size;
    config
}

fn trace_completed(id: &str) -> ObservabilityEvent {
    ObservabilityEvent::TraceCompleted {
        trace_id: id.to_string(),
        output: Some(json!({"answer": "42"})),
        success: true,
        error: None,
        timestamp: Utc::now(),
    }
}

async fn mount_ingestion(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/public/ingestion"))
        .and(header(
            "authorization",
            "Basic cGstbGYtdGVzdDpzay1sZi1zZWNyZXQ=",
        ))
        .respond_with(ResponseTemplate::new(207).set_body_json(json!({
            "successes": [{"id": "x", "status": 201}],
            "errors": []
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_events_are_buffered_until_flush() {
    let server = MockServer::start().await;
    mount_ingestion(&server, 1).await;

    let backend = LangfuseBackend::new(config_for(&server, 10)).unwrap();
    backend.record(trace_completed("t1")).await.unwrap();
    backend.record(trace_completed("t2")).await.unwrap();
    assert_eq!(backend.pending().await, 2);

    backend.flush().await.unwrap();
    assert_eq!(backend.pending().await, 0);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["batch"].as_array().unwrap().len(), 2);
    assert_eq!(body["batch"][0]["type"], "trace-create");
    assert_eq!(body["metadata"]["public_key"], "pk-lf-test");
}

#[tokio::test]
async fn test_auto_flush_at_max_batch_size() {
    let server = MockServer::start().await;
    mount_ingestion(&server, 1).await;

    let backend = LangfuseBackend::new(config_for(&server, 2)).unwrap();
    backend.record(trace_completed("t1")).await.unwrap();
    backend.record(trace_completed("t2")).await.unwrap();

    assert_eq!(backend.pending().await, 0);
}

#[tokio::test]
async fn test_empty_flush_sends_nothing() {
    let server = MockServer::start().await;
    mount_ingestion(&server, 0).await;

    let backend = LangfuseBackend::new(config_for(&server, 10)).unwrap();
    backend.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_http_error_is_export_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let backend = LangfuseBackend::new(config_for(&server, 10)).unwrap();
    backend.record(trace_completed("t1")).await.unwrap();

    let err = backend.flush().await.unwrap_err();
    assert!(matches!(err, ObservabilityError::Export(_)));
}
