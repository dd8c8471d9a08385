//! Full sessions over real HTTP using wiremock.
//!
//! These verify the reqwest transport, request shape and status handling.
//! Reveals run unpaced so the tests do not depend on wall-clock timing.

mod common;

use std::sync::Arc;

use answer_stream::adapters::{HttpThreadBackend, ReqwestHttpClient};
use answer_stream::config::PipelineConfig;
use answer_stream::error::StreamError;
use answer_stream::models::StreamRequest;
use answer_stream::session::{SessionController, SessionState};
use common::{answer, end, error, sources, thought, THREAD_ID};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ndjson(records: &[String]) -> String {
    records.iter().map(|r| format!("{}\n", r)).collect()
}

fn controller(server: &MockServer) -> SessionController {
    let config = PipelineConfig::default()
        .with_base_url(server.uri())
        .with_auth_token("test-auth-token")
        .with_start_unpaced(true)
        .with_cooldown(std::time::Duration::ZERO);
    let http = Arc::new(ReqwestHttpClient::new());
    let backend = Arc::new(HttpThreadBackend::from_config(http.clone(), &config));
    SessionController::new(config, http, backend)
}

async fn mount_reconcile_endpoints(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/threads/{}/messages", THREAD_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/recommendations/score"))
        .respond_with(ResponseTemplate::new(202))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_answer_over_http() {
    let server = MockServer::start().await;
    let body = ndjson(&[
        thought("m1", "t1", "searching"),
        sources("m1", &["c1"]),
        answer("m1", "Ownership "),
        answer("m1", "moves values."),
        end("m1"),
    ]);

    Mock::given(method("POST"))
        .and(path("/v1/stream"))
        .and(header("Authorization", "Bearer test-auth-token"))
        .and(header("Accept", "application/x-ndjson"))
        .and(body_json(json!({
            "account_id": "acct-1",
            "thread_id": THREAD_ID,
            "query": "What is a move?",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .expect(1)
        .mount(&server)
        .await;
    mount_reconcile_endpoints(&server).await;

    let controller = controller(&server);
    let report = controller
        .run(StreamRequest::new("acct-1", "What is a move?").with_thread(THREAD_ID))
        .await
        .unwrap();

    assert!(report.outcome.is_completed(), "outcome: {:?}", report.outcome);
    assert!(report.reconcile_failures.is_empty(), "{:?}", report.reconcile_failures);
    let message = &report.finalized[0];
    assert_eq!(message.content, "Ownership moves values.");
    assert_eq!(message.thought_items[0].description, "searching");
    assert_eq!(message.citations().count(), 1);
    assert_eq!(message.thread_id.as_deref(), Some(THREAD_ID));
    assert_eq!(controller.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_error_status_fails_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/stream"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let controller = controller(&server);
    let report = controller
        .run(StreamRequest::new("acct-1", "q"))
        .await
        .unwrap();

    match report.error() {
        Some(StreamError::HttpStatus { status, message }) => {
            assert_eq!(*status, 429);
            assert_eq!(message, "slow down");
        }
        other => panic!("Expected HttpStatus, got {:?}", other),
    }
    assert_eq!(controller.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_upstream_error_event_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(ndjson(&[error("m3", "rate limited")]), "application/x-ndjson"),
        )
        .mount(&server)
        .await;
    mount_reconcile_endpoints(&server).await;

    let report = controller(&server)
        .run(StreamRequest::new("acct-1", "q").with_thread(THREAD_ID))
        .await
        .unwrap();

    assert!(report.outcome.is_completed());
    assert_eq!(report.finalized[0].content, "rate limited");
    assert!(report.finalized[0].failed);
}

#[tokio::test]
async fn test_unreachable_server_is_connect_error() {
    let config = PipelineConfig::default().with_base_url("http://127.0.0.1:9");
    let http = Arc::new(ReqwestHttpClient::new());
    let backend = Arc::new(HttpThreadBackend::from_config(http.clone(), &config));
    let controller = SessionController::new(config, http, backend);

    let report = controller
        .run(StreamRequest::new("acct-1", "q"))
        .await
        .unwrap();

    assert!(matches!(report.error(), Some(StreamError::Connect { .. })));
}
