//! Common test utilities for integration tests.
//!
//! Record builders produce NDJSON lines in the upstream wire format;
//! [`Harness`] wires a [`SessionController`] to mock collaborators and
//! keeps an observer subscription open.

#![allow(dead_code)]

pub mod mocks;

pub use mocks::*;

use std::sync::Arc;
use std::time::Duration;

use answer_stream::config::PipelineConfig;
use answer_stream::observe::ObserverEvent;
use answer_stream::reveal::{RevealFrame, RevealKind};
use answer_stream::session::{SessionController, SessionState};
use serde_json::{json, Value};
use tokio::sync::broadcast;

pub const BASE_URL: &str = "http://api.test";
pub const STREAM_URL: &str = "http://api.test/v1/stream";
pub const THREAD_ID: &str = "thread-1";

/// One upstream record.
pub fn record(kind: &str, msg_id: &str, content: Value) -> String {
    json!({
        "type": kind,
        "msg_id": msg_id,
        "thread_id": THREAD_ID,
        "content": content,
    })
    .to_string()
}

pub fn answer(msg_id: &str, text: &str) -> String {
    record("final_answer", msg_id, json!(text))
}

/// Thought chunk with its payload JSON-encoded inside `content`.
pub fn thought(msg_id: &str, sub_id: &str, description: &str) -> String {
    let payload = json!({
        "subId": sub_id,
        "toolName": "search",
        "toolType": "web",
        "content": description,
    });
    record("thought_chunk", msg_id, json!(payload.to_string()))
}

pub fn sources(msg_id: &str, ids: &[&str]) -> String {
    let batch: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "title": format!("Source {}", id)}))
        .collect();
    record("source_list", msg_id, Value::Array(batch))
}

pub fn end(msg_id: &str) -> String {
    record("end_of_thinking", msg_id, json!(""))
}

pub fn error(msg_id: &str, text: &str) -> String {
    record("error", msg_id, json!(text))
}

/// Configuration pointed at the mock base URL, with no cooldown.
pub fn test_config() -> PipelineConfig {
    PipelineConfig::default()
        .with_base_url(BASE_URL)
        .with_auth_token("test-token")
        .with_cooldown(Duration::ZERO)
        .with_observer_capacity(4096)
}

/// Controller wired to mocks, plus an open observer subscription.
pub struct Harness {
    pub controller: SessionController,
    pub http: MockHttpClient,
    pub backend: MockThreadBackend,
    pub events: broadcast::Receiver<ObserverEvent>,
}

impl Harness {
    pub fn new(http: MockHttpClient) -> Self {
        Self::with_config(test_config(), http, MockThreadBackend::new())
    }

    pub fn with_config(
        config: PipelineConfig,
        http: MockHttpClient,
        backend: MockThreadBackend,
    ) -> Self {
        let controller =
            SessionController::new(config, Arc::new(http.clone()), Arc::new(backend.clone()));
        let events = controller.subscribe();
        Self {
            controller,
            http,
            backend,
            events,
        }
    }

    /// Every observer event received so far.
    pub fn drain_events(&mut self) -> Vec<ObserverEvent> {
        let mut out = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => out.push(event),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    panic!("Observer lagged by {} events; raise the capacity", missed)
                }
                Err(_) => return out,
            }
        }
    }
}

pub fn frames(events: &[ObserverEvent]) -> Vec<RevealFrame> {
    events
        .iter()
        .filter_map(|event| match event {
            ObserverEvent::Reveal(frame) => Some(frame.clone()),
            _ => None,
        })
        .collect()
}

/// Concatenated answer and error text revealed for `msg_id`.
pub fn revealed_text(events: &[ObserverEvent], msg_id: &str) -> String {
    frames(events)
        .into_iter()
        .filter(|f| f.message_id == msg_id)
        .filter(|f| matches!(f.kind, RevealKind::Text | RevealKind::Error))
        .map(|f| f.slice)
        .collect()
}

pub fn lifecycle(events: &[ObserverEvent]) -> Vec<SessionState> {
    events
        .iter()
        .filter_map(|event| match event {
            ObserverEvent::Lifecycle(state) => Some(*state),
            _ => None,
        })
        .collect()
}

/// Poll until the controller reaches `state`. Needs a paused clock or a
/// short real wait.
pub async fn wait_for_state(controller: &SessionController, state: SessionState) {
    for _ in 0..2000 {
        if controller.state() == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("Controller never reached {}", state);
}
