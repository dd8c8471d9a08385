//! In-memory [`ThreadBackend`] for tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{ReconcileError, ReconcileStep};
use crate::models::{StoredMessage, ThreadMeta};
use crate::traits::ThreadBackend;

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    CreateOrFetchThread {
        account_id: String,
        thread_id: Option<String>,
        title_hint: String,
    },
    LoadThreadMessages {
        thread_id: String,
    },
    ScoreRecommendations {
        thread_id: String,
        message_id: String,
    },
}

impl BackendCall {
    pub fn step(&self) -> ReconcileStep {
        match self {
            BackendCall::CreateOrFetchThread { .. } => ReconcileStep::ThreadMetadata,
            BackendCall::LoadThreadMessages { .. } => ReconcileStep::ReloadMessages,
            BackendCall::ScoreRecommendations { .. } => ReconcileStep::Recommendations,
        }
    }
}

#[derive(Debug, Default)]
struct BackendState {
    calls: Vec<BackendCall>,
    created_thread_id: Option<String>,
    messages: HashMap<String, Vec<StoredMessage>>,
    failures: HashMap<ReconcileStep, ReconcileError>,
    delay: Option<Duration>,
}

/// Thread backend that records calls and answers from memory.
///
/// A thread created without an id gets `thread-new` unless another id is
/// configured. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockThreadBackend {
    state: Arc<Mutex<BackendState>>,
}

impl MockThreadBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id handed out when a thread is created.
    pub fn with_created_thread_id(self, id: impl Into<String>) -> Self {
        self.state.lock().created_thread_id = Some(id.into());
        self
    }

    /// Messages returned by `load_thread_messages` for `thread_id`.
    pub fn with_messages(
        self,
        thread_id: impl Into<String>,
        messages: Vec<StoredMessage>,
    ) -> Self {
        self.state.lock().messages.insert(thread_id.into(), messages);
        self
    }

    /// Make one step fail with `error`.
    pub fn fail_step(&self, step: ReconcileStep, error: ReconcileError) {
        self.state.lock().failures.insert(step, error);
    }

    /// Latency added to every call.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().calls.clone()
    }

    /// Record `call` and return the configured failure for its step, if any.
    async fn enter(&self, call: BackendCall) -> Result<(), ReconcileError> {
        let step = call.step();
        let delay = {
            let mut state = self.state.lock();
            state.calls.push(call);
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.state.lock().failures.get(&step).cloned();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ThreadBackend for MockThreadBackend {
    async fn create_or_fetch_thread(
        &self,
        account_id: &str,
        thread_id: Option<&str>,
        title_hint: &str,
    ) -> Result<ThreadMeta, ReconcileError> {
        self.enter(BackendCall::CreateOrFetchThread {
            account_id: account_id.to_string(),
            thread_id: thread_id.map(str::to_string),
            title_hint: title_hint.to_string(),
        })
        .await?;

        let id = match thread_id {
            Some(id) => id.to_string(),
            None => self
                .state
                .lock()
                .created_thread_id
                .clone()
                .unwrap_or_else(|| "thread-new".to_string()),
        };
        Ok(ThreadMeta {
            id,
            title: Some(title_hint.to_string()),
        })
    }

    async fn load_thread_messages(
        &self,
        thread_id: &str,
    ) -> Result<Vec<StoredMessage>, ReconcileError> {
        self.enter(BackendCall::LoadThreadMessages {
            thread_id: thread_id.to_string(),
        })
        .await?;
        Ok(self
            .state
            .lock()
            .messages
            .get(thread_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn score_recommendations(
        &self,
        thread_id: &str,
        message_id: &str,
    ) -> Result<(), ReconcileError> {
        self.enter(BackendCall::ScoreRecommendations {
            thread_id: thread_id.to_string(),
            message_id: message_id.to_string(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::HttpError;

    #[tokio::test]
    async fn test_create_uses_configured_id() {
        let backend = MockThreadBackend::new().with_created_thread_id("t-42");
        let meta = backend
            .create_or_fetch_thread("acct", None, "What is Rust?")
            .await
            .unwrap();
        assert_eq!(meta.id, "t-42");
        assert_eq!(meta.title.as_deref(), Some("What is Rust?"));

        let meta = backend
            .create_or_fetch_thread("acct", Some("t-7"), "x")
            .await
            .unwrap();
        assert_eq!(meta.id, "t-7");
        assert_eq!(backend.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_configured_failure_is_returned_and_recorded() {
        let backend = MockThreadBackend::new();
        backend.fail_step(
            ReconcileStep::ReloadMessages,
            ReconcileError::Http(HttpError::Timeout("slow".to_string())),
        );

        let err = backend.load_thread_messages("t1").await.unwrap_err();
        assert_eq!(err.error_code(), "E_RECONCILE_HTTP");
        assert!(backend.score_recommendations("t1", "m1").await.is_ok());
        assert_eq!(
            backend.calls(),
            vec![
                BackendCall::LoadThreadMessages {
                    thread_id: "t1".to_string()
                },
                BackendCall::ScoreRecommendations {
                    thread_id: "t1".to_string(),
                    message_id: "m1".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_messages_returned_for_thread() {
        let stored = StoredMessage {
            id: "m1".to_string(),
            role: Default::default(),
            content: "hi".to_string(),
        };
        let backend = MockThreadBackend::new().with_messages("t1", vec![stored.clone()]);
        assert_eq!(backend.load_thread_messages("t1").await.unwrap(), vec![stored]);
        assert!(backend.load_thread_messages("t2").await.unwrap().is_empty());
    }
}
