//! Post-stream reconciliation.
//!
//! Runs inside the finalize effect, so later effects wait for it. Every step
//! is attempted even when an earlier one failed; failures are logged,
//! announced and collected, never propagated.

use std::sync::Arc;

use parking_lot::Mutex;

use super::SessionTally;
use crate::error::{ReconcileError, ReconcileStep};
use crate::models::FinalizedMessage;
use crate::observe::{emit, ObserverEvent, ObserverSender};
use crate::traits::ThreadBackend;

/// Longest title hint derived from the query, in characters.
const TITLE_HINT_CHARS: usize = 80;

/// A reconciliation step that failed.
#[derive(Debug, Clone)]
pub struct ReconcileFailure {
    pub step: ReconcileStep,
    pub message_id: String,
    pub error: ReconcileError,
}

/// Per-session reconciliation context.
pub(crate) struct Reconciler {
    backend: Arc<dyn ThreadBackend>,
    observers: ObserverSender,
    account_id: String,
    /// Thread id the request was made with
    requested_thread: Option<String>,
    title_hint: String,
    tally: Arc<Mutex<SessionTally>>,
}

impl Reconciler {
    pub fn new(
        backend: Arc<dyn ThreadBackend>,
        observers: ObserverSender,
        account_id: &str,
        requested_thread: Option<&str>,
        query: &str,
        tally: Arc<Mutex<SessionTally>>,
    ) -> Self {
        Self {
            backend,
            observers,
            account_id: account_id.to_string(),
            requested_thread: requested_thread
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            title_hint: title_hint(query),
            tally,
        }
    }

    /// Run thread metadata (when needed), reload and scoring for `message`.
    pub async fn reconcile(&self, message: &FinalizedMessage) {
        let thread_id = match self.resolve_thread(message).await {
            Some(id) => id,
            None => {
                self.fail(
                    ReconcileStep::ReloadMessages,
                    message,
                    ReconcileError::MissingThread(ReconcileStep::ReloadMessages.as_str()),
                );
                self.fail(
                    ReconcileStep::Recommendations,
                    message,
                    ReconcileError::MissingThread(ReconcileStep::Recommendations.as_str()),
                );
                return;
            }
        };

        match self.backend.load_thread_messages(&thread_id).await {
            Ok(messages) => {
                tracing::debug!(
                    thread_id = %thread_id,
                    count = messages.len(),
                    "Thread messages reloaded"
                );
                emit(
                    &self.observers,
                    ObserverEvent::ThreadReloaded {
                        thread_id: thread_id.clone(),
                        messages,
                    },
                );
            }
            Err(err) => self.fail(ReconcileStep::ReloadMessages, message, err),
        }

        match self
            .backend
            .score_recommendations(&thread_id, &message.id)
            .await
        {
            Ok(()) => {
                tracing::debug!(thread_id = %thread_id, msg_id = %message.id, "Scoring requested")
            }
            Err(err) => self.fail(ReconcileStep::Recommendations, message, err),
        }
    }

    /// The thread the message belongs to, creating or fetching metadata when
    /// the request carried no thread id.
    async fn resolve_thread(&self, message: &FinalizedMessage) -> Option<String> {
        if let Some(id) = &self.requested_thread {
            return Some(id.clone());
        }

        let known = self.tally.lock().thread.as_ref().map(|meta| meta.id.clone());
        if known.is_some() {
            return known;
        }

        let streamed = message.thread_id.as_deref();
        match self
            .backend
            .create_or_fetch_thread(&self.account_id, streamed, &self.title_hint)
            .await
        {
            Ok(meta) => {
                tracing::info!(thread_id = %meta.id, "Thread metadata resolved");
                let id = meta.id.clone();
                self.tally.lock().thread = Some(meta);
                Some(id)
            }
            Err(err) => {
                self.fail(ReconcileStep::ThreadMetadata, message, err);
                // The stream may still have told us the thread id.
                streamed.map(str::to_string)
            }
        }
    }

    fn fail(&self, step: ReconcileStep, message: &FinalizedMessage, error: ReconcileError) {
        tracing::warn!(
            step = step.as_str(),
            msg_id = %message.id,
            code = error.error_code(),
            error = %error,
            "Reconciliation step failed"
        );
        emit(
            &self.observers,
            ObserverEvent::ReconcileFailed {
                step,
                message: error.to_string(),
            },
        );
        self.tally.lock().reconcile_failures.push(ReconcileFailure {
            step,
            message_id: message.id.clone(),
            error,
        });
    }
}

/// Thread title suggested from the query: first line, trimmed, bounded.
fn title_hint(query: &str) -> String {
    let line = query.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    line.chars().take(TITLE_HINT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{BackendCall, MockThreadBackend};
    use crate::assembler::MessageAccumulator;
    use crate::observe::create_observer_channel;
    use crate::traits::HttpError;

    fn message(id: &str, thread: Option<&str>) -> FinalizedMessage {
        MessageAccumulator::new(id, thread.map(str::to_string)).finalize(true)
    }

    fn reconciler(
        backend: &MockThreadBackend,
        requested: Option<&str>,
    ) -> (Reconciler, Arc<Mutex<SessionTally>>) {
        let (tx, _rx) = create_observer_channel(16);
        let tally = Arc::new(Mutex::new(SessionTally::default()));
        (
            Reconciler::new(
                Arc::new(backend.clone()),
                tx,
                "acct",
                requested,
                "  \nHow do lifetimes work?\nmore",
                Arc::clone(&tally),
            ),
            tally,
        )
    }

    #[tokio::test]
    async fn test_known_thread_skips_metadata() {
        let backend = MockThreadBackend::new();
        let (reconciler, tally) = reconciler(&backend, Some("t1"));

        reconciler.reconcile(&message("m1", Some("t1"))).await;

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
        assert!(tally.lock().reconcile_failures.is_empty());
    }

    #[tokio::test]
    async fn test_new_thread_resolved_once_per_session() {
        let backend = MockThreadBackend::new().with_created_thread_id("t-new");
        let (reconciler, tally) = reconciler(&backend, None);

        reconciler.reconcile(&message("m1", None)).await;
        reconciler.reconcile(&message("m2", None)).await;

        let calls = backend.calls();
        assert_eq!(
            calls[0],
            BackendCall::CreateOrFetchThread {
                account_id: "acct".to_string(),
                thread_id: None,
                title_hint: "How do lifetimes work?".to_string(),
            }
        );
        let creates = calls
            .iter()
            .filter(|c| c.step() == ReconcileStep::ThreadMetadata)
            .count();
        assert_eq!(creates, 1);
        assert_eq!(tally.lock().thread.as_ref().map(|t| t.id.as_str()), Some("t-new"));
    }

    #[tokio::test]
    async fn test_metadata_failure_falls_back_to_streamed_thread() {
        let backend = MockThreadBackend::new();
        backend.fail_step(
            ReconcileStep::ThreadMetadata,
            ReconcileError::Http(HttpError::Timeout("slow".to_string())),
        );
        let (reconciler, tally) = reconciler(&backend, None);

        reconciler.reconcile(&message("m1", Some("t-stream"))).await;

        let tally = tally.lock();
        assert_eq!(tally.reconcile_failures.len(), 1);
        assert_eq!(tally.reconcile_failures[0].step, ReconcileStep::ThreadMetadata);
        // Remaining steps still ran against the streamed thread id
        assert!(backend.calls().contains(&BackendCall::ScoreRecommendations {
            thread_id: "t-stream".to_string(),
            message_id: "m1".to_string(),
        }));
    }

    #[tokio::test]
    async fn test_no_thread_at_all_reports_missing() {
        let backend = MockThreadBackend::new();
        backend.fail_step(
            ReconcileStep::ThreadMetadata,
            ReconcileError::InvalidResponse("bad".to_string()),
        );
        let (reconciler, tally) = reconciler(&backend, None);

        reconciler.reconcile(&message("m1", None)).await;

        let steps: Vec<_> = tally
            .lock()
            .reconcile_failures
            .iter()
            .map(|f| f.step)
            .collect();
        assert_eq!(
            steps,
            vec![
                ReconcileStep::ThreadMetadata,
                ReconcileStep::ReloadMessages,
                ReconcileStep::Recommendations
            ]
        );
    }

    #[test]
    fn test_title_hint_is_bounded() {
        assert_eq!(title_hint("  hello  "), "hello");
        assert_eq!(title_hint(&"é".repeat(200)).chars().count(), TITLE_HINT_CHARS);
        assert_eq!(title_hint(""), "");
    }
}
