use std::future::Future;
use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::Instrument;
use uuid::Uuid;

use super::reconcile::Reconciler;
use super::state::{Lifecycle, SessionState};
use super::{SessionOutcome, SessionReport, SessionTally};
use crate::assembler::{ApplyOutcome, ContentAssembler, ConversationHistory};
use crate::config::PipelineConfig;
use crate::error::{SessionError, StreamError};
use crate::models::{FinalizedMessage, StreamRequest};
use crate::observe::{create_observer_channel, emit, ObserverEvent, ObserverSender};
use crate::queue::{EffectQueue, QueueStats};
use crate::reveal::{PacingControl, RevealScheduler};
use crate::stream::{parse_record, LineDecoder, StreamEvent};
use crate::traits::{Headers, HttpClient, ThreadBackend};

struct Inner {
    config: PipelineConfig,
    http: Arc<dyn HttpClient>,
    backend: Arc<dyn ThreadBackend>,
    /// Mutated only from effect tasks and session teardown
    assembler: Mutex<ContentAssembler>,
    queue: EffectQueue,
    reveal: RevealScheduler,
    observers: ObserverSender,
    lifecycle: Mutex<Lifecycle>,
}

/// Per-session handles carried into every effect.
#[derive(Clone)]
struct SessionContext {
    tally: Arc<Mutex<SessionTally>>,
    reconciler: Arc<Reconciler>,
}

/// Drives one streaming session at a time.
///
/// Clones are handles to the same controller, so one task can `run` while
/// another calls `cancel` or reads snapshots.
///
/// ```no_run
/// use std::sync::Arc;
/// use answer_stream::adapters::{HttpThreadBackend, ReqwestHttpClient};
/// use answer_stream::config::PipelineConfig;
/// use answer_stream::models::StreamRequest;
/// use answer_stream::session::SessionController;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PipelineConfig::from_env();
/// let http = Arc::new(ReqwestHttpClient::new());
/// let backend = Arc::new(HttpThreadBackend::from_config(http.clone(), &config));
/// let controller = SessionController::new(config, http, backend);
///
/// let mut events = controller.subscribe();
/// tokio::spawn(async move {
///     while let Ok(event) = events.recv().await {
///         println!("{:?}", event);
///     }
/// });
///
/// let report = controller
///     .run(StreamRequest::new("acct-1", "What is a borrow checker?"))
///     .await?;
/// println!("{} message(s) finalized", report.finalized.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state())
            .field("queue", &self.inner.queue)
            .finish()
    }
}

impl SessionController {
    pub fn new(
        config: PipelineConfig,
        http: Arc<dyn HttpClient>,
        backend: Arc<dyn ThreadBackend>,
    ) -> Self {
        let (observers, _) = create_observer_channel(config.observer_capacity);
        let pacing = PacingControl::new(!config.start_unpaced);
        let reveal = RevealScheduler::new(config.reveal.clone(), pacing, observers.clone())
            .with_restore_on_text(!config.start_unpaced);

        Self {
            inner: Arc::new(Inner {
                assembler: Mutex::new(ContentAssembler::new(config.source_merge)),
                queue: EffectQueue::new(),
                reveal,
                observers,
                lifecycle: Mutex::new(Lifecycle::default()),
                config,
                http,
                backend,
            }),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    pub fn state(&self) -> SessionState {
        self.inner.lifecycle.lock().state()
    }

    /// New receiver for observer events.
    pub fn subscribe(&self) -> broadcast::Receiver<ObserverEvent> {
        self.inner.observers.subscribe()
    }

    pub fn pacing(&self) -> &PacingControl {
        self.inner.reveal.pacing()
    }

    /// Flush running reveals. The next answer reveal paces again.
    pub fn fast_forward(&self) {
        self.inner.reveal.pacing().fast_forward();
    }

    /// Snapshot of every finalized message, oldest first.
    pub fn history(&self) -> ConversationHistory {
        self.inner.assembler.lock().history().clone()
    }

    /// Snapshot of the message still being assembled.
    pub fn live_message(&self) -> Option<FinalizedMessage> {
        self.inner
            .assembler
            .lock()
            .live()
            .map(|live| live.snapshot(false))
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.inner.queue.stats()
    }

    /// Abort the running session. Returns false when nothing is connecting
    /// or streaming.
    pub fn cancel(&self) -> bool {
        let requested = self.inner.lifecycle.lock().request_abort();
        if requested {
            tracing::info!("Session cancel requested");
        }
        requested
    }

    /// Run one session to completion.
    ///
    /// `Err` only when the session is not accepted. Transport failures and
    /// cancellation are reported in the returned [`SessionReport`].
    pub async fn run(&self, request: StreamRequest) -> Result<SessionReport, SessionError> {
        self.run_until(request, std::future::pending()).await
    }

    /// Like [`run`](Self::run), aborting as if cancelled once `shutdown`
    /// resolves.
    pub async fn run_until<F>(
        &self,
        request: StreamRequest,
        shutdown: F,
    ) -> Result<SessionReport, SessionError>
    where
        F: Future<Output = ()> + Send,
    {
        validate(&request)?;
        let abort = self.begin().await?;
        let guard = SessionGuard::new(Arc::clone(&self.inner));

        let tally = Arc::new(Mutex::new(SessionTally::default()));
        let ctx = SessionContext {
            reconciler: Arc::new(Reconciler::new(
                Arc::clone(&self.inner.backend),
                self.inner.observers.clone(),
                &request.account_id,
                request.thread_id.as_deref(),
                &request.query,
                Arc::clone(&tally),
            )),
            tally: Arc::clone(&tally),
        };

        let session_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("session", session_id = %session_id);

        let outcome = async {
            let outcome = self.stream(&request, abort, shutdown, &ctx).await;
            self.settle(&outcome, &ctx).await;
            outcome
        }
        .instrument(span.clone())
        .await;
        guard.disarm();
        drop(ctx);

        let tally = std::mem::take(&mut *tally.lock());
        span.in_scope(|| {
            tracing::info!(
                outcome = outcome.as_str(),
                finalized = tally.finalized.len(),
                skipped = tally.skipped_records,
                reconcile_failures = tally.reconcile_failures.len(),
                "Session finished"
            )
        });
        Ok(tally.into_report(session_id, outcome))
    }

    /// Claim the pipeline, waiting out a cooldown if one is running.
    async fn begin(&self) -> Result<watch::Receiver<bool>, SessionError> {
        loop {
            let wait = {
                let mut lifecycle = self.inner.lifecycle.lock();
                match lifecycle.state() {
                    SessionState::Idle => {
                        let abort = lifecycle
                            .start(&self.inner.observers)
                            .ok_or_else(|| SessionError::Busy {
                                state: lifecycle.state().as_str(),
                            })?;
                        self.reset_pacing();
                        return Ok(abort);
                    }
                    SessionState::Cooldown => {
                        let remaining = lifecycle.cooldown_remaining();
                        if remaining.is_zero() {
                            lifecycle.expire_cooldown(&self.inner.observers);
                            continue;
                        }
                        remaining
                    }
                    state => {
                        tracing::warn!(state = %state, "Refusing session start, pipeline busy");
                        return Err(SessionError::Busy {
                            state: state.as_str(),
                        });
                    }
                }
            };
            tracing::debug!(wait_ms = wait.as_millis() as u64, "Waiting out cooldown");
            tokio::time::sleep(wait).await;
        }
    }

    fn reset_pacing(&self) {
        let pacing = self.inner.reveal.pacing();
        pacing.release();
        if self.inner.config.start_unpaced {
            pacing.fast_forward();
        } else {
            pacing.restore();
        }
    }

    fn stream_headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/x-ndjson".to_string());
        if let Some(token) = &self.inner.config.auth_token {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        headers
    }

    /// Open the transport and run the read loop until the body ends, fails
    /// or the session is aborted.
    async fn stream<F>(
        &self,
        request: &StreamRequest,
        mut abort: watch::Receiver<bool>,
        shutdown: F,
        ctx: &SessionContext,
    ) -> SessionOutcome
    where
        F: Future<Output = ()> + Send,
    {
        let cancelled = async move {
            tokio::select! {
                _ = aborted(&mut abort) => {}
                _ = shutdown => tracing::info!("Shutdown signalled, aborting session"),
            }
        };
        tokio::pin!(cancelled);

        let body = match serde_json::to_string(request) {
            Ok(body) => body,
            Err(err) => {
                return SessionOutcome::Failed(StreamError::Request {
                    message: err.to_string(),
                })
            }
        };
        let url = self.inner.config.stream_url();
        let headers = self.stream_headers();

        tracing::info!(
            url = %url,
            thread_id = request.thread_id.as_deref().unwrap_or(""),
            "Opening answer stream"
        );
        let mut stream = tokio::select! {
            biased;
            _ = &mut cancelled => return SessionOutcome::Cancelled,
            opened = self.inner.http.post_stream(&url, &body, &headers) => match opened {
                Ok(stream) => stream,
                Err(err) => return SessionOutcome::Failed(StreamError::from_open(err)),
            },
        };

        self.transition(SessionState::Streaming);
        let mut decoder = LineDecoder::new();

        loop {
            tokio::select! {
                biased;
                _ = &mut cancelled => return SessionOutcome::Cancelled,
                next = stream.next() => match next {
                    Some(Ok(chunk)) => {
                        for record in decoder.feed(&chunk) {
                            self.dispatch(&record, ctx);
                        }
                    }
                    Some(Err(err)) => return SessionOutcome::Failed(StreamError::from_body(err)),
                    None => {
                        if let Some(record) = decoder.finish() {
                            self.dispatch(&record, ctx);
                        }
                        return SessionOutcome::Completed;
                    }
                },
            }
        }
    }

    /// Parse one complete record and enqueue its effect.
    fn dispatch(&self, record: &str, ctx: &SessionContext) {
        let event = match parse_record(record) {
            Ok(event) => event,
            Err(err) if err.is_malformed() => {
                tracing::warn!(error = %err, "Skipping malformed record");
                ctx.tally.lock().skipped_records += 1;
                emit(
                    &self.inner.observers,
                    ObserverEvent::RecordSkipped {
                        reason: err.to_string(),
                    },
                );
                return;
            }
            Err(err) => {
                tracing::debug!(error = %err, "Ignoring record");
                return;
            }
        };

        tracing::debug!(
            msg_id = %event.message_id,
            thread_id = event.thread_id.as_deref().unwrap_or(""),
            kind = event.kind().as_str(),
            "Stream event"
        );

        // Any unfinished effect counts, the running reveal included.
        let backlog = self.inner.queue.in_flight();
        if self.inner.config.auto_fast_forward && backlog > 0 {
            tracing::debug!(backlog, "Effects backed up, clearing pacing");
            self.inner.reveal.pacing().fast_forward();
        }

        let inner = Arc::clone(&self.inner);
        let ctx = ctx.clone();
        self.inner.queue.enqueue(move || async move {
            inner.run_effect(event, ctx).await;
            Ok(())
        });
    }

    async fn settle(&self, outcome: &SessionOutcome, ctx: &SessionContext) {
        let pacing = self.inner.reveal.pacing();
        match outcome {
            SessionOutcome::Completed => {
                self.transition(SessionState::Draining);
                self.inner.queue.wait_idle().await;
                self.finalize_pending(ctx);
                self.finish();
            }
            SessionOutcome::Cancelled => {
                self.transition(SessionState::Cancelled);
                pacing.hold();
                self.inner.queue.wait_idle().await;
                self.finalize_pending(ctx);
                pacing.release();
                self.inner.enter_cooldown();
            }
            SessionOutcome::Failed(err) => {
                tracing::error!(
                    code = err.error_code(),
                    category = %err.category(),
                    error = %err,
                    "Stream transport failed"
                );
                pacing.hold();
                self.inner.queue.wait_idle().await;
                let dropped = self.inner.assembler.lock().discard_pending();
                if let Some(live) = dropped {
                    tracing::warn!(msg_id = %live.id(), "Dropped unfinished message");
                }
                pacing.release();
                self.finish();
            }
        }
    }

    fn finalize_pending(&self, ctx: &SessionContext) {
        let pending = self.inner.assembler.lock().finalize_pending();
        if let Some(message) = pending {
            self.inner.announce(&message, ctx);
        }
    }

    fn transition(&self, next: SessionState) {
        self.inner.transition(next);
    }

    fn finish(&self) {
        self.inner.finish();
    }
}

impl Inner {
    /// Effect body for one event: apply, reveal, then reconcile whatever the
    /// event finalized.
    async fn run_effect(&self, event: StreamEvent, ctx: SessionContext) {
        let report = self.assembler.lock().apply(&event);

        if let Some(message) = &report.superseded {
            self.announce(message, &ctx);
        }
        self.reveal.reveal(&event).await;
        if let ApplyOutcome::Finalized(message) = &report.outcome {
            self.announce(message, &ctx);
        }

        for message in report.finalized() {
            ctx.reconciler.reconcile(message).await;
        }
    }

    fn announce(&self, message: &FinalizedMessage, ctx: &SessionContext) {
        ctx.tally.lock().finalized.push(message.clone());
        emit(&self.observers, ObserverEvent::Finalized(message.clone()));
    }

    fn transition(&self, next: SessionState) {
        self.lifecycle.lock().transition(next, &self.observers);
    }

    fn finish(&self) {
        self.lifecycle.lock().finish(&self.observers);
    }

    /// Enter cooldown and schedule its expiry. A zero window goes straight
    /// back to idle. Without a runtime the window is left to expire on the
    /// next start.
    fn enter_cooldown(self: &Arc<Self>) {
        let window = self.config.cooldown;
        let generation = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.enter_cooldown(window, &self.observers);
            if window.is_zero() {
                lifecycle.expire_cooldown(&self.observers);
                return;
            }
            lifecycle.generation()
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let inner = Arc::clone(self);
        handle.spawn(async move {
            tokio::time::sleep(window).await;
            let mut lifecycle = inner.lifecycle.lock();
            if lifecycle.generation() == generation {
                lifecycle.expire_cooldown(&inner.observers);
            }
        });
    }

    /// Teardown for a session whose future was dropped before it settled.
    /// Mirrors cancellation: drain unpaced, keep the open message as not
    /// done, then cool down. A session already draining returns to idle.
    async fn abandon(self: Arc<Self>) {
        self.queue.wait_idle().await;
        self.release_abandoned();
    }

    fn release_abandoned(self: &Arc<Self>) {
        let pending = self.assembler.lock().finalize_pending();
        if let Some(message) = pending {
            emit(&self.observers, ObserverEvent::Finalized(message));
        }
        self.reveal.pacing().release();

        let state = self.lifecycle.lock().state();
        match state {
            SessionState::Draining => self.finish(),
            SessionState::Connecting | SessionState::Streaming => {
                self.transition(SessionState::Cancelled);
                self.enter_cooldown();
            }
            SessionState::Cancelled => self.enter_cooldown(),
            SessionState::Idle | SessionState::Cooldown => {}
        }
    }
}

/// Owns the lifecycle reset of an accepted session until it settles.
///
/// If the `run` future is dropped first (a timeout, a losing `select!`
/// arm, an aborted task), dropping the guard tears the session down so the
/// controller does not stay busy.
struct SessionGuard {
    inner: Option<Arc<Inner>>,
}

impl SessionGuard {
    fn new(inner: Arc<Inner>) -> Self {
        Self { inner: Some(inner) }
    }

    /// The session settled normally.
    fn disarm(mut self) {
        self.inner = None;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(inner) = self.inner.take() else {
            return;
        };
        let state = inner.lifecycle.lock().state();
        tracing::warn!(state = %state, "Session dropped before settling, tearing down");
        inner.reveal.pacing().hold();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(inner.abandon());
            }
            Err(_) => {
                // No runtime left to drain on; queued effects are lost with it.
                inner.release_abandoned();
            }
        }
    }
}

/// Resolves once the abort flag is raised.
async fn aborted(abort: &mut watch::Receiver<bool>) {
    if abort.wait_for(|aborted| *aborted).await.is_err() {
        // Switch dropped without firing.
        std::future::pending::<()>().await;
    }
}

fn validate(request: &StreamRequest) -> Result<(), SessionError> {
    if request.account_id.trim().is_empty() {
        return Err(SessionError::InvalidRequest("account_id is empty".to_string()));
    }
    if request.query.trim().is_empty() {
        return Err(SessionError::InvalidRequest("query is empty".to_string()));
    }
    Ok(())
}
