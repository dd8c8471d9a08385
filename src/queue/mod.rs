//! Ordered effect queue.
//!
//! Side effects triggered by stream events (assembler mutation, reveal,
//! reconciliation) complete with very different latencies. The queue runs
//! them strictly one at a time in enqueue order, so a slow effect can never
//! be overtaken by the effect of a later event.
//!
//! One worker drains the FIFO. `push` starts a worker only when none is
//! running; otherwise it just appends. A task that returns an error or
//! panics is logged and counted, and draining moves on to the next task.

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;

/// Result of one effect body.
pub type EffectResult = Result<(), EffectError>;

/// A zero-argument asynchronous unit of work.
pub type EffectTask = Box<dyn FnOnce() -> BoxFuture<'static, EffectResult> + Send>;

/// Failure of a single effect body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EffectError {
    #[error("Effect failed: {0}")]
    Failed(String),

    #[error("Effect panicked: {0}")]
    Panicked(String),
}

/// Counters since the queue was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: u64,
    pub completed: u64,
    pub failed: u64,
}

struct QueueState {
    tasks: VecDeque<EffectTask>,
    draining: bool,
    stats: QueueStats,
}

struct Shared {
    state: Mutex<QueueState>,
    /// true while no worker is draining
    idle_tx: watch::Sender<bool>,
}

/// Single-consumer FIFO of effect tasks. Cloning yields another handle to
/// the same queue.
#[derive(Clone)]
pub struct EffectQueue {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for EffectQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("EffectQueue")
            .field("pending", &state.tasks.len())
            .field("draining", &state.draining)
            .field("stats", &state.stats)
            .finish()
    }
}

impl Default for EffectQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectQueue {
    pub fn new() -> Self {
        let (idle_tx, _) = watch::channel(true);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    tasks: VecDeque::new(),
                    draining: false,
                    stats: QueueStats::default(),
                }),
                idle_tx,
            }),
        }
    }

    /// Enqueue an async closure. Must be called inside a tokio runtime.
    pub fn enqueue<F, Fut>(&self, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = EffectResult> + Send + 'static,
    {
        self.push(Box::new(move || task().boxed()));
    }

    /// Append a boxed task, spawning the worker if none is draining.
    pub fn push(&self, task: EffectTask) {
        let start_worker = {
            let mut state = self.shared.state.lock();
            state.tasks.push_back(task);
            state.stats.enqueued += 1;
            if state.draining {
                false
            } else {
                state.draining = true;
                self.shared.idle_tx.send_replace(false);
                true
            }
        };

        if start_worker {
            let queue = self.clone();
            tokio::spawn(async move { queue.run_worker().await });
        }
    }

    /// Drain on the calling task.
    ///
    /// No-op when a worker is already draining or nothing is queued, so it is
    /// safe to call from anywhere, including from inside an effect.
    pub async fn drain(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.draining || state.tasks.is_empty() {
                return;
            }
            state.draining = true;
            self.shared.idle_tx.send_replace(false);
        }
        self.run_worker().await;
    }

    /// Resolves once the queue is empty and no task is running.
    pub async fn wait_idle(&self) {
        let mut idle_rx = self.shared.idle_tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = idle_rx.wait_for(|idle| *idle).await;
    }

    /// Tasks waiting to run (the running one excluded).
    pub fn len(&self) -> usize {
        self.shared.state.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tasks not yet finished: the waiting ones plus the one running.
    pub fn in_flight(&self) -> usize {
        let stats = self.shared.state.lock().stats;
        (stats.enqueued - stats.completed - stats.failed) as usize
    }

    pub fn is_draining(&self) -> bool {
        self.shared.state.lock().draining
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.state.lock().stats
    }

    async fn run_worker(&self) {
        loop {
            let task = {
                let mut state = self.shared.state.lock();
                match state.tasks.pop_front() {
                    Some(task) => task,
                    None => {
                        state.draining = false;
                        self.shared.idle_tx.send_replace(true);
                        return;
                    }
                }
            };

            // The closure is invoked inside the guarded future so a panic
            // while building the future is caught too.
            let outcome = AssertUnwindSafe(async move { task().await })
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(EffectError::Panicked(panic_message(&panic))));

            let mut state = self.shared.state.lock();
            match outcome {
                Ok(()) => state.stats.completed += 1,
                Err(err) => {
                    state.stats.failed += 1;
                    tracing::warn!(error = %err, "Effect task failed, continuing with next");
                }
            }
        }
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
