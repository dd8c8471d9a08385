//! Stream session control.
//!
//! A [`SessionController`] owns the pipeline: it opens the upstream stream,
//! feeds complete records through the parser into the effect queue, and
//! tears everything down on completion, cancellation or transport failure.
//! The outcome of an accepted session is always returned as a
//! [`SessionReport`].

mod controller;
mod reconcile;
mod state;

pub use controller::SessionController;
pub use reconcile::ReconcileFailure;
pub use state::SessionState;

use crate::error::StreamError;
use crate::models::{FinalizedMessage, ThreadMeta};

/// How an accepted session ended.
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    /// The upstream body ended and every effect ran.
    Completed,
    /// Aborted by `cancel()` or the shutdown future.
    Cancelled,
    /// The transport failed; the unfinished message was dropped.
    Failed(StreamError),
}

impl SessionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SessionOutcome::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionOutcome::Completed => "completed",
            SessionOutcome::Cancelled => "cancelled",
            SessionOutcome::Failed(_) => "failed",
        }
    }
}

/// Everything an accepted session produced.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Random id tagging this session's log lines
    pub session_id: String,
    pub outcome: SessionOutcome,
    /// Messages promoted into history by this session, in order
    pub finalized: Vec<FinalizedMessage>,
    /// Malformed records dropped by the parser
    pub skipped_records: usize,
    /// Thread metadata resolved during reconciliation, if it ran
    pub thread: Option<ThreadMeta>,
    pub reconcile_failures: Vec<ReconcileFailure>,
}

impl SessionReport {
    /// The transport error, if the session failed.
    pub fn error(&self) -> Option<&StreamError> {
        match &self.outcome {
            SessionOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Per-session accumulation shared by the read loop and effect tasks.
#[derive(Debug, Default)]
pub(crate) struct SessionTally {
    pub finalized: Vec<FinalizedMessage>,
    pub skipped_records: usize,
    pub thread: Option<ThreadMeta>,
    pub reconcile_failures: Vec<ReconcileFailure>,
}

impl SessionTally {
    pub fn into_report(self, session_id: String, outcome: SessionOutcome) -> SessionReport {
        SessionReport {
            session_id,
            outcome,
            finalized: self.finalized,
            skipped_records: self.skipped_records,
            thread: self.thread,
            reconcile_failures: self.reconcile_failures,
        }
    }
}
