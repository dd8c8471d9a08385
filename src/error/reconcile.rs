//! Post-stream reconciliation errors.
//!
//! A reconciliation failure never rolls back a finalized message. It is
//! logged, reported to observers and recorded in the session report.

use thiserror::Error;

use super::category::ErrorCategory;
use crate::traits::HttpError;

/// Which reconciliation step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconcileStep {
    /// Create-or-fetch of thread metadata.
    ThreadMetadata,
    /// Reload of the finalized thread content from durable storage.
    ReloadMessages,
    /// Recommendation scoring pass.
    Recommendations,
}

impl ReconcileStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileStep::ThreadMetadata => "thread_metadata",
            ReconcileStep::ReloadMessages => "reload_messages",
            ReconcileStep::Recommendations => "recommendations",
        }
    }
}

/// Failure of a thread-store or scoring collaborator.
#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    #[error("Backend request failed: {0}")]
    Http(#[from] HttpError),

    #[error("Backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected backend response: {0}")]
    InvalidResponse(String),

    /// No thread id is known yet, so the step cannot run.
    #[error("No thread id available for {0}")]
    MissingThread(&'static str),
}

impl ReconcileError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ReconcileError::Http(_) => "E_RECONCILE_HTTP",
            ReconcileError::Rejected { .. } => "E_RECONCILE_STATUS",
            ReconcileError::InvalidResponse(_) => "E_RECONCILE_RESPONSE",
            ReconcileError::MissingThread(_) => "E_RECONCILE_THREAD",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ReconcileError::Http(_) | ReconcileError::Rejected { .. } => ErrorCategory::Backend,
            ReconcileError::InvalidResponse(_) => ErrorCategory::Protocol,
            ReconcileError::MissingThread(_) => ErrorCategory::Client,
        }
    }
}
