//! Error types for the streaming pipeline.
//!
//! The pipeline distinguishes four failure classes:
//!
//! | Class | Type | Effect |
//! |-------|------|--------|
//! | Transport failure | [`StreamError`] | Session aborted, no retry |
//! | Malformed record | [`crate::stream::RecordError`] | Record skipped |
//! | Upstream `error` event | (content) | Finalizes the message |
//! | Reconciliation failure | [`ReconcileError`] | Logged, no rollback |
//!
//! Transport and reconciliation failures are converted into a state reset at
//! the session boundary and reported, never raised to the caller.

mod category;
mod reconcile;
mod session;
mod stream;

pub use category::ErrorCategory;
pub use reconcile::{ReconcileError, ReconcileStep};
pub use session::SessionError;
pub use stream::StreamError;
